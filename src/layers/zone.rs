use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::gtfs::gtfs::StopCatalog;
use crate::gtfs::structs::Trip;

use super::error::Error;

/// Geographic quadrant around the zone center
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Zone {
    NE,
    NW,
    SE,
    SW,
}

impl Zone {
    pub const ALL: [Zone; 4] = [Zone::NE, Zone::NW, Zone::SE, Zone::SW];

    pub fn as_str(&self) -> &'static str {
        match self {
            Zone::NE => "NE",
            Zone::NW => "NW",
            Zone::SE => "SE",
            Zone::SW => "SW",
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Zone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NE" => Ok(Zone::NE),
            "NW" => Ok(Zone::NW),
            "SE" => Ok(Zone::SE),
            "SW" => Ok(Zone::SW),
            other => Err(format!("unknown zone '{}'", other)),
        }
    }
}

/// Latitude and longitude splitting the map into four zones
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoneCenter {
    pub lat: f64,
    pub lon: f64,
}

impl Default for ZoneCenter {
    fn default() -> Self {
        ZoneCenter { lat: 28.6, lon: 77.2 }
    }
}

pub struct ZoneClassifier {
    center: ZoneCenter,
}

impl ZoneClassifier {
    /// # Returns
    /// `Error::Config` if the thresholds are not a valid coordinate
    pub fn new(center: ZoneCenter) -> Result<ZoneClassifier, Error> {
        if !center.lat.is_finite() || !(-90.0..=90.0).contains(&center.lat) {
            return Err(Error::Config(format!("invalid zone latitude {}", center.lat)));
        }
        if !center.lon.is_finite() || !(-180.0..=180.0).contains(&center.lon) {
            return Err(Error::Config(format!("invalid zone longitude {}", center.lon)));
        }
        Ok(ZoneClassifier { center })
    }

    pub fn center(&self) -> ZoneCenter {
        self.center
    }

    /// Zone of a coordinate. Points on a threshold belong to the northern / eastern side.
    pub fn classify(&self, lat: f64, lon: f64) -> Zone {
        let north = lat >= self.center.lat;
        let east = lon >= self.center.lon;
        match (north, east) {
            (true, true) => Zone::NE,
            (true, false) => Zone::NW,
            (false, true) => Zone::SE,
            (false, false) => Zone::SW,
        }
    }

    /// Zone of a trip, given by its first stop. None for a trip without known stops.
    pub fn classify_trip(&self, trip: &Trip, stops: &StopCatalog) -> Option<Zone> {
        let first = stops.get(trip.stop_ids.first()?)?;
        Some(self.classify(first.stop_lat, first.stop_lon))
    }
}

/// Candidate buses of every zone. Trip ids act as bus identifiers.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BusPool {
    buses: BTreeMap<Zone, Vec<String>>,
}

impl BusPool {
    pub fn new() -> Self {
        BusPool::default()
    }

    /// Bucket every trip by the zone of its first stop, keeping trip order within a zone
    pub fn from_trips(trips: &[Trip], stops: &StopCatalog, classifier: &ZoneClassifier) -> BusPool {
        let mut pool = BusPool::new();
        for trip in trips {
            match classifier.classify_trip(trip, stops) {
                Some(zone) => pool.push(zone, &trip.trip_id),
                None => log::warn!("Trip {} has no known first stop, no zone", trip.trip_id),
            }
        }
        pool
    }

    pub fn push(&mut self, zone: Zone, bus_id: &str) {
        self.buses.entry(zone).or_default().push(bus_id.to_owned());
    }

    pub fn buses(&self, zone: Zone) -> &[String] {
        self.buses.get(&zone).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.buses.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn print_stats(&self) {
        println!("Bus pool:");
        for zone in Zone::ALL {
            println!("  {}: {}", zone, self.buses(zone).len());
        }
    }
}

impl FromIterator<(Zone, String)> for BusPool {
    fn from_iter<I: IntoIterator<Item = (Zone, String)>>(iter: I) -> Self {
        let mut pool = BusPool::new();
        for (zone, bus_id) in iter {
            pool.push(zone, &bus_id);
        }
        pool
    }
}
