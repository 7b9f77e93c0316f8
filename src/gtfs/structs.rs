use geo_types::Point;
use serde::Deserialize;

use super::gtfs::deserialize_opt;

pub trait Id {
    fn id(&self) -> &str;
}

/// A row of the stops table as found on disk.
/// Every field is optional so that a missing value is reported per row instead of failing the file.
/// https://gtfs.org/documentation/schedule/reference/#stopstxt
#[derive(Debug, Deserialize, Default)]
pub struct StopRecord {
    #[serde(default, deserialize_with = "deserialize_opt")]
    pub stop_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_opt")]
    pub stop_lat: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_opt")]
    pub stop_lon: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_opt")]
    pub stop_name: Option<String>,
}

/// A row of the trip-stop table. Row order is the stop order within the trip.
/// https://gtfs.org/documentation/schedule/reference/#stop_timestxt
#[derive(Debug, Deserialize, Default)]
pub struct StopTimeRecord {
    #[serde(default, deserialize_with = "deserialize_opt")]
    pub trip_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_opt")]
    pub stop_id: Option<String>,
}

/// A physical stop.
#[derive(Debug, Clone, PartialEq)]
pub struct Stop {
    pub stop_id: String,
    pub stop_lat: f64,
    pub stop_lon: f64,
    pub stop_name: String,
}

impl Stop {
    pub fn new(stop_id: &str, stop_lat: f64, stop_lon: f64, stop_name: &str) -> Stop {
        Stop {
            stop_id: stop_id.to_string(),
            stop_lat,
            stop_lon,
            stop_name: stop_name.to_string(),
        }
    }

    /// Location of the stop, x = longitude, y = latitude
    pub fn geom(&self) -> Point {
        Point::new(self.stop_lon, self.stop_lat)
    }
}

impl Id for Stop {
    fn id(&self) -> &str {
        &self.stop_id
    }
}

/// A trip and the ordered list of stops it serves.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Trip {
    pub trip_id: String,
    pub stop_ids: Vec<String>,
}

impl Trip {
    pub fn new<S: AsRef<str>>(trip_id: &str, stop_ids: &[S]) -> Trip {
        Trip {
            trip_id: trip_id.to_string(),
            stop_ids: stop_ids.iter().map(|s| s.as_ref().to_string()).collect(),
        }
    }
}
