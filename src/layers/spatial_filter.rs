use std::collections::HashSet;

use crate::gtfs::gtfs::{StopCatalog, TripRegistry};
use crate::gtfs::structs::Trip;

use super::error::Error;
use super::geo_util::BoundingBox;

/// Minimum number of stops a trip needs to be routable
pub const MIN_TRIP_STOPS: usize = 2;

/// Restricts the feed to the stops inside a bounding box.
pub struct SpatialFilter {
    bbox: BoundingBox,
}

/// The trips that survive the filter, plus per-stop flags.
/// The stop catalog itself is never shrunk.
#[derive(Debug, Default)]
pub struct FilteredNetwork {
    /// Surviving trips with out-of-box stops removed, in registry order
    pub trips: Vec<Trip>,
    /// Stops whose coordinate lies inside the box
    pub in_bounds: HashSet<String>,
    /// Stops of the catalog that no surviving trip serves. Their markers are suppressed downstream.
    pub orphans: HashSet<String>,
}

impl FilteredNetwork {
    pub fn is_orphan(&self, stop_id: &str) -> bool {
        self.orphans.contains(stop_id)
    }

    /// Whether the stop should get a map marker
    pub fn is_visible(&self, stop_id: &str) -> bool {
        self.in_bounds.contains(stop_id) && !self.is_orphan(stop_id)
    }

    pub fn print_stats(&self) {
        println!("Filtered network:");
        println!("  Trips: {}", self.trips.len());
        println!("  Stops in bounds: {}", self.in_bounds.len());
        println!("  Orphan stops: {}", self.orphans.len());
    }
}

impl SpatialFilter {
    /// # Returns
    /// `Error::Config` if the bounding box is degenerate
    pub fn new(bbox: BoundingBox) -> Result<SpatialFilter, Error> {
        bbox.validate()?;
        Ok(SpatialFilter { bbox })
    }

    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    /// Drop out-of-box stops from every trip, then drop trips left with fewer than two stops.
    ///
    /// Stop ids that are not in the catalog are dropped as well since they have no coordinate.
    /// Relative stop order within a trip is preserved.
    pub fn filter(&self, stops: &StopCatalog, trips: &TripRegistry) -> FilteredNetwork {
        let in_bounds: HashSet<String> = stops
            .iter()
            .filter(|stop| self.bbox.contains(stop.stop_lat, stop.stop_lon))
            .map(|stop| stop.stop_id.clone())
            .collect();

        let mut kept = Vec::new();
        for trip in trips.iter() {
            let stop_ids: Vec<String> = trip
                .stop_ids
                .iter()
                .filter(|stop_id| in_bounds.contains(stop_id.as_str()))
                .cloned()
                .collect();
            if stop_ids.len() < MIN_TRIP_STOPS {
                log::debug!(
                    "Dropping trip {} with {} stops inside the bounding box",
                    trip.trip_id,
                    stop_ids.len()
                );
                continue;
            }
            kept.push(Trip {
                trip_id: trip.trip_id.clone(),
                stop_ids,
            });
        }

        let served: HashSet<&str> = kept
            .iter()
            .flat_map(|trip| trip.stop_ids.iter().map(String::as_str))
            .collect();
        let orphans = stops
            .iter()
            .filter(|stop| !served.contains(stop.stop_id.as_str()))
            .map(|stop| stop.stop_id.clone())
            .collect();

        FilteredNetwork {
            trips: kept,
            in_bounds,
            orphans,
        }
    }
}
