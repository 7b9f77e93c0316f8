use std::path::Path;
use std::time::Instant;

use crate::config::Config;
use crate::gtfs::gtfs::Gtfs;
use crate::roster::assign::DriverAssigner;

use super::{
    error::Error,
    road_network::RoadNetwork,
    spatial_filter::{FilteredNetwork, SpatialFilter},
    transit_network::{PathStitcher, StitchReport},
    zone::{BusPool, ZoneClassifier},
};

/// Struct representing a city with its feed, filtered trips, road graph and zones.
/// Everything is read-only once loaded.
pub struct City {
    pub config: Config,
    pub gtfs: Gtfs,
    pub network: FilteredNetwork,
    pub road: RoadNetwork,
    pub zones: ZoneClassifier,
}

impl City {
    /// Prints statistics about the city's data structures
    pub fn print_stats(&self) {
        self.gtfs.print_stats();
        self.network.print_stats();
        self.road.print_stats();
    }

    /// Load the feed from disk and build every layer
    ///
    /// # Parameters
    /// - `config`: Bounding box, zone center and graph precision
    /// - `stops_path`: The stops table
    /// - `stop_times_path`: The trip-stop table
    ///
    /// # Returns
    /// A fully loaded city, or an error if the config is invalid or a table cannot be read
    pub fn load<P, Q>(config: Config, stops_path: P, stop_times_path: Q) -> Result<City, Error>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        config.validate()?;

        let gtfs_start = Instant::now();
        log::debug!("Loading stops from {}", stops_path.as_ref().display());
        let gtfs = Gtfs::from_files(stops_path, stop_times_path)?;
        log::debug!("Feed loaded in {}ms", gtfs_start.elapsed().as_millis());

        City::from_gtfs(config, gtfs)
    }

    /// Build every layer from an already loaded feed
    pub fn from_gtfs(config: Config, gtfs: Gtfs) -> Result<City, Error> {
        config.validate()?;
        let start = Instant::now();
        let filter = SpatialFilter::new(config.bbox)?;
        let zones = ZoneClassifier::new(config.zone_center)?;

        let filter_start = Instant::now();
        let network = filter.filter(&gtfs.stops, &gtfs.trips);
        log::debug!(
            "{} of {} trips kept inside {:?} in {}ms",
            network.trips.len(),
            gtfs.trips.len(),
            filter.bbox(),
            filter_start.elapsed().as_millis()
        );

        let road_start = Instant::now();
        let road = RoadNetwork::from_trips(&network.trips, &gtfs.stops, config.coordinate_precision)?;
        log::debug!(
            "Road network built in {}ms",
            road_start.elapsed().as_millis()
        );

        log::debug!("City fully loaded in {}ms", start.elapsed().as_millis());
        Ok(City {
            config,
            gtfs,
            network,
            road,
            zones,
        })
    }

    /// Synthesize the path of every filtered trip
    pub fn stitch_routes(&self) -> StitchReport {
        let start = Instant::now();
        let report = PathStitcher::new(&self.road, &self.gtfs.stops).stitch_all(&self.network.trips);
        log::debug!(
            "Stitched {} routes ({} failed) in {}ms",
            report.routes.len(),
            report.failures.len(),
            start.elapsed().as_millis()
        );
        report
    }

    /// Buses available in every zone, one per filtered trip
    pub fn bus_pool(&self) -> BusPool {
        BusPool::from_trips(&self.network.trips, &self.gtfs.stops, &self.zones)
    }

    pub fn driver_assigner(&self) -> DriverAssigner {
        DriverAssigner::new(self.bus_pool())
    }
}
