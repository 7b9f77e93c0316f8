use std::collections::HashSet;

use geo_types::LineString;

use crate::gtfs::gtfs::StopCatalog;
use crate::gtfs::structs::{Stop, Trip};

use super::error::Error;
use super::geo_util;
use super::road_network::{GraphNode, RoadNetwork};

/// Number of trailing stop-to-stop segments that are not stitched
pub const UNSTITCHED_TAIL_SEGMENTS: usize = 2;

/// Number of segments stitched for a trip with `stop_count` stops.
///
/// Only the pairs `(0, 1) .. (n-4, n-3)` are routed, the final two segments of every
/// trip are left out of the path. Downstream consumers expect these shorter polylines.
pub fn stitched_segment_count(stop_count: usize) -> usize {
    stop_count.saturating_sub(1 + UNSTITCHED_TAIL_SEGMENTS)
}

/// Road-following path synthesized for one trip
#[derive(Debug, Clone, PartialEq)]
pub struct RoutePath {
    pub trip_id: String,
    /// Graph nodes in travel order, each node at most once
    pub nodes: Vec<GraphNode>,
    /// Number of stop pairs that were routed
    pub segments: usize,
}

impl RoutePath {
    /// Great-circle length of the polyline in meters
    pub fn length_meters(&self) -> f64 {
        self.nodes
            .windows(2)
            .map(|pair| geo_util::haversine(pair[0].lon, pair[0].lat, pair[1].lon, pair[1].lat))
            .sum()
    }

    /// Polyline with x = longitude, y = latitude
    pub fn to_line_string(&self) -> LineString {
        self.nodes.iter().map(|node| (node.lon, node.lat)).collect()
    }
}

/// A trip whose path could not be synthesized
#[derive(Debug)]
pub struct RouteFailure {
    pub trip_id: String,
    pub error: Error,
}

/// Outcome of stitching every trip of the network
#[derive(Debug, Default)]
pub struct StitchReport {
    /// Successful paths, in trip order
    pub routes: Vec<RoutePath>,
    pub failures: Vec<RouteFailure>,
}

impl StitchReport {
    pub fn print_stats(&self) {
        println!("Stitched routes:");
        println!("  Routes: {}", self.routes.len());
        println!("  Failed: {}", self.failures.len());
        println!(
            "  Path nodes: {}",
            self.routes.iter().map(|r| r.nodes.len()).sum::<usize>()
        );
    }
}

/// Builds route paths by snapping stops to the road graph and chaining shortest paths.
///
/// Only reads the road network, so separate trips can be stitched independently.
pub struct PathStitcher<'a> {
    road: &'a RoadNetwork,
    stops: &'a StopCatalog,
}

impl<'a> PathStitcher<'a> {
    pub fn new(road: &'a RoadNetwork, stops: &'a StopCatalog) -> Self {
        PathStitcher { road, stops }
    }

    /// Synthesize the path of a trip
    ///
    /// # Parameters
    /// - `trip`: A filtered trip; every stop id must be in the catalog
    ///
    /// # Returns
    /// The concatenation of the shortest paths between consecutive stops, with every
    /// node kept only at its first occurrence.
    /// `Error::NoPath` if any pair of consecutive stops is disconnected; the whole route
    /// is rejected rather than returning a partial polyline.
    pub fn stitch_route(&self, trip: &Trip) -> Result<RoutePath, Error> {
        let segments = stitched_segment_count(trip.stop_ids.len());
        let mut seen = HashSet::new();
        let mut nodes = Vec::new();
        for i in 0..segments {
            let (from_id, to_id) = (&trip.stop_ids[i], &trip.stop_ids[i + 1]);
            let (from, to) = (self.stop(from_id)?, self.stop(to_id)?);
            let start = self.road.nearest(from.stop_lat, from.stop_lon)?;
            let end = self.road.nearest(to.stop_lat, to.stop_lon)?;
            let (_, path) = self
                .road
                .shortest_path(start, end)
                .ok_or_else(|| Error::NoPath {
                    from: from_id.clone(),
                    to: to_id.clone(),
                })?;
            for node_index in path {
                if seen.insert(node_index) {
                    nodes.push(*self.road.get_node(node_index));
                }
            }
        }
        Ok(RoutePath {
            trip_id: trip.trip_id.clone(),
            nodes,
            segments,
        })
    }

    /// Stitch every trip. A failing trip is reported and skipped, it never aborts the others.
    pub fn stitch_all(&self, trips: &[Trip]) -> StitchReport {
        let mut report = StitchReport::default();
        for trip in trips {
            match self.stitch_route(trip) {
                Ok(route) => report.routes.push(route),
                Err(error) => {
                    log::warn!("Skipping route {}: {}", trip.trip_id, error);
                    report.failures.push(RouteFailure {
                        trip_id: trip.trip_id.clone(),
                        error,
                    });
                }
            }
        }
        report
    }

    fn stop(&self, stop_id: &str) -> Result<&'a Stop, Error> {
        self.stops
            .get(stop_id)
            .ok_or_else(|| Error::UnknownStop(stop_id.to_owned()))
    }
}
