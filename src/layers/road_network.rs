use geo_types::Point;
use petgraph::algo::astar;
use petgraph::graph::{NodeIndex, UnGraph};
use std::collections::HashMap;

use crate::gtfs::gtfs::StopCatalog;
use crate::gtfs::structs::{Stop, Trip};

use super::error::Error;
use super::geo_util::{self, coord_key};
use super::nearest::NearestNodeIndex;

/// A vertex of the road graph, located at a stop coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GraphNode {
    pub lat: f64,
    pub lon: f64,
}

impl GraphNode {
    pub fn geom(&self) -> Point {
        Point::new(self.lon, self.lat)
    }

    pub fn x_y(&self) -> [f64; 2] {
        [self.lon, self.lat]
    }
}

impl From<&Stop> for GraphNode {
    fn from(stop: &Stop) -> Self {
        GraphNode {
            lat: stop.stop_lat,
            lon: stop.stop_lon,
        }
    }
}

/// Accumulates trip adjacencies into an undirected weighted graph.
///
/// Nodes are keyed by their coordinate rounded to `precision` decimal places, so two stops
/// at the same location share a node no matter which trip introduced them.
pub struct RoadGraphBuilder {
    graph: UnGraph<GraphNode, f64>,
    node_map: HashMap<(i64, i64), NodeIndex>,
    precision: u32,
}

impl RoadGraphBuilder {
    pub fn new(precision: u32) -> Self {
        RoadGraphBuilder {
            graph: UnGraph::new_undirected(),
            node_map: HashMap::new(),
            precision,
        }
    }

    /// Gets or creates the node for the given coordinates
    fn get_or_create_node(&mut self, node: GraphNode) -> NodeIndex {
        let key = coord_key(node.lat, node.lon, self.precision);
        if let Some(&idx) = self.node_map.get(&key) {
            idx
        } else {
            let idx = self.graph.add_node(node);
            self.node_map.insert(key, idx);
            idx
        }
    }

    /// Connect two coordinates. An existing edge between the same nodes gets its weight overwritten.
    pub fn add_segment(&mut self, a: GraphNode, b: GraphNode) {
        let from = self.get_or_create_node(a);
        let to = self.get_or_create_node(b);
        let weight = geo_util::planar_distance(self.graph[from].geom(), self.graph[to].geom());
        self.graph.update_edge(from, to, weight);
    }

    /// Add an edge for every pair of consecutive stops of the trip
    pub fn add_trip(&mut self, trip: &Trip, stops: &StopCatalog) -> Result<(), Error> {
        let nodes = trip
            .stop_ids
            .iter()
            .map(|stop_id| {
                stops
                    .get(stop_id)
                    .map(GraphNode::from)
                    .ok_or_else(|| Error::UnknownStop(stop_id.clone()))
            })
            .collect::<Result<Vec<GraphNode>, Error>>()?;
        for pair in nodes.windows(2) {
            self.add_segment(pair[0], pair[1]);
        }
        Ok(())
    }

    pub fn build(self) -> RoadNetwork {
        let index = NearestNodeIndex::new(&self.graph);
        RoadNetwork {
            graph: self.graph,
            index,
        }
    }
}

/// Graph of the stop-to-stop segments served by the filtered trips.
/// Immutable once built; all queries take `&self`.
pub struct RoadNetwork {
    graph: UnGraph<GraphNode, f64>,
    index: NearestNodeIndex,
}

impl RoadNetwork {
    pub fn print_stats(&self) {
        println!("Road network:");
        println!("  Nodes: {}", self.graph.node_count());
        println!("  Edges: {}", self.graph.edge_count());
    }

    /// Build the graph shared by all trips
    ///
    /// # Parameters
    /// - `trips`: The filtered trips
    /// - `stops`: Coordinates of every stop referenced by `trips`
    /// - `precision`: Number of decimal places used to merge coordinates into one node
    pub fn from_trips(trips: &[Trip], stops: &StopCatalog, precision: u32) -> Result<RoadNetwork, Error> {
        let mut builder = RoadGraphBuilder::new(precision);
        for trip in trips {
            builder.add_trip(trip, stops)?;
        }
        Ok(builder.build())
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn get_node(&self, node_index: NodeIndex) -> &GraphNode {
        &self.graph[node_index]
    }

    /// Weight of the edge between two nodes, if they are adjacent
    pub fn edge_weight(&self, a: NodeIndex, b: NodeIndex) -> Option<f64> {
        self.graph
            .find_edge(a, b)
            .and_then(|edge| self.graph.edge_weight(edge))
            .copied()
    }

    /// Snap a coordinate to the closest node of the graph
    pub fn nearest(&self, lat: f64, lon: f64) -> Result<NodeIndex, Error> {
        self.index.nearest(lat, lon)
    }

    /// Computes the minimum weight path between two nodes.
    ///
    /// # Returns
    /// The total weight and the nodes of the path, both ends included,
    /// or None if the nodes are not connected.
    pub fn shortest_path(&self, from: NodeIndex, to: NodeIndex) -> Option<(f64, Vec<NodeIndex>)> {
        // A* with a zero heuristic is Dijkstra that also returns the path
        astar(&self.graph, from, |n| n == to, |e| *e.weight(), |_| 0.0)
    }
}
