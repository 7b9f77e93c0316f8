use petgraph::graph::{NodeIndex, UnGraph};
use rstar::{PointDistance, RTree, RTreeObject, AABB};

use super::error::Error;
use super::road_network::GraphNode;

/// Spatial index over the nodes of the road graph, used to snap stops to graph nodes.
pub struct NearestNodeIndex {
    tree: RTree<RTreeNode>,
}

impl NearestNodeIndex {
    pub fn new(graph: &UnGraph<GraphNode, f64>) -> NearestNodeIndex {
        let nodes = graph
            .node_indices()
            .map(|node_index| RTreeNode {
                point: graph[node_index].x_y(),
                node_index,
            })
            .collect();
        NearestNodeIndex {
            tree: RTree::bulk_load(nodes),
        }
    }

    pub fn size(&self) -> usize {
        self.tree.size()
    }

    /// Find the graph node closest to a coordinate, by planar distance.
    ///
    /// # Returns
    /// The index of the closest node. When several nodes are at the same distance,
    /// the one inserted first in the graph wins.
    /// `Error::EmptyGraph` if the graph has no nodes.
    pub fn nearest(&self, lat: f64, lon: f64) -> Result<NodeIndex, Error> {
        let query = [lon, lat];
        let mut candidates = self.tree.nearest_neighbor_iter_with_distance_2(&query);
        let (first, best) = candidates.next().ok_or(Error::EmptyGraph)?;
        let mut winner = first.node_index;
        for (candidate, distance_2) in candidates {
            if distance_2 > best {
                break;
            }
            winner = winner.min(candidate.node_index);
        }
        Ok(winner)
    }
}

#[derive(PartialEq, Clone, Debug)]
pub struct RTreeNode {
    point: [f64; 2],
    node_index: NodeIndex,
}

impl PointDistance for RTreeNode {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.point[0] - point[0];
        let dy = self.point[1] - point[1];
        dx * dx + dy * dy
    }
}

impl RTreeObject for RTreeNode {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}
