//! Dead head trip routing on the rail network.
//!
//! Empty vehicles travel along the fastest network path, at the link's free
//! speed but never faster than a configured speed limit.

use std::collections::HashMap;

use petgraph::algo::astar;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::{debug, warn};

use crate::scenario::{Network, Timetable};

/// Duration and distance reported when no path exists.
pub const UNREACHABLE: u32 = i32::MAX as u32;

/// Allowed excess of the average speed over the limit, in m/s.
const SPEED_TOLERANCE: f64 = 0.001;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RouterError {
    #[error("speed limit must be positive, got {0} m/s")]
    InvalidSpeedLimit(f64),

    #[error("link {0} not found in network")]
    UnknownLink(String),

    #[error("stop facility {0} not found in timetable")]
    UnknownFacility(String),

    #[error("travel speed ({speed_kmh:.2} km/h) exceeds speed limit ({limit_kmh:.2} km/h)")]
    SpeedLimitExceeded { speed_kmh: f64, limit_kmh: f64 },
}

/// Shortest path result, rounded to whole seconds and meters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathResult {
    pub duration: u32,
    pub distance: u32,
}

impl PathResult {
    pub const UNREACHABLE: PathResult = PathResult {
        duration: UNREACHABLE,
        distance: UNREACHABLE,
    };

    pub fn is_reachable(&self) -> bool {
        *self != Self::UNREACHABLE
    }
}

#[derive(Debug, Clone, Copy)]
struct Edge {
    length: f64,
    /// Travel time in seconds.
    cost: f64,
}

/// Router over a directed graph of the network's nodes.
#[derive(Debug)]
pub struct TripMatrixRouter<'a> {
    network: &'a Network,
    graph: DiGraph<&'a str, Edge>,
    nodes: HashMap<&'a str, NodeIndex>,
    speed_limit: f64,
}

impl<'a> TripMatrixRouter<'a> {
    /// Build the routing graph. `speed_limit` is in m/s.
    ///
    /// Links with a non-positive free speed are left out.
    pub fn new(network: &'a Network, speed_limit: f64) -> Result<Self, RouterError> {
        if !(speed_limit.is_finite() && speed_limit > 0.0) {
            return Err(RouterError::InvalidSpeedLimit(speed_limit));
        }

        let mut graph = DiGraph::new();
        let mut nodes = HashMap::new();
        for node in network.all_nodes() {
            nodes.insert(node, graph.add_node(node));
        }

        let mut skipped = 0usize;
        for link in network.links.values() {
            if !(link.free_speed.is_finite() && link.free_speed > 0.0) {
                skipped += 1;
                continue;
            }
            let speed = link.free_speed.min(speed_limit);
            let cost = (link.length / speed).max(0.0);
            let from = nodes[link.from_node.as_str()];
            let to = nodes[link.to_node.as_str()];
            graph.add_edge(
                from,
                to,
                Edge {
                    length: link.length,
                    cost,
                },
            );
        }
        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            skipped,
            "Built routing graph"
        );

        Ok(Self {
            network,
            graph,
            nodes,
            speed_limit,
        })
    }

    /// Route from the end of `origin_link` to the start of `destination_link`.
    pub fn route(
        &self,
        origin_link: &str,
        destination_link: &str,
    ) -> Result<PathResult, RouterError> {
        let from = self.node(origin_link, |l| &l.to_node)?;
        let to = self.node(destination_link, |l| &l.from_node)?;

        let Some((cost, path)) = astar(
            &self.graph,
            from,
            |n| n == to,
            |e| e.weight().cost,
            |_| 0.0,
        ) else {
            warn!(
                from = self.graph[from],
                to = self.graph[to],
                "No path found, using unreachable duration and distance"
            );
            return Ok(PathResult::UNREACHABLE);
        };

        let distance: f64 = path
            .windows(2)
            .filter_map(|pair| {
                self.graph
                    .edges_connecting(pair[0], pair[1])
                    .map(|e| *e.weight())
                    .min_by(|a, b| a.cost.total_cmp(&b.cost))
            })
            .map(|e| e.length)
            .sum();

        self.check_speed(cost, distance)?;
        Ok(PathResult {
            duration: round(cost),
            distance: round(distance),
        })
    }

    /// Route between two stop facilities through their access links.
    pub fn route_facilities(
        &self,
        timetable: &Timetable,
        origin: &str,
        destination: &str,
    ) -> Result<PathResult, RouterError> {
        let link_of = |id: &str| {
            timetable
                .facility(id)
                .map(|f| f.link.as_str())
                .ok_or_else(|| RouterError::UnknownFacility(id.to_string()))
        };
        self.route(link_of(origin)?, link_of(destination)?)
    }

    fn node(
        &self,
        link: &str,
        endpoint: impl Fn(&crate::scenario::Link) -> &String,
    ) -> Result<NodeIndex, RouterError> {
        self.network
            .link(link)
            .and_then(|l| self.nodes.get(endpoint(l).as_str()).copied())
            .ok_or_else(|| RouterError::UnknownLink(link.to_string()))
    }

    fn check_speed(&self, duration: f64, distance: f64) -> Result<(), RouterError> {
        let speed = distance / duration;
        if speed > self.speed_limit + SPEED_TOLERANCE {
            return Err(RouterError::SpeedLimitExceeded {
                speed_kmh: speed * 3.6,
                limit_kmh: self.speed_limit * 3.6,
            });
        }
        Ok(())
    }
}

fn round(value: f64) -> u32 {
    value.round().clamp(0.0, f64::from(UNREACHABLE)) as u32
}
