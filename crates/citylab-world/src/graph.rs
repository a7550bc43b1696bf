//! City graph: locations as nodes, street segments as weighted edges.
//!
//! The [`CityGraph`] is built once from [`CityData`] and never mutated
//! afterwards. Edges are undirected unless their attributes carry
//! `oneway: true`. An outbound adjacency index maps every node to the edges
//! leaving it, so neighbor lookups and shortest-path search never scan the
//! full edge list.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use citylab_types::{CityData, EdgeSpec};
use serde::Serialize;

use crate::error::WorldError;

/// A location in the city.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    /// Node id.
    pub id: String,
    /// Free-form attributes.
    pub attrs: BTreeMap<String, serde_json::Value>,
}

/// A street segment between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Edge {
    /// Origin node.
    pub source: String,
    /// Destination node.
    pub target: String,
    /// Base travel time in minutes.
    pub weight: f64,
    /// Whether the edge can only be traversed from `source` to `target`.
    pub oneway: bool,
    /// Free-form attributes.
    pub attrs: BTreeMap<String, serde_json::Value>,
}

/// A path found by [`CityGraph::shortest_path`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Path {
    /// Node ids from start to goal, inclusive.
    pub nodes: Vec<String>,
    /// Sum of edge weights along the path, in minutes.
    pub cost: f64,
}

/// Totally ordered edge cost for the Dijkstra queue.
#[derive(Debug, Clone, Copy)]
struct Cost(f64);

impl PartialEq for Cost {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Cost {}

impl PartialOrd for Cost {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Cost {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// The immutable city graph.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CityGraph {
    nodes: BTreeMap<String, Node>,
    edges: Vec<Edge>,
    /// Outbound adjacency: node -> indices into `edges` usable from it.
    outbound: BTreeMap<String, Vec<usize>>,
}

impl CityGraph {
    /// Build the graph from city data.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::DuplicateNode`], [`WorldError::NodeNotFound`]
    /// for edges with unknown endpoints, or [`WorldError::InvalidWeight`]
    /// for negative or non-finite weights.
    pub fn from_data(data: &CityData) -> Result<Self, WorldError> {
        let mut graph = Self::default();
        for spec in &data.nodes {
            if graph.nodes.contains_key(&spec.id) {
                return Err(WorldError::DuplicateNode(spec.id.clone()));
            }
            graph.nodes.insert(
                spec.id.clone(),
                Node {
                    id: spec.id.clone(),
                    attrs: spec.attrs.clone(),
                },
            );
            graph.outbound.entry(spec.id.clone()).or_default();
        }
        for spec in &data.edges {
            graph.add_edge(spec)?;
        }
        Ok(graph)
    }

    fn add_edge(&mut self, spec: &EdgeSpec) -> Result<(), WorldError> {
        for endpoint in [&spec.source, &spec.target] {
            if !self.nodes.contains_key(endpoint) {
                return Err(WorldError::NodeNotFound(endpoint.clone()));
            }
        }
        if !spec.weight.is_finite() || spec.weight < 0.0 {
            return Err(WorldError::InvalidWeight {
                source_node: spec.source.clone(),
                target_node: spec.target.clone(),
                weight: spec.weight,
            });
        }

        let oneway = spec
            .attrs
            .get("oneway")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false);
        let index = self.edges.len();
        self.edges.push(Edge {
            source: spec.source.clone(),
            target: spec.target.clone(),
            weight: spec.weight,
            oneway,
            attrs: spec.attrs.clone(),
        });
        self.outbound.entry(spec.source.clone()).or_default().push(index);
        if !oneway && spec.source != spec.target {
            self.outbound.entry(spec.target.clone()).or_default().push(index);
        }
        Ok(())
    }

    /// Look up a node.
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Whether the node exists.
    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges as supplied (undirected edges count once).
    pub const fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Node ids in sorted order.
    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    /// Nodes reachable over one edge, with the edge weight.
    pub fn neighbors(&self, id: &str) -> Vec<(&str, f64)> {
        let Some(indices) = self.outbound.get(id) else {
            return Vec::new();
        };
        indices
            .iter()
            .filter_map(|&i| self.edges.get(i))
            .map(|edge| {
                let other = if edge.source == id {
                    edge.target.as_str()
                } else {
                    edge.source.as_str()
                };
                (other, edge.weight)
            })
            .collect()
    }

    /// Shortest path by total weight (Dijkstra).
    ///
    /// Returns `None` when either node is unknown or the goal is
    /// unreachable. Ties between equal-cost frontiers resolve by node id, so
    /// the result is deterministic.
    pub fn shortest_path(&self, start: &str, goal: &str) -> Option<Path> {
        if !self.contains(start) || !self.contains(goal) {
            return None;
        }
        if start == goal {
            return Some(Path {
                nodes: vec![start.to_owned()],
                cost: 0.0,
            });
        }

        let mut dist: BTreeMap<&str, f64> = BTreeMap::new();
        let mut prev: BTreeMap<&str, &str> = BTreeMap::new();
        let mut queue: BTreeSet<(Cost, &str)> = BTreeSet::new();

        dist.insert(start, 0.0);
        queue.insert((Cost(0.0), start));

        while let Some((Cost(current_dist), current)) = queue.pop_first() {
            if current == goal {
                break;
            }
            for (neighbor, weight) in self.neighbors(current) {
                let candidate = current_dist + weight;
                let shorter = dist
                    .get(neighbor)
                    .is_none_or(|&existing| candidate < existing);
                if shorter {
                    if let Some(&old) = dist.get(neighbor) {
                        queue.remove(&(Cost(old), neighbor));
                    }
                    dist.insert(neighbor, candidate);
                    prev.insert(neighbor, current);
                    queue.insert((Cost(candidate), neighbor));
                }
            }
        }

        let cost = *dist.get(goal)?;
        let mut nodes = VecDeque::new();
        let mut current = goal;
        nodes.push_front(current.to_owned());
        while let Some(&predecessor) = prev.get(current) {
            nodes.push_front(predecessor.to_owned());
            if predecessor == start {
                break;
            }
            current = predecessor;
        }

        Some(Path {
            nodes: nodes.into_iter().collect(),
            cost,
        })
    }

    /// Base travel time in minutes between two nodes, if connected.
    pub fn travel_time(&self, from: &str, to: &str) -> Option<f64> {
        self.shortest_path(from, to).map(|path| path.cost)
    }
}
