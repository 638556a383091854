use crate::errors::RoutingError;
use crate::logic::types::NodeId;
use ahash::RandomState;
use petgraph::algo::connected_components;
use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Display;
use std::fs;
use std::path::Path;
use tracing::info;

pub type FastHasher = RandomState;
/// FastHashMap using ahash
pub type FastHashMap<K, V> = HashMap<K, V, FastHasher>;

/// Undirected capacitated payment-channel network.
///
/// Owned exclusively by the caller after generation and never mutated by the route finder,
/// which keeps its own [`crate::logic::WorkingWeights`] overlay.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelGraph {
    // Nodes are never removed, so indices stay stable for the lifetime of the graph
    pub(crate) graph: UnGraph<ChannelNode, Channel, usize>,
    // node id -> node index, rebuilt after deserialization
    #[serde(skip)]
    pub(crate) node_index: FastHashMap<NodeId, NodeIndex<usize>>,
}

impl ChannelGraph {
    pub fn new() -> Self {
        Self { graph: UnGraph::default(), node_index: FastHashMap::default() }
    }

    /// Build a graph from explicit channels `(u, v, capacity, fee)`. Nodes are created on first use.
    pub fn from_channels(channels: &[(NodeId, NodeId, u64, f64)]) -> Result<Self, RoutingError> {
        let mut channel_graph = Self::new();
        for &(u, v, capacity, fee) in channels {
            channel_graph.add_channel(u, v, capacity, fee)?;
        }
        Ok(channel_graph)
    }

    pub fn add_or_get_node(&mut self, node: NodeId) -> NodeIndex<usize> {
        *self.node_index.entry(node).or_insert_with(|| self.graph.add_node(ChannelNode::new(node)))
    }

    /// Add a channel between two nodes. Self-loops, duplicates, zero capacity and
    /// non-positive fees are rejected.
    pub fn add_channel(&mut self, u: NodeId, v: NodeId, capacity: u64, fee: f64) -> Result<EdgeIndex<usize>, RoutingError> {
        if u == v {
            return Err(RoutingError::InvalidChannel { u, v, reason: "self-loop".to_string() });
        }
        let channel = Channel::new(capacity, fee).map_err(|reason| RoutingError::InvalidChannel { u, v, reason })?;

        let node_u = self.add_or_get_node(u);
        let node_v = self.add_or_get_node(v);
        if self.graph.find_edge(node_u, node_v).is_some() {
            return Err(RoutingError::InvalidChannel { u, v, reason: "duplicate channel".to_string() });
        }
        Ok(self.graph.add_edge(node_u, node_v, channel))
    }

    /// Read-only view of the underlying petgraph graph
    pub fn graph(&self) -> &UnGraph<ChannelNode, Channel, usize> {
        &self.graph
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn channel_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains_node(&self, node: NodeId) -> bool {
        self.node_index.contains_key(&node)
    }

    pub fn index_of(&self, node: NodeId) -> Option<NodeIndex<usize>> {
        self.node_index.get(&node).copied()
    }

    pub fn node_id(&self, index: NodeIndex<usize>) -> Option<NodeId> {
        self.graph.node_weight(index).map(|node| node.id)
    }

    /// Node ids in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.node_weights().map(|node| node.id)
    }

    /// The channel between `u` and `v` in either direction
    pub fn channel(&self, u: NodeId, v: NodeId) -> Option<&Channel> {
        let edge_index = self.graph.find_edge(self.index_of(u)?, self.index_of(v)?)?;
        self.graph.edge_weight(edge_index)
    }

    pub fn channel_index(&self, u: NodeId, v: NodeId) -> Option<EdgeIndex<usize>> {
        self.graph.find_edge(self.index_of(u)?, self.index_of(v)?)
    }

    /// All channels as `(key, channel)` in edge index order
    pub fn channels(&self) -> impl Iterator<Item = (ChannelKey, &Channel)> + '_ {
        self.graph.edge_references().map(|edge| {
            let u = self.graph[edge.source()].id;
            let v = self.graph[edge.target()].id;
            (ChannelKey::new(u, v), edge.weight())
        })
    }

    pub fn degree(&self, node: NodeId) -> usize {
        self.index_of(node).map(|idx| self.graph.neighbors(idx).count()).unwrap_or(0)
    }

    pub fn is_connected(&self) -> bool {
        self.node_count() > 0 && connected_components(&self.graph) == 1
    }

    /// Aggregate statistics, recomputed on every call
    pub fn statistics(&self) -> TopologyStats {
        let degrees: Vec<usize> = self.graph.node_indices().map(|idx| self.graph.neighbors(idx).count()).collect();
        let capacities: Vec<u64> = self.graph.edge_weights().map(|channel| channel.capacity).collect();
        let fees: Vec<f64> = self.graph.edge_weights().map(|channel| channel.fee).collect();

        TopologyStats {
            num_nodes: self.node_count(),
            num_edges: self.channel_count(),
            avg_degree: mean(degrees.iter().map(|d| *d as f64), degrees.len()),
            min_degree: degrees.iter().copied().min().unwrap_or(0),
            max_degree: degrees.iter().copied().max().unwrap_or(0),
            avg_capacity: mean(capacities.iter().map(|c| *c as f64), capacities.len()),
            min_capacity: capacities.iter().copied().min().unwrap_or(0),
            max_capacity: capacities.iter().copied().max().unwrap_or(0),
            avg_fee: mean(fees.iter().copied(), fees.len()),
            is_connected: self.is_connected(),
        }
    }

    /// Persist nodes, channels and their attributes as JSON
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<(), RoutingError> {
        let serialized = serde_json::to_string(self)?;
        fs::write(path.as_ref(), serialized)?;
        info!("Saved topology with {} nodes and {} channels to {}", self.node_count(), self.channel_count(), path.as_ref().display());
        Ok(())
    }

    /// Load a topology written by [`ChannelGraph::save_json`]. Channel attributes are re-validated.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self, RoutingError> {
        let contents = fs::read_to_string(path.as_ref())?;
        let mut channel_graph: ChannelGraph = serde_json::from_str(&contents)?;
        channel_graph.rebuild_index();

        for edge in channel_graph.graph.edge_references() {
            let channel = edge.weight();
            if let Err(reason) = Channel::new(channel.capacity, channel.fee) {
                let u = channel_graph.graph[edge.source()].id;
                let v = channel_graph.graph[edge.target()].id;
                return Err(RoutingError::InvalidChannel { u, v, reason });
            }
        }
        for channel in channel_graph.graph.edge_weights_mut() {
            channel.weight = channel.fee;
        }
        Ok(channel_graph)
    }

    fn rebuild_index(&mut self) {
        self.node_index = self.graph.node_indices().map(|idx| (self.graph[idx].id, idx)).collect();
    }
}

fn mean(values: impl Iterator<Item = f64>, len: usize) -> f64 {
    if len == 0 { 0.0 } else { values.sum::<f64>() / len as f64 }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelNode {
    pub id: NodeId,
}

impl Display for ChannelNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl ChannelNode {
    pub fn new(id: NodeId) -> Self {
        Self { id }
    }
}

/// Payment channel attributes. `capacity > 0` and `fee > 0` always hold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub capacity: u64,
    /// Immutable base cost
    pub fee: f64,
    /// Search weight, initialised to `fee`
    pub weight: f64,
}

impl Channel {
    pub fn new(capacity: u64, fee: f64) -> Result<Self, String> {
        if capacity == 0 {
            return Err("capacity must be positive".to_string());
        }
        if !(fee.is_finite() && fee > 0.0) {
            return Err(format!("fee must be positive, got {fee}"));
        }
        Ok(Self { capacity, fee, weight: fee })
    }
}

impl Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Channel(capacity={}, fee={:.4})", self.capacity, self.fee)
    }
}

/// Direction-independent channel identity, smaller endpoint first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelKey(pub NodeId, pub NodeId);

impl ChannelKey {
    pub fn new(u: NodeId, v: NodeId) -> Self {
        if u <= v { Self(u, v) } else { Self(v, u) }
    }
}

impl Display for ChannelKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.0, self.1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopologyStats {
    pub num_nodes: usize,
    pub num_edges: usize,
    pub avg_degree: f64,
    pub min_degree: usize,
    pub max_degree: usize,
    pub avg_capacity: f64,
    pub min_capacity: u64,
    pub max_capacity: u64,
    pub avg_fee: f64,
    pub is_connected: bool,
}
