use super::types::NodeId;
use crate::topology::{ChannelGraph, ChannelKey};
use serde::{Deserialize, Serialize};
use sha2::digest::Update;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt::{Debug, Display};
use std::hash::{Hash, Hasher};
use tracing::warn;

#[derive(Clone, Default, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct RouteHash(pub [u8; 32]);

impl Display for RouteHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x")?;
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl Debug for RouteHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RouteHash({self})")
    }
}

/// A path through the channel network, `nodes[0]` is the payer and the last node the payee.
#[derive(Clone, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<NodeId>", into = "Vec<NodeId>")]
pub struct Route {
    // hash of the node sequence, used for deduplication
    pub route_hash: RouteHash,
    pub nodes: Vec<NodeId>,
}

impl Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rendered: Vec<String> = self.nodes.iter().map(|node| node.to_string()).collect();
        write!(f, "{}", rendered.join(" -> "))
    }
}

impl Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Route({:?})", self.nodes)
    }
}

impl Route {
    pub fn new(nodes: Vec<NodeId>) -> Self {
        let route_hash = generate_route_hash(&nodes);
        Route { route_hash, nodes }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn source(&self) -> Option<NodeId> {
        self.nodes.first().copied()
    }

    pub fn target(&self) -> Option<NodeId> {
        self.nodes.last().copied()
    }

    /// The hop count, i.e. node count - 1
    pub fn hops(&self) -> usize {
        self.nodes.len().saturating_sub(1)
    }

    /// True if no node repeats
    pub fn is_simple(&self) -> bool {
        let mut seen = HashSet::with_capacity(self.nodes.len());
        self.nodes.iter().all(|node| seen.insert(*node))
    }

    /// The traversed channels, in hop order
    pub fn channels(&self) -> impl Iterator<Item = ChannelKey> + '_ {
        self.nodes.windows(2).map(|pair| ChannelKey::new(pair[0], pair[1]))
    }

    /// True if any hop crosses channel `key` in either direction
    pub fn uses_channel(&self, key: ChannelKey) -> bool {
        self.channels().any(|channel| channel == key)
    }

    /// Hop count, summed fee and per-hop capacities measured against `channel_graph`.
    /// Hops over channels missing from the graph are reported, not fatal.
    pub fn info(&self, channel_graph: &ChannelGraph) -> RouteInfo {
        let mut info = RouteInfo { num_hops: self.hops(), ..Default::default() };

        for key in self.channels() {
            info.channels.push(key);
            match channel_graph.channel(key.0, key.1) {
                Some(channel) => {
                    info.total_fee += channel.fee;
                    info.capacities.push(channel.capacity);
                }
                None => {
                    warn!("Channel {} on route {} does not exist", key, self);
                    info.missing_channels.push(key);
                }
            }
        }

        if !info.capacities.is_empty() {
            info.avg_capacity = info.capacities.iter().sum::<u64>() as f64 / info.capacities.len() as f64;
        }
        info
    }
}

impl From<Vec<NodeId>> for Route {
    fn from(nodes: Vec<NodeId>) -> Self {
        Route::new(nodes)
    }
}

impl From<Route> for Vec<NodeId> {
    fn from(route: Route) -> Self {
        route.nodes
    }
}

impl Hash for Route {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.nodes.hash(state);
    }
}

impl PartialEq for Route {
    fn eq(&self, other: &Self) -> bool {
        self.nodes == other.nodes
    }
}

/// Hash the node ids of the route to a sha256 hash, stable across runs and platforms.
pub fn generate_route_hash(nodes: &[NodeId]) -> RouteHash {
    let mut hasher = Sha256::new();
    for node in nodes {
        Update::update(&mut hasher, &node.to_be_bytes());
    }
    RouteHash(hasher.finalize().into())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteInfo {
    pub num_hops: usize,
    pub total_fee: f64,
    pub channels: Vec<ChannelKey>,
    pub capacities: Vec<u64>,
    pub avg_capacity: f64,
    /// Hops whose channel is not in the topology
    pub missing_channels: Vec<ChannelKey>,
}
