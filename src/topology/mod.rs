/// Topology Layer
///
/// Synthetic payment-channel network: generation, statistics and persistence.
/// The generated graph is read-only for every downstream component.

pub mod channel_graph;
pub mod generator;

pub use channel_graph::{Channel, ChannelGraph, ChannelKey, ChannelNode, FastHashMap, TopologyStats};
pub use generator::{TopologyConfig, TopologyGenerator, BASE_FEE};
