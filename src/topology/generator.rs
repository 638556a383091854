use super::channel_graph::ChannelGraph;
use crate::errors::RoutingError;
use crate::logic::types::NodeId;
use petgraph::algo::has_path_connecting;
use petgraph::graphmap::UnGraphMap;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Base fee every channel fee is scaled from
pub const BASE_FEE: f64 = 0.1;
/// Lower bound for the Gaussian fee multiplier, keeps fees strictly positive
pub const MIN_FEE_MULTIPLIER: f64 = 0.01;
/// Random edge additions get this many attempts per missing edge
const ADD_ATTEMPTS_PER_EDGE: usize = 10;

/// Parameters of a synthetic payment-channel network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyConfig {
    pub num_nodes: usize,
    pub num_channels: usize,
    /// Inclusive capacity range `(min, max)`
    pub capacity_range: (u64, u64),
    pub seed: u64,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self { num_nodes: 2000, num_channels: 20000, capacity_range: (200, 900), seed: 42 }
    }
}

impl TopologyConfig {
    pub fn validate(&self) -> Result<(), RoutingError> {
        if self.num_nodes < 2 {
            return Err(RoutingError::InvalidConfig(format!("num_nodes must be at least 2, got {}", self.num_nodes)));
        }
        if self.num_nodes > NodeId::MAX as usize {
            return Err(RoutingError::InvalidConfig(format!("num_nodes {} exceeds the node id range", self.num_nodes)));
        }
        if self.num_channels == 0 {
            return Err(RoutingError::InvalidConfig("num_channels must be positive".to_string()));
        }
        let (cmin, cmax) = self.capacity_range;
        if cmin == 0 || cmin > cmax {
            return Err(RoutingError::InvalidConfig(format!("capacity range ({cmin}, {cmax}) must satisfy 0 < min <= max")));
        }
        Ok(())
    }

    /// Edges each new node attaches with, targeting an average degree of `2E/N`
    pub fn attachment_edges(&self) -> usize {
        let avg_degree = self.num_channels * 2 / self.num_nodes;
        (avg_degree / 2).max(1).min(self.num_nodes - 1)
    }
}

/// Builds a connected scale-free channel network with random capacities and fees.
///
/// The edge count is approximate: additions are bounded by a retry budget and removals
/// never disconnect the graph. Both deviations are logged, never raised.
pub struct TopologyGenerator {
    config: TopologyConfig,
}

impl TopologyGenerator {
    pub fn new(config: TopologyConfig) -> Result<Self, RoutingError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &TopologyConfig {
        &self.config
    }

    /// Generate using a generator seeded from the configured seed
    pub fn generate(&self) -> Result<ChannelGraph, RoutingError> {
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        self.generate_with_rng(&mut rng)
    }

    pub fn generate_with_rng<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<ChannelGraph, RoutingError> {
        let mut backbone = self.preferential_attachment(rng);
        let target = self.config.num_channels;
        let current = backbone.edge_count();

        if current < target {
            self.add_random_edges(&mut backbone, target - current, rng);
        } else if current > target {
            self.remove_random_edges(&mut backbone, current - target, rng);
        }

        let channel_graph = self.assign_attributes(&backbone, rng)?;
        info!(
            "Generated topology: {} nodes, {} channels (target {})",
            channel_graph.node_count(),
            channel_graph.channel_count(),
            target
        );
        Ok(channel_graph)
    }

    /// Rich-get-richer backbone: a star over the first `m + 1` nodes, then every new node
    /// links to `m` distinct existing nodes picked proportionally to their degree.
    fn preferential_attachment<R: Rng + ?Sized>(&self, rng: &mut R) -> UnGraphMap<NodeId, ()> {
        let n = self.config.num_nodes as NodeId;
        let m = self.config.attachment_edges();
        let mut graph = UnGraphMap::with_capacity(self.config.num_nodes, self.config.num_nodes * m);

        for node in 0..n {
            graph.add_node(node);
        }

        // Every node appears once per incident edge
        let mut repeated_nodes: Vec<NodeId> = Vec::with_capacity(2 * self.config.num_nodes * m);
        for leaf in 1..=m as NodeId {
            graph.add_edge(0, leaf, ());
            repeated_nodes.push(0);
            repeated_nodes.push(leaf);
        }

        for source in (m as NodeId + 1)..n {
            let mut targets = BTreeSet::new();
            while targets.len() < m {
                let pick = repeated_nodes[rng.gen_range(0..repeated_nodes.len())];
                targets.insert(pick);
            }
            for &target in &targets {
                graph.add_edge(source, target, ());
                repeated_nodes.push(target);
                repeated_nodes.push(source);
            }
        }

        debug!("Preferential attachment backbone: m={}, {} edges", m, graph.edge_count());
        graph
    }

    fn add_random_edges<R: Rng + ?Sized>(&self, graph: &mut UnGraphMap<NodeId, ()>, missing: usize, rng: &mut R) {
        let n = self.config.num_nodes;
        let max_attempts = missing * ADD_ATTEMPTS_PER_EDGE;
        let mut added = 0;
        let mut attempts = 0;

        while added < missing && attempts < max_attempts {
            attempts += 1;
            let pair = rand::seq::index::sample(rng, n, 2);
            let (u, v) = (pair.index(0) as NodeId, pair.index(1) as NodeId);
            if !graph.contains_edge(u, v) {
                graph.add_edge(u, v, ());
                added += 1;
            }
        }

        if added < missing {
            warn!("Edge target not reached: added {} of {} missing channels after {} attempts", added, missing, attempts);
        }
    }

    fn remove_random_edges<R: Rng + ?Sized>(&self, graph: &mut UnGraphMap<NodeId, ()>, excess: usize, rng: &mut R) {
        let mut edges: Vec<(NodeId, NodeId)> = graph.all_edges().map(|(u, v, _)| (u, v)).collect();
        edges.shuffle(rng);
        let mut removed = 0;

        for (u, v) in edges {
            if removed >= excess {
                break;
            }
            graph.remove_edge(u, v);
            // the graph was connected before, so it stays connected iff u still reaches v
            if has_path_connecting(&*graph, u, v, None) {
                removed += 1;
            } else {
                graph.add_edge(u, v, ());
            }
        }

        if removed < excess {
            warn!("Graph is minimally connected: removed {} of {} excess channels", removed, excess);
        }
    }

    fn assign_attributes<R: Rng + ?Sized>(&self, backbone: &UnGraphMap<NodeId, ()>, rng: &mut R) -> Result<ChannelGraph, RoutingError> {
        let (cmin, cmax) = self.config.capacity_range;
        let fee_noise = Normal::<f64>::new(1.0, 1.0).map_err(|e| RoutingError::InvalidConfig(e.to_string()))?;

        let mut channel_graph = ChannelGraph::new();
        for node in backbone.nodes() {
            channel_graph.add_or_get_node(node);
        }

        for (u, v, _) in backbone.all_edges() {
            let capacity = rng.gen_range(cmin..=cmax);
            let fee = BASE_FEE * fee_noise.sample(rng).max(MIN_FEE_MULTIPLIER);
            channel_graph.add_channel(u, v, capacity, fee)?;
        }

        Ok(channel_graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(num_nodes: usize, num_channels: usize, capacity_range: (u64, u64)) -> TopologyConfig {
        TopologyConfig { num_nodes, num_channels, capacity_range, seed: 42 }
    }

    #[test]
    fn test_graph_generation() -> eyre::Result<()> {
        let channel_graph = TopologyGenerator::new(config(50, 200, (200, 900)))?.generate()?;

        assert_eq!(channel_graph.node_count(), 50);
        // the count may deviate, but only slightly
        assert!(channel_graph.channel_count().abs_diff(200) < 50);
        assert!(channel_graph.is_connected());

        Ok(())
    }

    #[test]
    fn test_graph_attributes() -> eyre::Result<()> {
        let channel_graph = TopologyGenerator::new(config(20, 50, (100, 500)))?.generate()?;

        for (_, channel) in channel_graph.channels() {
            assert!((100..=500).contains(&channel.capacity));
            assert!(channel.fee > 0.0);
            assert!(channel.fee >= BASE_FEE * MIN_FEE_MULTIPLIER);
            assert_eq!(channel.weight, channel.fee);
        }

        Ok(())
    }

    #[test]
    fn test_graph_statistics() -> eyre::Result<()> {
        let channel_graph = TopologyGenerator::new(config(30, 100, (200, 900)))?.generate()?;
        let stats = channel_graph.statistics();

        assert_eq!(stats.num_nodes, 30);
        assert_eq!(stats.num_edges, channel_graph.channel_count());
        assert!(stats.min_degree >= 1);
        assert!(stats.avg_capacity >= 200.0 && stats.avg_capacity <= 900.0);
        assert!(stats.is_connected);

        Ok(())
    }

    #[test]
    fn test_unreachable_edge_target_stops_at_complete_graph() -> eyre::Result<()> {
        // 5 nodes hold at most 10 channels
        let channel_graph = TopologyGenerator::new(config(5, 100, (200, 900)))?.generate()?;

        assert_eq!(channel_graph.node_count(), 5);
        assert_eq!(channel_graph.channel_count(), 10);
        assert!(channel_graph.is_connected());

        Ok(())
    }

    #[test]
    fn test_attachment_edges() {
        assert_eq!(config(2000, 20000, (200, 900)).attachment_edges(), 10);
        assert_eq!(config(20, 40, (100, 200)).attachment_edges(), 2);
        // never below one, never above n - 1
        assert_eq!(config(10, 5, (100, 200)).attachment_edges(), 1);
        assert_eq!(config(3, 100, (100, 200)).attachment_edges(), 2);
    }

    #[test]
    fn test_minimally_connected_graph_stops_early() -> eyre::Result<()> {
        // a tree on 10 nodes has 9 edges, so 5 is unreachable
        let channel_graph = TopologyGenerator::new(config(10, 5, (100, 200)))?.generate()?;

        assert_eq!(channel_graph.node_count(), 10);
        assert_eq!(channel_graph.channel_count(), 9);
        assert!(channel_graph.is_connected());

        Ok(())
    }

    #[test]
    fn test_same_seed_same_topology() -> eyre::Result<()> {
        let generator = TopologyGenerator::new(config(40, 120, (200, 900)))?;
        let first = generator.generate()?;
        let second = generator.generate()?;

        let first_channels: Vec<_> = first.channels().map(|(key, c)| (key, c.capacity, c.fee)).collect();
        let second_channels: Vec<_> = second.channels().map(|(key, c)| (key, c.capacity, c.fee)).collect();
        assert_eq!(first_channels, second_channels);

        Ok(())
    }

    #[test]
    fn test_injected_rng() -> eyre::Result<()> {
        let generator = TopologyGenerator::new(config(15, 30, (100, 300)))?;
        let mut rng = StdRng::seed_from_u64(7);
        let channel_graph = generator.generate_with_rng(&mut rng)?;
        assert_eq!(channel_graph.node_count(), 15);
        Ok(())
    }

    #[test]
    fn test_invalid_config() {
        assert!(TopologyGenerator::new(config(1, 10, (100, 200))).is_err());
        assert!(TopologyGenerator::new(config(10, 0, (100, 200))).is_err());
        assert!(TopologyGenerator::new(config(10, 20, (0, 200))).is_err());
        assert!(TopologyGenerator::new(config(10, 20, (300, 200))).is_err());
    }
}
