use super::types::{NodeId, Transaction};
use crate::errors::RoutingError;
use crate::topology::ChannelGraph;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Parameters of a random payment batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionConfig {
    pub count: usize,
    /// Inclusive amount range `(min, max)`
    pub amount_range: (u64, u64),
    pub seed: u64,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self { count: 4, amount_range: (200, 600), seed: 42 }
    }
}

impl TransactionConfig {
    pub fn validate(&self) -> Result<(), RoutingError> {
        if self.count == 0 {
            return Err(RoutingError::InvalidConfig("transaction count must be positive".to_string()));
        }
        let (min, max) = self.amount_range;
        if min == 0 || min > max {
            return Err(RoutingError::InvalidConfig(format!("amount range ({min}, {max}) must satisfy 0 < min <= max")));
        }
        Ok(())
    }
}

/// Draws payments between distinct random nodes of a topology
pub struct TransactionGenerator {
    config: TransactionConfig,
}

impl TransactionGenerator {
    pub fn new(config: TransactionConfig) -> Result<Self, RoutingError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn generate(&self, channel_graph: &ChannelGraph) -> Result<Vec<Transaction>, RoutingError> {
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        self.generate_with_rng(channel_graph, &mut rng)
    }

    /// Ids run `0..count`, source and target are distinct nodes picked uniformly
    pub fn generate_with_rng<R: Rng + ?Sized>(&self, channel_graph: &ChannelGraph, rng: &mut R) -> Result<Vec<Transaction>, RoutingError> {
        let nodes: Vec<NodeId> = channel_graph.nodes().collect();
        if nodes.len() < 2 {
            return Err(RoutingError::InvalidConfig(format!("need at least 2 nodes to draw payments, topology has {}", nodes.len())));
        }

        let (min, max) = self.config.amount_range;
        (0..self.config.count)
            .map(|id| {
                let pair = rand::seq::index::sample(rng, nodes.len(), 2);
                let amount = rng.gen_range(min..=max);
                Transaction::new(id, nodes[pair.index(0)], nodes[pair.index(1)], amount)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{TopologyConfig, TopologyGenerator};

    #[test]
    fn test_generate_transactions() -> eyre::Result<()> {
        let config = TopologyConfig { num_nodes: 50, num_channels: 200, capacity_range: (200, 900), seed: 42 };
        let channel_graph = TopologyGenerator::new(config)?.generate()?;

        let transactions = TransactionGenerator::new(TransactionConfig { count: 5, ..Default::default() })?.generate(&channel_graph)?;

        assert_eq!(transactions.len(), 5);
        for (i, tx) in transactions.iter().enumerate() {
            assert_eq!(tx.id, i);
            assert_ne!(tx.source, tx.target);
            assert!((200..=600).contains(&tx.amount));
            assert!(channel_graph.contains_node(tx.source));
            assert!(channel_graph.contains_node(tx.target));
        }

        Ok(())
    }

    #[test]
    fn test_same_seed_same_batch() -> eyre::Result<()> {
        let channel_graph = ChannelGraph::from_channels(&[(0, 1, 100, 1.0), (1, 2, 100, 1.0), (2, 3, 100, 1.0)])?;
        let generator = TransactionGenerator::new(TransactionConfig::default())?;
        assert_eq!(generator.generate(&channel_graph)?, generator.generate(&channel_graph)?);
        Ok(())
    }

    #[test]
    fn test_invalid_batch_config() {
        assert!(TransactionGenerator::new(TransactionConfig { count: 0, ..Default::default() }).is_err());
        assert!(TransactionGenerator::new(TransactionConfig { amount_range: (0, 10), ..Default::default() }).is_err());
        assert!(TransactionGenerator::new(TransactionConfig { amount_range: (10, 5), ..Default::default() }).is_err());
    }
}
