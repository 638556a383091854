use crate::topology::ChannelGraph;
use petgraph::graph::EdgeIndex;
use rand::Rng;
use rand_distr::{Distribution, Normal};

/// Floor for the multiplicative search noise, keeps weights positive
pub const MIN_WEIGHT_MULTIPLIER: f64 = 0.1;

/// Disposable per-search copy of the channel weights, indexed like the graph's edges.
/// The canonical topology is never touched.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkingWeights {
    weights: Vec<f64>,
}

impl WorkingWeights {
    /// Snapshot the current channel weights
    pub fn from_graph(channel_graph: &ChannelGraph) -> Self {
        Self { weights: channel_graph.graph().edge_weights().map(|channel| channel.weight).collect() }
    }

    pub fn get(&self, edge: EdgeIndex<usize>) -> f64 {
        self.weights[edge.index()]
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Multiply every weight by `max(0.1, 1 + N(0, std_dev))`, drawn independently per channel.
    /// A non-positive `std_dev` leaves the weights unchanged.
    pub fn perturb<R: Rng + ?Sized>(&mut self, std_dev: f64, rng: &mut R) {
        if std_dev <= 0.0 {
            return;
        }
        let Ok(noise) = Normal::new(0.0, std_dev) else {
            return;
        };
        for weight in self.weights.iter_mut() {
            *weight *= (1.0 + noise.sample(rng)).max(MIN_WEIGHT_MULTIPLIER);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_snapshot_matches_fees() -> eyre::Result<()> {
        let channel_graph = ChannelGraph::from_channels(&[(0, 1, 100, 0.5), (1, 2, 100, 0.25)])?;
        let weights = WorkingWeights::from_graph(&channel_graph);

        assert_eq!(weights.len(), 2);
        assert_eq!(weights.get(EdgeIndex::new(0)), 0.5);
        assert_eq!(weights.get(EdgeIndex::new(1)), 0.25);

        Ok(())
    }

    #[test]
    fn test_perturb_keeps_weights_positive_and_graph_untouched() -> eyre::Result<()> {
        let channel_graph = ChannelGraph::from_channels(&[(0, 1, 100, 0.5), (1, 2, 100, 0.25), (2, 0, 100, 1.0)])?;
        let mut weights = WorkingWeights::from_graph(&channel_graph);
        let mut rng = StdRng::seed_from_u64(1);

        for attempt in 1..20 {
            weights.perturb(0.3 * attempt as f64, &mut rng);
        }

        for index in 0..weights.len() {
            assert!(weights.get(EdgeIndex::new(index)) > 0.0);
        }
        let fees: Vec<f64> = channel_graph.graph().edge_weights().map(|c| c.weight).collect();
        assert_eq!(fees, vec![0.5, 0.25, 1.0]);

        Ok(())
    }

    #[test]
    fn test_zero_noise_is_identity() -> eyre::Result<()> {
        let channel_graph = ChannelGraph::from_channels(&[(0, 1, 100, 0.5)])?;
        let mut weights = WorkingWeights::from_graph(&channel_graph);
        weights.perturb(0.0, &mut StdRng::seed_from_u64(3));
        assert_eq!(weights, WorkingWeights::from_graph(&channel_graph));
        Ok(())
    }
}
