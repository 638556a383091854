use super::candidate_set::{CandidateRoutes, CandidateSet, CandidateWarning};
use super::route::{Route, RouteInfo};
use super::types::Transaction;
use super::working_weights::WorkingWeights;
use crate::errors::RoutingError;
use crate::topology::ChannelGraph;
use petgraph::algo::astar;
use petgraph::visit::EdgeRef;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::{debug, info, warn};

/// Standard deviation of the weight noise grows by this much per attempt
pub const NOISE_STEP: f64 = 0.3;

/// Collects up to `k` diverse simple routes per transaction.
///
/// Candidate 0 is the cheapest route by fee. Every further attempt multiplies the
/// transaction's private working weights by Gaussian noise whose spread grows with the
/// attempt index and searches again; repeats are dropped.
///
/// Each transaction draws from its own generator derived from `(seed, transaction id)`,
/// so sequential and parallel batch search return identical candidate sets.
pub struct RouteFinder<'a> {
    channel_graph: &'a ChannelGraph,
    num_route_candidates: usize,
    seed: u64,
    parallel: bool,
}

impl<'a> RouteFinder<'a> {
    pub fn new(channel_graph: &'a ChannelGraph, num_route_candidates: usize, seed: u64) -> Result<Self, RoutingError> {
        if num_route_candidates == 0 {
            return Err(RoutingError::InvalidConfig("num_route_candidates must be positive".to_string()));
        }
        Ok(Self { channel_graph, num_route_candidates, seed, parallel: false })
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn num_route_candidates(&self) -> usize {
        self.num_route_candidates
    }

    /// Candidates for one transaction using its derived generator
    pub fn find_route_candidates(&self, transaction: &Transaction) -> CandidateRoutes {
        let mut rng = self.transaction_rng(transaction);
        self.find_route_candidates_with_rng(transaction, &mut rng)
    }

    /// Candidates for one transaction drawing noise from `rng`. An empty result means unroutable.
    pub fn find_route_candidates_with_rng<R: Rng + ?Sized>(&self, transaction: &Transaction, rng: &mut R) -> CandidateRoutes {
        let mut routes = CandidateRoutes::new();
        let mut weights = WorkingWeights::from_graph(self.channel_graph);

        for attempt in 0..self.num_route_candidates {
            if attempt > 0 {
                weights.perturb(NOISE_STEP * attempt as f64, rng);
            }

            let Some(route) = self.shortest_route(transaction, &weights) else {
                debug!("No path for transaction {} on attempt {}", transaction.id, attempt);
                continue;
            };

            if route.nodes.len() > 1 && routes.insert(route) {
                debug!("Transaction {} attempt {}: new candidate #{}", transaction.id, attempt, routes.len() - 1);
            }

            if routes.len() >= self.num_route_candidates {
                break;
            }
        }

        if routes.is_empty() {
            warn!("No route found for {}", transaction);
        }
        routes
    }

    /// Candidates for a whole batch, in transaction order
    pub fn find_all_route_candidates(&self, transactions: &[Transaction]) -> CandidateSet {
        let found: Vec<CandidateRoutes> = if self.parallel {
            transactions.par_iter().map(|tx| self.find_route_candidates(tx)).collect()
        } else {
            transactions.iter().map(|tx| self.find_route_candidates(tx)).collect()
        };

        let mut candidate_set = CandidateSet::new();
        for (tx, routes) in transactions.iter().zip(found) {
            if routes.is_empty() {
                candidate_set.warnings.push(CandidateWarning::Unroutable(tx.id));
            } else if routes.len() < self.num_route_candidates {
                candidate_set.warnings.push(CandidateWarning::Shortfall {
                    id: tx.id,
                    found: routes.len(),
                    requested: self.num_route_candidates,
                });
            }
            candidate_set.insert(tx.id, routes);
        }

        info!(
            "Candidate search done: {} transactions, {} routes, {} warnings",
            transactions.len(),
            candidate_set.total_routes(),
            candidate_set.warnings.len()
        );
        candidate_set
    }

    /// Hop count, fee and capacities of `route` in the base topology
    pub fn route_info(&self, route: &Route) -> RouteInfo {
        route.info(self.channel_graph)
    }

    /// Dijkstra over the working weights (A* with a zero heuristic)
    fn shortest_route(&self, transaction: &Transaction, weights: &WorkingWeights) -> Option<Route> {
        let start = self.channel_graph.index_of(transaction.source)?;
        let goal = self.channel_graph.index_of(transaction.target)?;

        let (_, path) = astar(self.channel_graph.graph(), start, |node| node == goal, |edge| weights.get(edge.id()), |_| 0.0)?;

        let nodes = path.into_iter().map(|idx| self.channel_graph.node_id(idx)).collect::<Option<Vec<_>>>()?;
        Some(Route::new(nodes))
    }

    fn transaction_rng(&self, transaction: &Transaction) -> StdRng {
        let stream = (transaction.id as u64).wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15);
        StdRng::seed_from_u64(self.seed ^ stream)
    }
}
