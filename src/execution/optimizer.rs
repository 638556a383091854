use super::solver::{Assignment, Credentials, SolverError, SolverGateway};
use crate::errors::RoutingError;
use crate::logic::candidate_set::CandidateSet;
use crate::logic::decoder::{OptimizationResult, ResultDecoder};
use crate::logic::objective::{BinaryPoly, ObjectiveBuilder};
use crate::logic::route_finder::RouteFinder;
use crate::logic::types::Transaction;
use crate::topology::ChannelGraph;
use crate::utils::config::RoutingConfig;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{error, info, warn};

/// Extra wait on top of the solver's own budget before the call is abandoned
pub const DEFAULT_TIMEOUT_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct OptimizerConfig {
    pub num_route_candidates: usize,
    pub alpha: f64,
    /// `None` derives beta from the batch
    pub beta: Option<f64>,
    pub time_limit: Duration,
    pub timeout_grace: Duration,
    pub seed: u64,
    pub parallel: bool,
    pub credentials: Option<Credentials>,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            num_route_candidates: 3,
            alpha: 2.0,
            beta: None,
            time_limit: Duration::from_secs(10),
            timeout_grace: DEFAULT_TIMEOUT_GRACE,
            seed: 42,
            parallel: false,
            credentials: None,
        }
    }
}

impl OptimizerConfig {
    pub fn validate(&self) -> Result<(), RoutingError> {
        if self.num_route_candidates == 0 {
            return Err(RoutingError::InvalidConfig("num_route_candidates must be positive".to_string()));
        }
        if self.time_limit.is_zero() {
            return Err(RoutingError::InvalidConfig("time_limit must be positive".to_string()));
        }
        if !(self.alpha.is_finite() && self.alpha >= 0.0) {
            return Err(RoutingError::InvalidConfig(format!("alpha must be non-negative, got {}", self.alpha)));
        }
        Ok(())
    }
}

impl From<&RoutingConfig> for OptimizerConfig {
    fn from(config: &RoutingConfig) -> Self {
        Self {
            num_route_candidates: config.routing.num_route_candidates,
            alpha: config.objective.alpha,
            beta: config.objective.beta,
            time_limit: config.solver.time_limit(),
            timeout_grace: DEFAULT_TIMEOUT_GRACE,
            seed: config.routing.seed,
            parallel: config.routing.parallel,
            credentials: config.solver.credentials(),
        }
    }
}

/// Runs the whole routing pipeline for a batch of payments:
/// candidate search, objective construction, one bounded solver call, decoding.
///
/// Solver trouble of any kind ends in [`OptimizationResult::empty`]; only invalid
/// input is returned as an error.
pub struct RouteOptimizer {
    channel_graph: Arc<ChannelGraph>,
    gateway: Arc<dyn SolverGateway>,
    config: OptimizerConfig,
}

impl RouteOptimizer {
    pub fn new(channel_graph: Arc<ChannelGraph>, gateway: Arc<dyn SolverGateway>, config: OptimizerConfig) -> Result<Self, RoutingError> {
        config.validate()?;
        Ok(Self { channel_graph, gateway, config })
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    pub fn channel_graph(&self) -> &ChannelGraph {
        &self.channel_graph
    }

    /// Candidate routes for `transactions` with `k` candidates each
    pub fn find_candidates(&self, transactions: &[Transaction], num_route_candidates: usize) -> Result<CandidateSet, RoutingError> {
        let route_finder =
            RouteFinder::new(&self.channel_graph, num_route_candidates, self.config.seed)?.with_parallel(self.config.parallel);
        Ok(route_finder.find_all_route_candidates(transactions))
    }

    /// Optimize with the configured weights and candidate count
    pub async fn optimize_batch(&self, transactions: &[Transaction]) -> Result<OptimizationResult, RoutingError> {
        self.optimize(transactions, self.config.alpha, self.config.beta, self.config.num_route_candidates).await
    }

    pub async fn optimize(
        &self,
        transactions: &[Transaction],
        alpha: f64,
        beta: Option<f64>,
        num_route_candidates: usize,
    ) -> Result<OptimizationResult, RoutingError> {
        if transactions.is_empty() {
            return Err(RoutingError::EmptyTransactionBatch);
        }

        let candidates = self.find_candidates(transactions, num_route_candidates)?;
        let builder = ObjectiveBuilder::new(&self.channel_graph, transactions, &candidates, alpha, beta)?;
        let objective = builder.build();

        if builder.variables().is_empty() {
            warn!("No transaction has a candidate route, nothing to solve");
            return Ok(OptimizationResult::empty(Duration::ZERO));
        }

        let start = Instant::now();
        let outcome = self.solve(&objective.total).await;
        let execution_time = start.elapsed();

        let assignment = match outcome {
            Ok(assignment) if assignment.is_empty() => {
                error!("Solver {} returned an empty assignment", self.gateway.name());
                return Ok(OptimizationResult::empty(execution_time));
            }
            Ok(assignment) => assignment,
            Err(e) => {
                error!("Solver {} failed: {}", self.gateway.name(), e);
                return Ok(OptimizationResult::empty(execution_time));
            }
        };

        let objective_value = assignment.objective_value.unwrap_or_else(|| objective.total.evaluate(|var| assignment.value(var)));
        let result = ResultDecoder::from_builder(&builder).decode(&assignment.values, objective_value, execution_time);

        info!(
            "{} - {}/{} transactions routed, {} hops, fee {:.4}",
            result,
            result.statistics.num_selected_routes,
            transactions.len(),
            result.statistics.total_hops,
            result.statistics.total_fee
        );
        Ok(result)
    }

    async fn solve(&self, objective: &BinaryPoly) -> Result<Assignment, SolverError> {
        let time_limit = self.config.time_limit;
        info!("Submitting {} terms to solver {} (time limit {:?})", objective.num_terms(), self.gateway.name(), time_limit);

        match timeout(time_limit + self.config.timeout_grace, self.gateway.solve(objective, time_limit, self.config.credentials.as_ref())).await {
            Ok(result) => result,
            Err(_) => Err(SolverError::Timeout(time_limit)),
        }
    }
}

/// Builder pattern for creating and configuring a RouteOptimizer
pub struct RouteOptimizerBuilder {
    channel_graph: Arc<ChannelGraph>,
    gateway: Arc<dyn SolverGateway>,
    config: OptimizerConfig,
}

impl RouteOptimizerBuilder {
    pub fn new(channel_graph: Arc<ChannelGraph>, gateway: Arc<dyn SolverGateway>) -> Self {
        Self { channel_graph, gateway, config: OptimizerConfig::default() }
    }

    pub fn with_config(mut self, config: OptimizerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_num_route_candidates(mut self, num_route_candidates: usize) -> Self {
        self.config.num_route_candidates = num_route_candidates;
        self
    }

    pub fn with_weights(mut self, alpha: f64, beta: Option<f64>) -> Self {
        self.config.alpha = alpha;
        self.config.beta = beta;
        self
    }

    pub fn with_time_limit(mut self, time_limit: Duration) -> Self {
        self.config.time_limit = time_limit;
        self
    }

    pub fn with_timeout_grace(mut self, timeout_grace: Duration) -> Self {
        self.config.timeout_grace = timeout_grace;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    pub fn with_parallel_search(mut self, enabled: bool) -> Self {
        self.config.parallel = enabled;
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.config.credentials = Some(credentials);
        self
    }

    pub fn build(self) -> Result<RouteOptimizer, RoutingError> {
        RouteOptimizer::new(self.channel_graph, self.gateway, self.config)
    }
}
