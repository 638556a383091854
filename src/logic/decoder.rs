use super::candidate_set::CandidateSet;
use super::objective::{DecisionVariables, ObjectiveBuilder, VarId};
use super::route::Route;
use super::types::{Transaction, TransactionId};
use crate::topology::{ChannelGraph, ChannelKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::time::Duration;
use tracing::debug;

/// A variable counts as selected above this value
pub const SELECTION_THRESHOLD: f64 = 0.5;

/// Hop and fee totals over the selected routes. Averages divide by the batch size.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteStatistics {
    pub num_selected_routes: usize,
    pub total_hops: usize,
    pub avg_hops: f64,
    pub total_fee: f64,
    pub avg_fee: f64,
}

/// Outcome of one optimization run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    /// Transaction id -> chosen candidate index
    pub selected_routes: BTreeMap<TransactionId, usize>,
    /// Transaction id -> chosen route
    pub route_paths: BTreeMap<TransactionId, Route>,
    pub objective_value: f64,
    pub execution_time: Duration,
    pub is_feasible: bool,
    pub statistics: RouteStatistics,
}

impl OptimizationResult {
    /// Terminal result for a failed or empty solve
    pub fn empty(execution_time: Duration) -> Self {
        Self {
            selected_routes: BTreeMap::new(),
            route_paths: BTreeMap::new(),
            objective_value: f64::INFINITY,
            execution_time,
            is_feasible: false,
            statistics: RouteStatistics::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.selected_routes.is_empty()
    }
}

impl Display for OptimizationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "OptimizationResult(feasible={}, objective={:.2}, time={:.2}s)",
            self.is_feasible,
            self.objective_value,
            self.execution_time.as_secs_f64()
        )
    }
}

/// Turns a near-binary assignment back into routes and checks them against the hard constraints
pub struct ResultDecoder<'a> {
    channel_graph: &'a ChannelGraph,
    transactions: &'a [Transaction],
    candidates: &'a CandidateSet,
    variables: &'a DecisionVariables,
}

impl<'a> ResultDecoder<'a> {
    pub fn new(
        channel_graph: &'a ChannelGraph,
        transactions: &'a [Transaction],
        candidates: &'a CandidateSet,
        variables: &'a DecisionVariables,
    ) -> Self {
        Self { channel_graph, transactions, candidates, variables }
    }

    /// Decoder over the same context the objective was built from
    pub fn from_builder(builder: &'a ObjectiveBuilder<'_>) -> Self {
        Self::new(builder.channel_graph(), builder.transactions(), builder.candidates(), builder.variables())
    }

    pub fn decode(&self, values: &BTreeMap<VarId, f64>, objective_value: f64, execution_time: Duration) -> OptimizationResult {
        let selected_routes = self.select(values);
        let route_paths: BTreeMap<TransactionId, Route> = selected_routes
            .iter()
            .filter_map(|(id, j)| self.candidates.route(*id, *j).map(|route| (*id, route.clone())))
            .collect();

        let statistics = self.statistics(&route_paths);
        let is_feasible = self.is_feasible(&route_paths);

        OptimizationResult { selected_routes, route_paths, objective_value, execution_time, is_feasible, statistics }
    }

    /// First candidate above the threshold wins, later ones are ignored
    pub fn select(&self, values: &BTreeMap<VarId, f64>) -> BTreeMap<TransactionId, usize> {
        let mut selection = BTreeMap::new();
        for tx in self.transactions {
            let mut chosen = self.variables.row(tx.id).filter(|(_, var)| values.get(var).copied().unwrap_or(0.0) > SELECTION_THRESHOLD);

            match chosen.next() {
                Some((j, _)) => {
                    if chosen.next().is_some() {
                        debug!("Transaction {} has several selected candidates, keeping #{}", tx.id, j);
                    }
                    selection.insert(tx.id, j);
                }
                None => debug!("Transaction {} left unselected", tx.id),
            }
        }
        selection
    }

    pub fn statistics(&self, route_paths: &BTreeMap<TransactionId, Route>) -> RouteStatistics {
        let total_hops: usize = route_paths.values().map(|route| route.hops()).sum();
        let total_fee: f64 = route_paths.values().map(|route| route.info(self.channel_graph).total_fee).sum();

        let batch = self.transactions.len();
        let (avg_hops, avg_fee) = if batch == 0 { (0.0, 0.0) } else { (total_hops as f64 / batch as f64, total_fee / batch as f64) };

        RouteStatistics { num_selected_routes: route_paths.len(), total_hops, avg_hops, total_fee, avg_fee }
    }

    /// Every transaction routed and no channel carrying more than its capacity
    pub fn is_feasible(&self, route_paths: &BTreeMap<TransactionId, Route>) -> bool {
        if self.transactions.iter().any(|tx| !route_paths.contains_key(&tx.id)) {
            return false;
        }

        let mut usage: BTreeMap<ChannelKey, u64> = BTreeMap::new();
        for tx in self.transactions {
            if let Some(route) = route_paths.get(&tx.id) {
                for key in route.channels() {
                    let used = usage.entry(key).or_insert(0);
                    // a load past u64::MAX exceeds any capacity
                    let Some(total) = used.checked_add(tx.amount) else {
                        return false;
                    };
                    *used = total;
                }
            }
        }

        usage.iter().all(|(key, used)| match self.channel_graph.channel(key.0, key.1) {
            Some(channel) => *used <= channel.capacity,
            None => false,
        })
    }
}
