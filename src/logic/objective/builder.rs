use super::poly::{BinaryPoly, VarId};
use super::variables::DecisionVariables;
use crate::errors::RoutingError;
use crate::logic::candidate_set::CandidateSet;
use crate::logic::types::{Transaction, TransactionId, mean_amount};
use crate::topology::{ChannelGraph, ChannelKey};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use strum_macros::{Display, EnumIter, EnumString, VariantNames};
use tracing::{debug, info, warn};

/// Default distance weight is `mean(amount)^2` times this factor
pub const BETA_SCALE: f64 = 100.0;

#[derive(Copy, Clone, Debug, Display, PartialEq, Hash, Eq, EnumString, VariantNames, Default, Deserialize, Serialize, EnumIter)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveTerm {
    Capacity,
    Route,
    Distance,
    #[default]
    Total,
}

/// The routing objective and its named components. `total = capacity + route + distance`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Objective {
    pub total: BinaryPoly,
    pub capacity: BinaryPoly,
    pub route: BinaryPoly,
    pub distance: BinaryPoly,
}

impl Objective {
    pub fn term(&self, term: ObjectiveTerm) -> &BinaryPoly {
        match term {
            ObjectiveTerm::Capacity => &self.capacity,
            ObjectiveTerm::Route => &self.route,
            ObjectiveTerm::Distance => &self.distance,
            ObjectiveTerm::Total => &self.total,
        }
    }
}

/// Size and weights of a built problem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableInfo {
    pub num_transactions: usize,
    /// Largest candidate count over all transactions
    pub num_route_candidates: usize,
    /// `num_transactions * num_route_candidates`, the dense matrix size
    pub total_variables: usize,
    /// Variables backed by a real candidate
    pub used_variables: usize,
    pub alpha: f64,
    pub beta: f64,
}

/// Builds the routing objective over `x[i][j]` = "transaction i takes candidate j".
///
/// Three penalties are summed:
/// - capacity: `(usage(c) - capacity(c))^2` for every channel `c` some candidate crosses,
///   where `usage(c) = Σ amount_i · x[i][j]` over candidates crossing `c` in either direction
/// - route: `alpha · (Σ_j x[i][j] - 1)^2` for every routable transaction
/// - distance: `beta · hops(i, j) · x[i][j]`
///
/// The capacity penalty is two-sided: unused capacity costs as much as overflow.
pub struct ObjectiveBuilder<'a> {
    channel_graph: &'a ChannelGraph,
    transactions: &'a [Transaction],
    candidates: &'a CandidateSet,
    alpha: f64,
    beta: f64,
    variables: DecisionVariables,
}

impl<'a> ObjectiveBuilder<'a> {
    /// `beta` defaults to `mean(amount)^2 * 100` when `None`
    pub fn new(
        channel_graph: &'a ChannelGraph,
        transactions: &'a [Transaction],
        candidates: &'a CandidateSet,
        alpha: f64,
        beta: Option<f64>,
    ) -> Result<Self, RoutingError> {
        let mean = mean_amount(transactions).ok_or(RoutingError::EmptyTransactionBatch)?;

        if !(alpha.is_finite() && alpha >= 0.0) {
            return Err(RoutingError::InvalidConfig(format!("alpha must be a non-negative number, got {alpha}")));
        }
        let beta = beta.unwrap_or(mean * mean * BETA_SCALE);
        if !(beta.is_finite() && beta >= 0.0) {
            return Err(RoutingError::InvalidConfig(format!("beta must be a non-negative number, got {beta}")));
        }

        let mut seen = HashSet::new();
        for tx in transactions {
            if !seen.insert(tx.id) {
                return Err(RoutingError::InvalidTransaction { id: tx.id, reason: "duplicate transaction id".to_string() });
            }
        }

        let mut variables = DecisionVariables::new();
        for tx in transactions {
            for j in 0..candidates.routes(tx.id).len() {
                variables.get_or_create(tx.id, j);
            }
        }

        Ok(Self { channel_graph, transactions, candidates, alpha, beta, variables })
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    pub fn variables(&self) -> &DecisionVariables {
        &self.variables
    }

    pub fn channel_graph(&self) -> &'a ChannelGraph {
        self.channel_graph
    }

    pub fn transactions(&self) -> &'a [Transaction] {
        self.transactions
    }

    pub fn candidates(&self) -> &'a CandidateSet {
        self.candidates
    }

    /// Build all components from scratch. Same inputs give the same polynomial.
    pub fn build(&self) -> Objective {
        let capacity = self.capacity_term();
        let route = self.route_term();
        let distance = self.distance_term();

        let mut total = capacity.clone();
        total += &route;
        total += &distance;

        let info = self.variable_info();
        info!(
            "Objective built: {} transactions, {}/{} variables used, {} terms, alpha={}, beta={:.2}",
            info.num_transactions,
            info.used_variables,
            info.total_variables,
            total.num_terms(),
            info.alpha,
            info.beta
        );

        Objective { total, capacity, route, distance }
    }

    pub fn variable_info(&self) -> VariableInfo {
        let num_route_candidates = self.transactions.iter().map(|tx| self.candidates.routes(tx.id).len()).max().unwrap_or(0);
        VariableInfo {
            num_transactions: self.transactions.len(),
            num_route_candidates,
            total_variables: self.transactions.len() * num_route_candidates,
            used_variables: self.variables.len(),
            alpha: self.alpha,
            beta: self.beta,
        }
    }

    /// Sum of `(usage - capacity)^2` over channels crossed by at least one candidate
    pub fn capacity_term(&self) -> BinaryPoly {
        let mut usage: BTreeMap<ChannelKey, BinaryPoly> = BTreeMap::new();
        for tx in self.transactions {
            for (j, var) in self.variables.row(tx.id) {
                let Some(route) = self.candidates.route(tx.id, j) else {
                    continue;
                };
                for key in route.channels() {
                    usage.entry(key).or_default().add_term(vec![var], tx.amount as f64);
                }
            }
        }

        let mut term = BinaryPoly::zero();
        for (key, channel_usage) in usage {
            let Some(channel) = self.channel_graph.channel(key.0, key.1) else {
                warn!("Channel {} used by a candidate is not in the topology, skipped", key);
                continue;
            };
            term += (channel_usage - channel.capacity as f64).square();
        }
        debug!("Capacity term: {} terms", term.num_terms());
        term
    }

    /// `alpha * (Σ_j x[i][j] - 1)^2` per routable transaction
    pub fn route_term(&self) -> BinaryPoly {
        let mut term = BinaryPoly::zero();
        for tx in self.transactions {
            let selected = self.selection_sum(tx.id);
            if selected.is_zero() {
                continue;
            }
            term += (selected - 1.0).square().scale(self.alpha);
        }
        term
    }

    /// `beta * hops * x[i][j]` per candidate
    pub fn distance_term(&self) -> BinaryPoly {
        let mut term = BinaryPoly::zero();
        for tx in self.transactions {
            for (j, var) in self.variables.row(tx.id) {
                if let Some(route) = self.candidates.route(tx.id, j) {
                    term.add_term(vec![var], self.beta * route.hops() as f64);
                }
            }
        }
        term
    }

    fn selection_sum(&self, id: TransactionId) -> BinaryPoly {
        let mut sum = BinaryPoly::zero();
        for (_, var) in self.variables.row(id) {
            sum += BinaryPoly::from(var);
        }
        sum
    }

    /// Variable for candidate `j` of transaction `id`, if that candidate exists
    pub fn variable(&self, id: TransactionId, j: usize) -> Option<VarId> {
        self.variables.get(id, j)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::candidate_set::CandidateRoutes;
    use crate::logic::route::Route;
    use std::str::FromStr;

    fn bottleneck() -> eyre::Result<(ChannelGraph, Vec<Transaction>, CandidateSet)> {
        // 0 - 1 - 2 with a detour 0 - 3 - 2
        let channel_graph = ChannelGraph::from_channels(&[(0, 1, 500, 1.0), (1, 2, 500, 1.0), (0, 3, 400, 1.0), (3, 2, 400, 1.0)])?;
        let transactions = vec![Transaction::new(0, 0, 2, 300)?, Transaction::new(1, 0, 2, 100)?];

        let mut candidates = CandidateSet::new();
        candidates.insert(0, vec![Route::new(vec![0, 1, 2]), Route::new(vec![0, 3, 2])].into_iter().collect());
        candidates.insert(1, vec![Route::new(vec![0, 1, 2])].into_iter().collect());
        Ok((channel_graph, transactions, candidates))
    }

    #[test]
    fn test_default_beta() -> eyre::Result<()> {
        let (channel_graph, transactions, candidates) = bottleneck()?;
        let builder = ObjectiveBuilder::new(&channel_graph, &transactions, &candidates, 2.0, None)?;

        // mean amount is 200
        assert_eq!(builder.beta(), 200.0 * 200.0 * 100.0);
        assert_eq!(ObjectiveBuilder::new(&channel_graph, &transactions, &candidates, 2.0, Some(5.0))?.beta(), 5.0);
        Ok(())
    }

    #[test]
    fn test_variable_info() -> eyre::Result<()> {
        let (channel_graph, transactions, candidates) = bottleneck()?;
        let builder = ObjectiveBuilder::new(&channel_graph, &transactions, &candidates, 2.0, Some(1.0))?;

        let info = builder.variable_info();
        assert_eq!(info.num_transactions, 2);
        assert_eq!(info.num_route_candidates, 2);
        assert_eq!(info.total_variables, 4);
        assert_eq!(info.used_variables, 3);
        assert!(builder.variable(1, 1).is_none());
        Ok(())
    }

    #[test]
    fn test_route_term_penalizes_wrong_count() -> eyre::Result<()> {
        let (channel_graph, transactions, candidates) = bottleneck()?;
        let builder = ObjectiveBuilder::new(&channel_graph, &transactions, &candidates, 2.0, Some(1.0))?;
        let route = builder.route_term();

        let none = route.evaluate(|_| 0.0);
        let all = route.evaluate(|_| 1.0);
        let one_each = route.evaluate(|var| if var == VarId(1) { 0.0 } else { 1.0 });

        // two transactions with nothing selected, each (0 - 1)^2
        assert_eq!(none, 4.0);
        // transaction 0 picks both: (2 - 1)^2
        assert_eq!(all, 2.0);
        assert_eq!(one_each, 0.0);
        Ok(())
    }

    #[test]
    fn test_distance_term_counts_hops() -> eyre::Result<()> {
        let (channel_graph, transactions, candidates) = bottleneck()?;
        let builder = ObjectiveBuilder::new(&channel_graph, &transactions, &candidates, 2.0, Some(10.0))?;
        let distance = builder.distance_term();

        for (_, _, var) in builder.variables().iter() {
            assert_eq!(distance.coefficient(&[var]), 20.0);
        }
        Ok(())
    }

    #[test]
    fn test_capacity_term_is_two_sided() -> eyre::Result<()> {
        let (channel_graph, transactions, candidates) = bottleneck()?;
        let builder = ObjectiveBuilder::new(&channel_graph, &transactions, &candidates, 2.0, Some(1.0))?;
        let capacity = builder.capacity_term();

        // nothing selected: every used channel is empty, 2 * 500^2 + 2 * 400^2
        assert_eq!(capacity.evaluate(|_| 0.0), 2.0 * 250_000.0 + 2.0 * 160_000.0);

        // both on 0-1-2: usage 400 of 500, detour idle
        let shared = capacity.evaluate(|var| if var == VarId(1) { 0.0 } else { 1.0 });
        assert_eq!(shared, 2.0 * 10_000.0 + 2.0 * 160_000.0);
        Ok(())
    }

    #[test]
    fn test_unroutable_transaction_has_no_terms() -> eyre::Result<()> {
        let (channel_graph, mut transactions, mut candidates) = bottleneck()?;
        transactions.push(Transaction::new(2, 1, 3, 50)?);
        candidates.insert(2, CandidateRoutes::new());

        let builder = ObjectiveBuilder::new(&channel_graph, &transactions, &candidates, 2.0, Some(1.0))?;
        let objective = builder.build();

        assert_eq!(builder.variables().row(2).count(), 0);
        assert_eq!(objective.route.evaluate(|_| 0.0), 4.0);
        Ok(())
    }

    #[test]
    fn test_build_is_idempotent_and_sums_components() -> eyre::Result<()> {
        let (channel_graph, transactions, candidates) = bottleneck()?;
        let builder = ObjectiveBuilder::new(&channel_graph, &transactions, &candidates, 2.0, None)?;

        let first = builder.build();
        let second = builder.build();
        assert_eq!(first, second);

        let assignment = |var: VarId| if var == VarId(0) { 1.0 } else { 0.0 };
        let parts: f64 = [ObjectiveTerm::Capacity, ObjectiveTerm::Route, ObjectiveTerm::Distance]
            .iter()
            .map(|term| first.term(*term).evaluate(assignment))
            .sum();
        assert!((first.total.evaluate(assignment) - parts).abs() < 1e-6);
        assert_eq!(first.total.degree(), 2);
        Ok(())
    }

    #[test]
    fn test_invalid_inputs() -> eyre::Result<()> {
        let (channel_graph, transactions, candidates) = bottleneck()?;

        assert!(matches!(
            ObjectiveBuilder::new(&channel_graph, &[], &candidates, 2.0, None),
            Err(RoutingError::EmptyTransactionBatch)
        ));
        assert!(ObjectiveBuilder::new(&channel_graph, &transactions, &candidates, -1.0, None).is_err());
        assert!(ObjectiveBuilder::new(&channel_graph, &transactions, &candidates, 2.0, Some(f64::NAN)).is_err());

        let duplicated = vec![transactions[0], transactions[0]];
        assert!(ObjectiveBuilder::new(&channel_graph, &duplicated, &candidates, 2.0, None).is_err());
        Ok(())
    }

    #[test]
    fn test_term_names() -> eyre::Result<()> {
        assert_eq!(ObjectiveTerm::Capacity.to_string(), "capacity");
        assert_eq!(ObjectiveTerm::from_str("distance")?, ObjectiveTerm::Distance);
        Ok(())
    }
}
