use crate::logic::objective::{BinaryPoly, VarId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::time::Duration;

/// Failure reported by a solver gateway. Never escapes the optimizer pipeline.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SolverError {
    #[error("network error: {0}")]
    Network(String),
    #[error("authentication failed: {0}")]
    Authentication(String),
    #[error("solver found no feasible solution")]
    NoFeasibleSolution,
    #[error("solver did not answer within {0:?}")]
    Timeout(Duration),
    #[error("problem has {count} variables, solver accepts at most {limit}")]
    TooManyVariables { count: usize, limit: usize },
    #[error("solver error: {0}")]
    Other(String),
}

/// Access token for a remote solver. The token never shows up in `Debug` output.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    token: String,
}

impl Credentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials").field("token", &"***").finish()
    }
}

/// Near-binary value per decision variable, as returned by a solver
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub values: BTreeMap<VarId, f64>,
    /// Objective value as reported by the solver, if it reports one
    pub objective_value: Option<f64>,
}

impl Assignment {
    pub fn new(values: BTreeMap<VarId, f64>) -> Self {
        Self { values, objective_value: None }
    }

    pub fn with_objective_value(mut self, objective_value: f64) -> Self {
        self.objective_value = Some(objective_value);
        self
    }

    /// Value of `var`, 0 when the solver left it out
    pub fn value(&self, var: VarId) -> f64 {
        self.values.get(&var).copied().unwrap_or(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }
}

impl FromIterator<(VarId, f64)> for Assignment {
    fn from_iter<T: IntoIterator<Item = (VarId, f64)>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Minimizes a binary polynomial within a time budget.
///
/// Implementations must give up and return [`SolverError::Timeout`] rather than block
/// past `time_limit`; the optimizer also enforces the budget from the outside.
#[async_trait]
pub trait SolverGateway: Send + Sync {
    fn name(&self) -> &str;

    async fn solve(&self, objective: &BinaryPoly, time_limit: Duration, credentials: Option<&Credentials>) -> Result<Assignment, SolverError>;
}
