use super::solver::{Assignment, Credentials, SolverError, SolverGateway};
use crate::logic::objective::{BinaryPoly, VarId};
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tracing::debug;

pub const DEFAULT_MAX_VARIABLES: usize = 20;

/// Assignments checked between two deadline checks
const DEADLINE_CHECK_INTERVAL: u64 = 1 << 12;

/// In-process gateway that tries every assignment and returns the minimiser.
///
/// Exact but exponential, so it refuses problems with more than `max_variables`
/// variables. Ties go to the assignment with the smallest bit pattern.
#[derive(Debug, Clone)]
pub struct ExhaustiveSolver {
    max_variables: usize,
}

impl Default for ExhaustiveSolver {
    fn default() -> Self {
        Self { max_variables: DEFAULT_MAX_VARIABLES }
    }
}

impl ExhaustiveSolver {
    pub fn new(max_variables: usize) -> Self {
        // bit patterns live in a u64
        Self { max_variables: max_variables.min(63) }
    }

    pub fn max_variables(&self) -> usize {
        self.max_variables
    }
}

/// Polynomial flattened to `(variable mask, coefficient)` pairs
struct MaskedTerms {
    variables: Vec<VarId>,
    terms: Vec<(u64, f64)>,
}

impl MaskedTerms {
    fn new(objective: &BinaryPoly) -> Self {
        let variables: Vec<VarId> = objective.variables().into_iter().collect();
        let terms = objective
            .terms()
            .map(|(vars, coefficient)| {
                let mask = vars
                    .iter()
                    .filter_map(|var| variables.binary_search(var).ok())
                    .fold(0u64, |mask, bit| mask | (1 << bit));
                (mask, coefficient)
            })
            .collect();
        Self { variables, terms }
    }

    fn evaluate(&self, bits: u64) -> f64 {
        self.terms.iter().filter(|(mask, _)| bits & mask == *mask).map(|(_, c)| c).sum()
    }

    fn minimise(&self, deadline: Instant, time_limit: Duration) -> Result<(u64, f64), SolverError> {
        let mut best = (0u64, self.evaluate(0));
        for bits in 1..(1u64 << self.variables.len()) {
            if bits % DEADLINE_CHECK_INTERVAL == 0 && Instant::now() >= deadline {
                return Err(SolverError::Timeout(time_limit));
            }
            let value = self.evaluate(bits);
            if value < best.1 {
                best = (bits, value);
            }
        }
        Ok(best)
    }

    fn assignment(&self, bits: u64, value: f64) -> Assignment {
        self.variables
            .iter()
            .enumerate()
            .map(|(bit, var)| (*var, ((bits >> bit) & 1) as f64))
            .collect::<Assignment>()
            .with_objective_value(value)
    }
}

#[async_trait]
impl SolverGateway for ExhaustiveSolver {
    fn name(&self) -> &str {
        "exhaustive"
    }

    async fn solve(&self, objective: &BinaryPoly, time_limit: Duration, _credentials: Option<&Credentials>) -> Result<Assignment, SolverError> {
        let count = objective.variables().len();
        if count > self.max_variables {
            return Err(SolverError::TooManyVariables { count, limit: self.max_variables });
        }
        if count == 0 {
            return Ok(Assignment::default());
        }

        let terms = MaskedTerms::new(objective);
        let deadline = Instant::now() + time_limit;
        debug!("Enumerating 2^{} assignments over {} terms", count, terms.terms.len());

        tokio::task::spawn_blocking(move || {
            let (bits, value) = terms.minimise(deadline, time_limit)?;
            Ok(terms.assignment(bits, value))
        })
        .await
        .map_err(|e| SolverError::Other(format!("enumeration task failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const X: VarId = VarId(0);
    const Y: VarId = VarId(1);
    const Z: VarId = VarId(2);

    #[tokio::test]
    async fn test_finds_minimum() -> eyre::Result<()> {
        // (x + y + z - 1)^2 + 0.5 y: exactly one variable, and not y
        let sum = BinaryPoly::variable(X) + BinaryPoly::variable(Y) + BinaryPoly::variable(Z) - 1.0;
        let mut objective = sum.square();
        objective += &BinaryPoly::variable(Y).scale(0.5);
        objective += &BinaryPoly::variable(X).scale(0.25);

        let assignment = ExhaustiveSolver::default().solve(&objective, Duration::from_secs(5), None).await?;

        assert_eq!(assignment.value(X), 0.0);
        assert_eq!(assignment.value(Y), 0.0);
        assert_eq!(assignment.value(Z), 1.0);
        assert_eq!(assignment.objective_value, Some(0.0));
        Ok(())
    }

    #[tokio::test]
    async fn test_ties_prefer_lowest_pattern() -> eyre::Result<()> {
        let objective = (BinaryPoly::variable(X) + BinaryPoly::variable(Y) - 1.0).square();

        let assignment = ExhaustiveSolver::default().solve(&objective, Duration::from_secs(5), None).await?;

        assert_eq!(assignment.value(X), 1.0);
        assert_eq!(assignment.value(Y), 0.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_sparse_variable_ids() -> eyre::Result<()> {
        let objective = &BinaryPoly::variable(VarId(7)) * -2.0;

        let assignment = ExhaustiveSolver::default().solve(&objective, Duration::from_secs(5), None).await?;

        assert_eq!(assignment.len(), 1);
        assert_eq!(assignment.value(VarId(7)), 1.0);
        assert_eq!(assignment.objective_value, Some(-2.0));
        Ok(())
    }

    #[tokio::test]
    async fn test_refuses_large_problems() {
        let mut objective = BinaryPoly::zero();
        for i in 0..5 {
            objective += BinaryPoly::variable(VarId(i));
        }

        let result = ExhaustiveSolver::new(4).solve(&objective, Duration::from_secs(1), None).await;

        assert_eq!(result, Err(SolverError::TooManyVariables { count: 5, limit: 4 }));
    }

    #[tokio::test]
    async fn test_constant_objective_gives_empty_assignment() -> eyre::Result<()> {
        let assignment = ExhaustiveSolver::default().solve(&BinaryPoly::constant(3.0), Duration::from_secs(1), None).await?;
        assert!(assignment.is_empty());
        Ok(())
    }
}
