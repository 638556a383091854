/// Execution Layer
///
/// This layer is responsible for:
/// - The solver gateway boundary (assignments, credentials, failures)
/// - An exact in-process solver for small problems
/// - Running the routing pipeline end to end under a time budget
///
/// Failures past the gateway are absorbed here and come back as empty results.

pub mod exhaustive;
pub mod optimizer;
pub mod solver;


// Re-export key components from the execution layer
pub use exhaustive::{DEFAULT_MAX_VARIABLES, ExhaustiveSolver};
pub use optimizer::{DEFAULT_TIMEOUT_GRACE, OptimizerConfig, RouteOptimizer, RouteOptimizerBuilder};
pub use solver::{Assignment, Credentials, SolverError, SolverGateway};
