pub mod config;
pub mod config_loader;

pub use config::{ObjectiveSection, RoutingConfig, RoutingSection, SOLVER_TOKEN_ENV, SolverSection, TopologySection, TransactionsSection};
pub use config_loader::*;
