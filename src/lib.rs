// Three-Layer Architecture
pub mod topology; // Data Layer: channel network generation and persistence
pub mod logic; // Logic Layer: candidate routes, objective, decoding
pub mod execution; // Execution Layer: solver gateway and optimization pipeline

// Common utilities and types
pub mod errors;
pub mod utils;

// Re-export key components from each layer
pub use errors::{LoadConfigError, RoutingError};
pub use execution::{
    Assignment, Credentials, ExhaustiveSolver, OptimizerConfig, RouteOptimizer, RouteOptimizerBuilder, SolverError, SolverGateway,
};
pub use logic::{
    BinaryPoly, CandidateRoutes, CandidateSet, CandidateWarning, DecisionVariables, NodeId, Objective, ObjectiveBuilder, ObjectiveTerm,
    OptimizationResult, ResultDecoder, Route, RouteFinder, RouteHash, RouteInfo, RouteStatistics, Transaction, TransactionConfig,
    TransactionGenerator, TransactionId, VarId, VariableInfo, WorkingWeights,
};
pub use topology::{Channel, ChannelGraph, ChannelKey, TopologyConfig, TopologyGenerator, TopologyStats};
pub use utils::RoutingConfig;
