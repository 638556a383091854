/// Logic Layer - Routing Model
///
/// This layer is responsible for:
/// - Transactions and candidate route search over the channel topology
/// - Building the binary routing objective from the candidates
/// - Decoding solver assignments and checking hard feasibility
///
/// The objective is rebuilt from scratch for every batch; nothing here mutates the topology.

pub mod candidate_set;
pub mod decoder;
pub mod objective;
pub mod route;
pub mod route_finder;
pub mod transactions;
pub mod types;
pub mod working_weights;

// Re-export key components from the logic layer
pub use candidate_set::{CandidateRoutes, CandidateSet, CandidateWarning};
pub use decoder::{OptimizationResult, ResultDecoder, RouteStatistics, SELECTION_THRESHOLD};
pub use objective::{BinaryPoly, DecisionVariables, Objective, ObjectiveBuilder, ObjectiveTerm, PolyTerm, VarId, VariableInfo};
pub use route::{Route, RouteHash, RouteInfo, generate_route_hash};
pub use route_finder::{NOISE_STEP, RouteFinder};
pub use transactions::{TransactionConfig, TransactionGenerator};
pub use types::{NodeId, Transaction, TransactionId, mean_amount};
pub use working_weights::{MIN_WEIGHT_MULTIPLIER, WorkingWeights};
