pub mod builder;
pub mod poly;
pub mod variables;

pub use builder::{BETA_SCALE, Objective, ObjectiveBuilder, ObjectiveTerm, VariableInfo};
pub use poly::{BinaryPoly, PolyTerm, VarId};
pub use variables::DecisionVariables;
