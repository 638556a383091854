use crate::logic::types::{NodeId, TransactionId};

/// Contract violations at the API boundary. Everything else (unroutable transactions,
/// solver failures, decoding ties) is absorbed and surfaced as data.
#[derive(Debug, thiserror::Error)]
pub enum RoutingError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("invalid transaction {id}: {reason}")]
    InvalidTransaction { id: TransactionId, reason: String },
    #[error("invalid channel ({u}, {v}): {reason}")]
    InvalidChannel { u: NodeId, v: NodeId, reason: String },
    #[error("transaction batch is empty")]
    EmptyTransactionBatch,

    // Topology persistence
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[allow(clippy::enum_variant_names)]
#[derive(Debug, thiserror::Error)]
pub enum LoadConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
    #[error("Pattern error: {0}")]
    RegexError(#[from] regex::Error),
    #[error("Error loading config: {0}")]
    ConfigError(#[from] RoutingError),
}
