use super::config_loader::{ConfigLoader, ConfigLoaderSync, load_from_file, load_from_file_sync};
use crate::errors::{LoadConfigError, RoutingError};
use crate::execution::solver::Credentials;
use crate::logic::transactions::TransactionConfig;
use crate::topology::TopologyConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable that supplies the solver token when the file leaves it empty
pub const SOLVER_TOKEN_ENV: &str = "SOLVER_TOKEN";

/// Full run configuration, one TOML section per stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    pub topology: TopologySection,
    pub transactions: TransactionsSection,
    pub routing: RoutingSection,
    pub objective: ObjectiveSection,
    pub solver: SolverSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologySection {
    pub num_nodes: usize,
    pub num_channels: usize,
    pub capacity_min: u64,
    pub capacity_max: u64,
    pub seed: u64,
}

impl Default for TopologySection {
    fn default() -> Self {
        Self { num_nodes: 2000, num_channels: 20000, capacity_min: 200, capacity_max: 900, seed: 42 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionsSection {
    pub count: usize,
    pub amount_min: u64,
    pub amount_max: u64,
    pub seed: u64,
}

impl Default for TransactionsSection {
    fn default() -> Self {
        Self { count: 4, amount_min: 200, amount_max: 600, seed: 42 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingSection {
    /// Candidates per transaction (`k`)
    pub num_route_candidates: usize,
    pub seed: u64,
    /// Search transactions on the rayon pool
    pub parallel: bool,
}

impl Default for RoutingSection {
    fn default() -> Self {
        Self { num_route_candidates: 3, seed: 42, parallel: false }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectiveSection {
    pub alpha: f64,
    /// Derived from the batch when absent
    pub beta: Option<f64>,
}

impl Default for ObjectiveSection {
    fn default() -> Self {
        Self { alpha: 2.0, beta: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSection {
    pub time_limit_ms: u64,
    pub token: Option<String>,
    pub max_variables: Option<usize>,
}

impl Default for SolverSection {
    fn default() -> Self {
        Self { time_limit_ms: 10_000, token: None, max_variables: None }
    }
}

impl SolverSection {
    pub fn time_limit(&self) -> Duration {
        Duration::from_millis(self.time_limit_ms)
    }

    pub fn credentials(&self) -> Option<Credentials> {
        self.token.as_deref().filter(|token| !token.is_empty()).map(Credentials::new)
    }
}

impl RoutingConfig {
    /// Load, expand `${VAR}` placeholders, apply env overrides and validate
    pub fn load(file_name: String) -> Result<Self, LoadConfigError> {
        let mut config: RoutingConfig = load_from_file_sync(file_name)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus env overrides
    pub fn from_env() -> Result<Self, RoutingError> {
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        if self.solver.token.as_deref().is_none_or(str::is_empty) {
            if let Ok(token) = std::env::var(SOLVER_TOKEN_ENV) {
                self.solver.token = Some(token);
            }
        }
    }

    pub fn validate(&self) -> Result<(), RoutingError> {
        self.topology_config().validate()?;
        self.transaction_config().validate()?;
        if self.routing.num_route_candidates == 0 {
            return Err(RoutingError::InvalidConfig("num_route_candidates must be positive".to_string()));
        }
        if !(self.objective.alpha.is_finite() && self.objective.alpha >= 0.0) {
            return Err(RoutingError::InvalidConfig(format!("alpha must be non-negative, got {}", self.objective.alpha)));
        }
        if let Some(beta) = self.objective.beta {
            if !(beta.is_finite() && beta >= 0.0) {
                return Err(RoutingError::InvalidConfig(format!("beta must be non-negative, got {beta}")));
            }
        }
        if self.solver.time_limit_ms == 0 {
            return Err(RoutingError::InvalidConfig("time_limit_ms must be positive".to_string()));
        }
        Ok(())
    }

    pub fn topology_config(&self) -> TopologyConfig {
        TopologyConfig {
            num_nodes: self.topology.num_nodes,
            num_channels: self.topology.num_channels,
            capacity_range: (self.topology.capacity_min, self.topology.capacity_max),
            seed: self.topology.seed,
        }
    }

    pub fn transaction_config(&self) -> TransactionConfig {
        TransactionConfig {
            count: self.transactions.count,
            amount_range: (self.transactions.amount_min, self.transactions.amount_max),
            seed: self.transactions.seed,
        }
    }
}

#[async_trait]
impl ConfigLoader for RoutingConfig {
    type SectionType = RoutingConfig;

    async fn load_section_from_file(file_name: String) -> Result<Self::SectionType, LoadConfigError> {
        let mut config: RoutingConfig = load_from_file(file_name).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }
}

impl ConfigLoaderSync for RoutingConfig {
    type SectionType = RoutingConfig;

    fn load_section_from_file_sync(file_name: String) -> Result<Self::SectionType, LoadConfigError> {
        RoutingConfig::load(file_name)
    }
}
