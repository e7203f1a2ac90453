//! Simulation configuration parameters.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Errors produced while loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// File is not valid YAML for [`SimConfig`].
    #[error("invalid config: {0}")]
    Parse(#[from] serde_yaml::Error),
    /// A value is outside its supported range.
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },
}

/// Starting values and balance knobs for a session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Seed used when a session does not supply its own.
    pub seed: String,
    /// Starting cash in USD.
    pub starting_money: Decimal,
    /// Starting compute units.
    pub starting_compute: Decimal,
    /// Starting safety research.
    pub starting_safety: Decimal,
    /// Starting capabilities research.
    pub starting_capabilities: Decimal,
    /// Starting reputation.
    pub starting_reputation: Decimal,
    /// Starting head count by employee type.
    pub starting_employees: BTreeMap<String, i64>,
    /// Compute consumed per turn.
    pub compute_rate: Decimal,
    /// Upkeep per employee per turn.
    pub staff_maintenance_cost: Decimal,
    /// Safety level at which the lab wins.
    pub victory_safety_threshold: Decimal,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: "lab-tycoon".to_string(),
            starting_money: Decimal::new(100_000, 0),
            starting_compute: Decimal::new(100, 0),
            starting_safety: Decimal::ZERO,
            starting_capabilities: Decimal::ZERO,
            starting_reputation: Decimal::new(10, 0),
            starting_employees: BTreeMap::new(),
            compute_rate: Decimal::new(5, 0),
            staff_maintenance_cost: Decimal::new(2_000, 0),
            victory_safety_threshold: Decimal::new(100, 0),
        }
    }
}

impl SimConfig {
    /// Parse a YAML document. Missing keys fall back to defaults.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let cfg: SimConfig = serde_yaml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load and validate a YAML config file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    /// Check ranges that would make the simulation meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.compute_rate.is_sign_negative() || self.staff_maintenance_cost.is_sign_negative() {
            return Err(ConfigError::Invalid {
                field: "compute_rate",
                reason: "per-turn rates must be >= 0".into(),
            });
        }
        if self.victory_safety_threshold <= Decimal::ZERO {
            return Err(ConfigError::Invalid {
                field: "victory_safety_threshold",
                reason: "must be > 0".into(),
            });
        }
        if let Some((kind, n)) = self.starting_employees.iter().find(|(_, n)| **n < 0) {
            return Err(ConfigError::Invalid {
                field: "starting_employees",
                reason: format!("{kind} has negative head count {n}"),
            });
        }
        Ok(())
    }
}
