//! Pipeline configuration.
//!
//! Key length, duplicate policy and the correction threshold together
//! define the enrollment protocol. Recovery must use the same values that
//! enrollment used, so they live in one file rather than ad hoc flags.

use crate::reconcile::DEFAULT_THRESHOLD_PCT;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default key length in bits.
pub const DEFAULT_KEY_LENGTH: usize = 256;

/// Enrollment settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrollmentConfig {
    /// Key length in bits.
    pub key_length: usize,
    /// Allow the same address to be drawn more than once.
    pub allow_duplicates: bool,
}

impl Default for EnrollmentConfig {
    fn default() -> Self {
        Self {
            key_length: DEFAULT_KEY_LENGTH,
            allow_duplicates: true,
        }
    }
}

/// Reconciliation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconciliationConfig {
    /// Highest error rate, in percent, that is still corrected.
    pub threshold_pct: f64,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            threshold_pct: DEFAULT_THRESHOLD_PCT,
        }
    }
}

/// Output settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Print Prometheus metrics after the run.
    pub print_metrics: bool,
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("key length must be positive")]
    InvalidKeyLength,
    #[error("threshold {0} must be a percentage in [0, 100]")]
    InvalidThreshold(f64),
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub enrollment: EnrollmentConfig,
    #[serde(default)]
    pub reconciliation: ReconciliationConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.enrollment.key_length == 0 {
            return Err(ConfigError::InvalidKeyLength);
        }
        let threshold = self.reconciliation.threshold_pct;
        if !(0.0..=100.0).contains(&threshold) {
            return Err(ConfigError::InvalidThreshold(threshold));
        }
        Ok(())
    }
}
