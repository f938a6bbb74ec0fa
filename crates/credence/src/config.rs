//! Pipeline configuration, read from a JSON file.

use credence_data::SourceKind;
use credence_model::EstimatorConfig;
use credence_panel::{BuilderConfig, ValidationConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors reading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read config {}: {source}", .path.display())]
    Io {
        /// Config file path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// The file is not a valid configuration.
    #[error("invalid config {}: {source}", .path.display())]
    Parse {
        /// Config file path
        path: PathBuf,
        /// Underlying error
        source: serde_json::Error,
    },

    /// Values parsed but do not make sense together.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Paths of the three source tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcePaths {
    /// Macro anchor table (default: `data/business_cycle.csv`)
    pub business_cycle: PathBuf,
    /// Capital adequacy table (default: `data/balance_sheet.csv`)
    pub balance_sheet: PathBuf,
    /// Leverage table (default: `data/leverage.csv`)
    pub leverage: PathBuf,
}

impl Default for SourcePaths {
    fn default() -> Self {
        Self {
            business_cycle: PathBuf::from("data/business_cycle.csv"),
            balance_sheet: PathBuf::from("data/balance_sheet.csv"),
            leverage: PathBuf::from("data/leverage.csv"),
        }
    }
}

impl SourcePaths {
    /// Path of one source table.
    pub fn get(&self, kind: SourceKind) -> &Path {
        match kind {
            SourceKind::Macro => &self.business_cycle,
            SourceKind::Capital => &self.balance_sheet,
            SourceKind::Leverage => &self.leverage,
        }
    }

    /// Replace the path of one source table.
    pub fn set(&mut self, kind: SourceKind, path: impl Into<PathBuf>) {
        let slot = match kind {
            SourceKind::Macro => &mut self.business_cycle,
            SourceKind::Capital => &mut self.balance_sheet,
            SourceKind::Leverage => &mut self.leverage,
        };
        *slot = path.into();
    }
}

/// Everything one pipeline run needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Source table paths
    pub sources: SourcePaths,
    /// Panel derivation settings
    pub builder: BuilderConfig,
    /// Panel acceptance rules
    pub validation: ValidationConfig,
    /// Covariance and inference settings
    pub estimator: EstimatorConfig,
    /// Output directory (default: `outputs`)
    pub out_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sources: SourcePaths::default(),
            builder: BuilderConfig::default(),
            validation: ValidationConfig::default(),
            estimator: EstimatorConfig::default(),
            out_dir: PathBuf::from("outputs"),
        }
    }
}

impl PipelineConfig {
    /// Parse a configuration from JSON text.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Read and check a configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.check()?;
        Ok(config)
    }

    /// Check value ranges the type system cannot express.
    pub fn check(&self) -> Result<(), ConfigError> {
        let level = self.estimator.confidence_level;
        if !(level > 0.0 && level < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "confidence_level must lie in (0, 1), got {level}"
            )));
        }
        let fraction = self.validation.max_missing_fraction;
        if !(0.0..=1.0).contains(&fraction) {
            return Err(ConfigError::Invalid(format!(
                "max_missing_fraction must lie in [0, 1], got {fraction}"
            )));
        }
        if self.validation.coverage_start > self.validation.coverage_end {
            return Err(ConfigError::Invalid(format!(
                "coverage window {}-{} is empty",
                self.validation.coverage_start, self.validation.coverage_end
            )));
        }
        if !self.builder.min_denominator.is_finite() || self.builder.min_denominator < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "min_denominator must be finite and non-negative, got {}",
                self.builder.min_denominator
            )));
        }
        Ok(())
    }

    /// Pretty JSON rendering, suitable as a starting config file.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
