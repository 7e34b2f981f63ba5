//! Benchmark configuration files (YAML or JSON).
//!
//! ```yaml
//! csv: data/prompts.csv
//! max_concurrency: 4
//! temperature: 0.0
//! providers:
//!   - provider: openai
//!     model: gpt-4o-mini
//!   - provider: anthropic
//!     model: claude-sonnet-4-5
//!     name: sonnet
//!     options:
//!       max_tokens: 512
//! supervisor:
//!   model: gpt-5
//!   enabled: true
//! dataset:
//!   prompt_column: question
//!   expected_column: answer
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use fandom_bench_core::{DatasetOptions, ProviderConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::readiness::find_duplicate_label;
use crate::supervisor::SupervisorConfig;

/// Default global concurrency bound.
pub const DEFAULT_MAX_CONCURRENCY: usize = 3;

/// Errors loading or validating a configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Unsupported config format '{0}' (expected .yaml, .yml or .json)")]
    UnsupportedFormat(String),

    #[error("Config validation failed: {0}")]
    ValidationError(String),
}

/// Everything a benchmark run needs besides the dataset rows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BenchConfig {
    /// Dataset CSV path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub csv: Option<PathBuf>,

    pub providers: Vec<ProviderConfig>,
    pub supervisor: SupervisorConfig,
    pub max_concurrency: usize,
    pub temperature: f64,
    pub dry_run: bool,
    pub dataset: DatasetOptions,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            csv: None,
            providers: Vec::new(),
            supervisor: SupervisorConfig::default(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            temperature: 0.0,
            dry_run: false,
            dataset: DatasetOptions::default(),
        }
    }
}

impl BenchConfig {
    /// Parse a config from YAML.
    ///
    /// Numeric limits are checked here; the provider list is checked by
    /// [`validate`](Self::validate) once command-line overrides are applied.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: BenchConfig = serde_yaml::from_str(yaml)?;
        config.validate_limits()?;
        Ok(config)
    }

    /// Parse a config from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: BenchConfig = serde_json::from_str(json)?;
        config.validate_limits()?;
        Ok(config)
    }

    /// Load a config file, picking the format from its extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "yaml" | "yml" => Self::from_yaml(&fs::read_to_string(path)?),
            "json" => Self::from_json(&fs::read_to_string(path)?),
            other => Err(ConfigError::UnsupportedFormat(other.to_string())),
        }
    }

    /// Full validation: limits, at least one provider, unique labels.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_limits()?;

        if self.providers.is_empty() {
            return Err(ConfigError::ValidationError(
                "at least one provider is required".to_string(),
            ));
        }

        if let Some(label) = find_duplicate_label(&self.providers) {
            return Err(ConfigError::ValidationError(format!(
                "Duplicate provider label: {}",
                label
            )));
        }

        Ok(())
    }

    fn validate_limits(&self) -> Result<(), ConfigError> {
        if self.max_concurrency < 1 {
            return Err(ConfigError::ValidationError(
                "max_concurrency must be at least 1".to_string(),
            ));
        }

        for (field, value) in [
            ("temperature", self.temperature),
            ("supervisor.temperature", self.supervisor.temperature),
        ] {
            if !(0.0..=2.0).contains(&value) {
                return Err(ConfigError::ValidationError(format!(
                    "{} must be within [0, 2], got {}",
                    field, value
                )));
            }
        }

        Ok(())
    }
}
