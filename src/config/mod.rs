//! Configuration loading and validation.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::calculate::composite::DEFAULT_SCORE_PRECISION;
use crate::calculate::qualify::DEFAULT_MIN_MINUTES;
use crate::calculate::NameMatcher;
use crate::models::{default_metrics, MetricName, PlayerId};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

const MAX_SCORE_PRECISION: u32 = 6;

/// Ranking parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingConfig {
    /// Minutes a player needs to be qualified
    #[serde(default = "default_min_minutes")]
    pub min_minutes: u32,

    /// Metrics averaged into the composite score
    #[serde(default = "default_metrics")]
    pub metrics: Vec<MetricName>,

    /// Decimal places the composite score is rounded to
    #[serde(default = "default_score_precision")]
    pub score_precision: u32,
}

fn default_min_minutes() -> u32 {
    DEFAULT_MIN_MINUTES
}

fn default_score_precision() -> u32 {
    DEFAULT_SCORE_PRECISION
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            min_minutes: default_min_minutes(),
            metrics: default_metrics(),
            score_precision: default_score_precision(),
        }
    }
}

/// Explicit identity links between snapshots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Current player id -> previous player id
    #[serde(default)]
    pub overrides: BTreeMap<String, String>,
}

impl IdentityConfig {
    pub fn matcher(&self) -> NameMatcher {
        NameMatcher::with_overrides(
            self.overrides
                .iter()
                .map(|(current, previous)| (PlayerId::from(current.as_str()), PlayerId::from(previous.as_str())))
                .collect(),
        )
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub ranking: RankingConfig,

    #[serde(default)]
    pub identity: IdentityConfig,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            ranking: RankingConfig::default(),
            identity: IdentityConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ranking.metrics.is_empty() {
            return Err(ConfigError::ValidationError(
                "At least one ranking metric is required".to_string(),
            ));
        }

        let mut seen = BTreeSet::new();
        for metric in &self.ranking.metrics {
            if metric.as_str().trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "Metric names must not be empty".to_string(),
                ));
            }
            if !seen.insert(metric) {
                return Err(ConfigError::ValidationError(format!(
                    "Metric '{}' is listed more than once",
                    metric
                )));
            }
        }

        if self.ranking.score_precision > MAX_SCORE_PRECISION {
            return Err(ConfigError::ValidationError(format!(
                "Score precision must be at most {}",
                MAX_SCORE_PRECISION
            )));
        }

        Ok(())
    }
}
