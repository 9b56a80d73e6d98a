use std::path::PathBuf;

use sb_srs::{DEFAULT_GROWTH_FACTOR, DEFAULT_INTERVALS, SchedulerConfig, SrsError};
use serde::Deserialize;
use thiserror::Error;

/// Prefix of every configuration variable, e.g. `STUDY_BUDDY_DATA_DIR`.
pub const ENV_PREFIX: &str = "STUDY_BUDDY_";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid environment configuration: {0}")]
    Env(#[from] envy::Error),
    #[error(transparent)]
    Scheduler(#[from] SrsError),
}

/// Deployment environment, selects log format and CORS defaults.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub const fn is_development(self) -> bool {
        matches!(self, Self::Development)
    }

    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub env: Environment,
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Root of the progress and review documents
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// When false, documents only live in memory
    #[serde(default = "default_use_file_persistence")]
    pub use_file_persistence: bool,
    /// Comma separated list of origins
    #[serde(default)]
    pub allowed_origins: Option<String>,
    /// Review intervals in days, comma separated
    #[serde(default = "default_intervals")]
    pub intervals: Vec<f64>,
    #[serde(default = "default_growth_factor")]
    pub growth_factor: f64,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("output")
}

const fn default_use_file_persistence() -> bool {
    true
}

fn default_intervals() -> Vec<f64> {
    DEFAULT_INTERVALS.to_vec()
}

const fn default_growth_factor() -> f64 {
    DEFAULT_GROWTH_FACTOR
}

impl ApiConfig {
    /// Load the configuration from `STUDY_BUDDY_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(std::env::vars())
    }

    /// Load the configuration from an explicit set of variables.
    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config: Self = envy::prefixed(ENV_PREFIX).from_iter(vars)?;
        config.scheduler_config().validate()?;
        Ok(config)
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            intervals: self.intervals.clone(),
            growth_factor: self.growth_factor,
        }
    }

    /// Allowed CORS origins, trimmed, empty entries dropped.
    pub fn parsed_allowed_origins(&self) -> Vec<String> {
        self.allowed_origins
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(String::from)
            .collect()
    }
}
