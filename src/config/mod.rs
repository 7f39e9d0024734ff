//! Configuration management.
//!
//! A single versioned TOML document holds search tunables, matching rules and
//! logging options. Values can be overridden from the environment with the
//! `ARXIV_REVIEWS__` prefix, e.g. `ARXIV_REVIEWS__SEARCH__MAX_RESULTS=50`.

mod file_config;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use file_config::{RulesConfig, TermSpec};

use crate::rules::{RuleError, RuleSet};
use crate::search::{SearchSettings, MAX_RESULTS_PER_QUERY};

/// Supported configuration document version
pub const CONFIG_VERSION: u32 = 1;

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "ARXIV_REVIEWS";

/// File name looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "arxiv-reviews.toml";

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Document format version, must equal [`CONFIG_VERSION`]
    pub version: u32,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub rules: RulesConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Search tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Total result limit; unbounded when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_results: Option<usize>,

    #[serde(default = "default_max_results_per_query")]
    pub max_results_per_query: usize,

    #[serde(default = "default_min_request_interval")]
    pub min_request_interval_secs: f64,

    #[serde(default = "default_max_query_attempts")]
    pub max_query_attempts: u32,

    #[serde(default = "default_empty_page_retries")]
    pub empty_page_retries: u32,

    /// Per-request HTTP timeout
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: None,
            max_results_per_query: default_max_results_per_query(),
            min_request_interval_secs: default_min_request_interval(),
            max_query_attempts: default_max_query_attempts(),
            empty_page_retries: default_empty_page_retries(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_max_results_per_query() -> usize {
    MAX_RESULTS_PER_QUERY
}

fn default_min_request_interval() -> f64 {
    3.0
}

fn default_max_query_attempts() -> u32 {
    10
}

fn default_empty_page_retries() -> u32 {
    3
}

fn default_request_timeout() -> u64 {
    60
}

impl SearchConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Request spacing floor; rejects negative, non-finite and out-of-range values
    pub fn min_request_interval(&self) -> Result<Duration, ConfigError> {
        Duration::try_from_secs_f64(self.min_request_interval_secs).map_err(|e| {
            ConfigError::InvalidSearch(format!(
                "min_request_interval_secs = {} is not a valid duration: {}",
                self.min_request_interval_secs, e
            ))
        })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_results_per_query == 0 || self.max_results_per_query > MAX_RESULTS_PER_QUERY {
            return Err(ConfigError::InvalidSearch(format!(
                "max_results_per_query must be between 1 and {}",
                MAX_RESULTS_PER_QUERY
            )));
        }
        self.min_request_interval()?;
        if self.max_query_attempts == 0 {
            return Err(ConfigError::InvalidSearch(
                "max_query_attempts must be at least 1".to_string(),
            ));
        }
        // An empty page past offset 0 must become acceptable before the attempt ceiling
        if self.empty_page_retries >= self.max_query_attempts {
            return Err(ConfigError::InvalidSearch(format!(
                "empty_page_retries ({}) must be less than max_query_attempts ({})",
                self.empty_page_retries, self.max_query_attempts
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidSearch(
                "request_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Settings for a search run; `max_results` overrides the configured limit
    pub fn to_settings(&self, max_results: Option<usize>) -> Result<SearchSettings, ConfigError> {
        Ok(SearchSettings {
            max_results: max_results.or(self.max_results),
            max_results_per_query: self.max_results_per_query,
            min_request_interval: self.min_request_interval()?,
            max_query_attempts: self.max_query_attempts,
            empty_page_retries: self.empty_page_retries,
        })
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Log line format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Unsupported configuration version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("Invalid search settings: {0}")]
    InvalidSearch(String),

    #[error("Invalid rules: {0}")]
    Rules(#[from] RuleError),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialize error: {0}")]
    Serialize(String),
}

impl Config {
    /// Check version and search settings, then build the rule set
    pub fn validate(&self) -> Result<RuleSet, ConfigError> {
        if self.version != CONFIG_VERSION {
            return Err(ConfigError::UnsupportedVersion {
                found: self.version,
                expected: CONFIG_VERSION,
            });
        }
        self.search.validate()?;
        Ok(self.rules.build()?)
    }
}

/// Load configuration from a TOML file, applying environment overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    load_config_with(path, environment())
}

/// `ARXIV_REVIEWS__SECTION__KEY` variables override `section.key`
fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .try_parsing(true)
}

fn load_config_with(path: &Path, environment: config::Environment) -> Result<Config, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::from(path).format(config::FileFormat::Toml))
        .add_source(environment)
        .build()?;

    Ok(settings.try_deserialize()?)
}

/// Per-user configuration path, e.g. `~/.config/arxiv-reviews/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("arxiv-reviews").join("config.toml"))
}

/// First existing configuration file: the per-user one, then the local one
pub fn find_config_file() -> Option<PathBuf> {
    default_config_path()
        .into_iter()
        .chain(std::iter::once(PathBuf::from(LOCAL_CONFIG_FILE)))
        .find(|path| path.is_file())
}
