//! Rule sections of the configuration file and TOML persistence.
//!
//! # Configuration File Format
//!
//! ```toml
//! version = 1
//!
//! [search]
//! max_results = 100
//! max_results_per_query = 2000
//! min_request_interval_secs = 3.0
//! max_query_attempts = 10
//! empty_page_retries = 3
//! request_timeout_secs = 60
//!
//! [rules]
//! categories = ["cs.AI", "cs.LG", "stat.ML"]
//! whitelist = ["review", "tutorial", { phrase = "survey", not_followed_by = "data" }]
//! blacklist = ["peer review"]
//! id_whitelist = ["1706.03762"]
//! id_blacklist = []
//! id_whitelist_intersection_ignored = []
//!
//! [logging]
//! level = "info"
//! format = "text"
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{Config, ConfigError, LoggingConfig, SearchConfig, CONFIG_VERSION};
use crate::rules::{RuleError, RuleSet, Term};

/// A title term: a bare phrase or a phrase with adjacency assertions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TermSpec {
    Plain(String),
    Detailed {
        phrase: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        not_preceded_by: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        not_followed_by: Option<String>,
    },
}

impl TermSpec {
    pub fn to_term(&self) -> Result<Term, RuleError> {
        match self {
            TermSpec::Plain(phrase) => Term::new(phrase),
            TermSpec::Detailed {
                phrase,
                not_preceded_by,
                not_followed_by,
            } => {
                let mut term = Term::new(phrase)?;
                if let Some(before) = not_preceded_by {
                    term = term.not_preceded_by(before)?;
                }
                if let Some(after) = not_followed_by {
                    term = term.not_followed_by(after)?;
                }
                Ok(term)
            }
        }
    }
}

impl From<&str> for TermSpec {
    fn from(phrase: &str) -> Self {
        TermSpec::Plain(phrase.to_string())
    }
}

/// `[rules]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RulesConfig {
    #[serde(default)]
    pub categories: Vec<String>,

    #[serde(default)]
    pub whitelist: Vec<TermSpec>,

    #[serde(default)]
    pub blacklist: Vec<TermSpec>,

    #[serde(default)]
    pub id_whitelist: Vec<String>,

    #[serde(default)]
    pub id_blacklist: Vec<String>,

    /// Whitelisted IDs that title search returns unreliably; not reported as redundant
    #[serde(default)]
    pub id_whitelist_intersection_ignored: Vec<String>,
}

impl RulesConfig {
    /// Validate every entry and build the immutable rule set
    pub fn build(&self) -> Result<RuleSet, RuleError> {
        let mut builder = RuleSet::builder();
        for category in &self.categories {
            builder = builder.category(category.as_str());
        }
        for spec in &self.whitelist {
            builder = builder.whitelist(spec.to_term()?);
        }
        for spec in &self.blacklist {
            builder = builder.blacklist(spec.to_term()?);
        }
        for id in &self.id_whitelist {
            builder = builder.whitelist_id(id.as_str());
        }
        for id in &self.id_blacklist {
            builder = builder.blacklist_id(id.as_str());
        }
        for id in &self.id_whitelist_intersection_ignored {
            builder = builder.ignore_intersection(id.as_str());
        }
        builder.build()
    }
}

impl Config {
    /// Starting configuration written by `init`
    pub fn create_default() -> Self {
        let categories = ["cs.AI", "cs.IR", "cs.LG", "cs.NE", "stat.ML"];
        let whitelist = [
            "contemporary",
            "introduction",
            "guide",
            "overview",
            "tour",
            "tutorial",
        ];

        Self {
            version: CONFIG_VERSION,
            search: SearchConfig::default(),
            rules: RulesConfig {
                categories: categories.iter().map(|c| c.to_string()).collect(),
                whitelist: whitelist
                    .iter()
                    .map(|&t| TermSpec::from(t))
                    .chain(std::iter::once(TermSpec::Detailed {
                        phrase: "review".to_string(),
                        not_preceded_by: Some("peer".to_string()),
                        not_followed_by: None,
                    }))
                    .collect(),
                ..RulesConfig::default()
            },
            logging: LoggingConfig::default(),
        }
    }

    /// Render as a TOML document
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    /// Parse a TOML document without environment overrides
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self.to_toml()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io(e.to_string()))?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Io(e.to_string()))
    }
}
