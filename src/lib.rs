//! # arXiv Reviews
//!
//! Finds review, survey and tutorial articles on arXiv by title terms and
//! category codes, with an explicit identifier whitelist and blacklist.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`rules`]: Whitelist/blacklist rules for terms, categories and identifiers
//! - [`models`]: Raw feed entries, candidate records and page requests
//! - [`search`]: Query construction, paginated fetching with retry, result merging
//! - [`sources`]: The remote article source trait and its arXiv implementation
//! - [`utils`]: HTTP client, clock, backoff and other utilities
//! - [`config`]: Configuration management
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use arxiv_reviews::rules::{RuleSet, Term};
//! use arxiv_reviews::search::{SearchSettings, Searcher};
//! use arxiv_reviews::sources::ArxivSource;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let rules = RuleSet::builder()
//!     .category("cs.LG")
//!     .whitelist(Term::new("survey")?)
//!     .build()?;
//!
//! let searcher = Searcher::new(
//!     ArxivSource::new()?,
//!     Arc::new(rules),
//!     SearchSettings::default().max_results(Some(20)),
//! );
//! let outcome = searcher.search().await?;
//! for record in outcome.to_records(searcher.rules()) {
//!     println!("{} {}", record.identifier, record.title);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod models;
pub mod rules;
pub mod search;
pub mod sources;
pub mod utils;

// Re-export commonly used types
pub use models::{CandidateRecord, ExportRecord};
pub use rules::{RuleSet, Term};
pub use search::{SearchOutcome, Searcher};
pub use sources::{ArticleSource, ArxivSource};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
