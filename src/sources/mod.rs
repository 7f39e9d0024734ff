//! Remote article sources.
//!
//! This module defines the [`ArticleSource`] trait the paginated fetcher talks
//! to. A source answers exactly one page request at a time and knows nothing
//! about retries, filtering or rate limits; those belong to
//! [`crate::search::Paginator`].
//!
//! - [`ArxivSource`]: the arXiv Atom API
//! - [`MockSource`]: scripted pages for tests

mod arxiv;
pub mod mock;

pub use arxiv::ArxivSource;
pub use mock::MockSource;

use async_trait::async_trait;
use std::sync::Arc;

use crate::models::{PageRequest, RawEntry};

/// A remote service answering paginated article queries.
#[async_trait]
pub trait ArticleSource: Send + Sync + std::fmt::Debug {
    /// Human-readable name of this source
    fn name(&self) -> &str;

    /// Fetch one page of raw entries
    async fn query(&self, request: &PageRequest) -> Result<Vec<RawEntry>, SourceError>;
}

#[async_trait]
impl<T: ArticleSource + ?Sized> ArticleSource for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn query(&self, request: &PageRequest) -> Result<Vec<RawEntry>, SourceError> {
        (**self).query(request).await
    }
}

/// Errors that can occur when interacting with a source
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Network or HTTP error
    #[error("Network error: {0}")]
    Network(String),

    /// Parsing error (XML)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// API error from the source
    #[error("API error: {0}")]
    Api(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::Network(err.to_string())
    }
}

impl From<quick_xml::Error> for SourceError {
    fn from(err: quick_xml::Error) -> Self {
        SourceError::Parse(format!("XML: {}", err))
    }
}
