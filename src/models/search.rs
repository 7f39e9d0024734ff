//! Page request parameters sent to an article source.

use serde::{Deserialize, Serialize};

/// Sort field understood by the remote source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortBy {
    LastUpdatedDate,
    SubmittedDate,
}

impl SortBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortBy::LastUpdatedDate => "lastUpdatedDate",
            SortBy::SubmittedDate => "submittedDate",
        }
    }
}

/// Sort order for search results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Descending,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Descending => "descending",
        }
    }
}

/// What a paginated run asks the source for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryTarget {
    /// Boolean search expression over titles and categories
    Expression(String),
    /// Explicit list of version-agnostic identifiers, sorted
    IdList(Vec<String>),
}

impl QueryTarget {
    /// Short label used in log messages
    pub fn label(&self) -> &'static str {
        match self {
            QueryTarget::Expression(_) => "title",
            QueryTarget::IdList(_) => "ID",
        }
    }
}

/// One page request against the remote source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub target: QueryTarget,
    /// Offset of the first result
    pub start: usize,
    /// Requested page size
    pub max_results: usize,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
}

impl PageRequest {
    pub fn new(target: QueryTarget, start: usize, max_results: usize) -> Self {
        Self {
            target,
            start,
            max_results,
            sort_by: SortBy::LastUpdatedDate,
            sort_order: SortOrder::Descending,
        }
    }

    pub fn sort_by(mut self, sort_by: SortBy) -> Self {
        self.sort_by = sort_by;
        self
    }
}
