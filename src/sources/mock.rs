//! Mock source for testing purposes.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::models::{PageRequest, RawEntry};
use crate::sources::{ArticleSource, SourceError};

/// A scripted response: a page of entries or a transport failure message
type Scripted = Result<Vec<RawEntry>, String>;

/// A mock source that replays scripted pages in order and records every request.
///
/// Once the script is exhausted every further request returns an empty page.
#[derive(Debug, Default)]
pub struct MockSource {
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<PageRequest>>,
}

impl MockSource {
    /// Create a new mock source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a page to return.
    pub fn push_page(&self, entries: Vec<RawEntry>) -> &Self {
        lock(&self.script).push_back(Ok(entries));
        self
    }

    /// Queue a transport failure.
    pub fn push_error(&self, message: impl Into<String>) -> &Self {
        lock(&self.script).push_back(Err(message.into()));
        self
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<PageRequest> {
        lock(&self.requests).clone()
    }

    pub fn request_count(&self) -> usize {
        lock(&self.requests).len()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl ArticleSource for MockSource {
    fn name(&self) -> &str {
        "Mock Source"
    }

    async fn query(&self, request: &PageRequest) -> Result<Vec<RawEntry>, SourceError> {
        lock(&self.requests).push(request.clone());
        match lock(&self.script).pop_front() {
            Some(Ok(entries)) => Ok(entries),
            Some(Err(message)) => Err(SourceError::Network(message)),
            None => Ok(Vec::new()),
        }
    }
}

/// Helper function to create a raw entry for testing.
///
/// `id` is the version-agnostic identifier; the entry is published on `day`
/// and updated on the same day, both as `YYYY-MM-DD`.
pub fn make_entry(id: &str, title: &str, day: &str) -> RawEntry {
    RawEntry {
        id: format!("http://arxiv.org/abs/{}v1", id),
        title: title.to_string(),
        summary: format!("Abstract of {}", id),
        published: format!("{}T00:00:00Z", day),
        updated: format!("{}T00:00:00Z", day),
        primary_category: Some("cs.LG".to_string()),
        categories: vec!["cs.LG".to_string()],
    }
}

/// Create `count` entries with sequential IDs starting at `first` that all
/// carry `title`.
pub fn make_entries(first: usize, count: usize, title: &str) -> Vec<RawEntry> {
    (first..first + count)
        .map(|n| make_entry(&format!("2301.{:05}", n), title, "2023-01-01"))
        .collect()
}
