//! The search pipeline: query construction, pagination and result merging.
//!
//! A [`Searcher`] runs the title search and then, unless the result limit is
//! already reached, the identifier search. Both result sets are merged,
//! deduplicated in favour of title results, sorted newest first and truncated.

mod merge;
mod paginate;
mod query;

use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::info;

pub use merge::{
    compare_records, deduplicate, finalize, merge_results, redundant_whitelisted_ids,
    sort_records, MergeOutcome,
};
pub use paginate::{PaginationSettings, Paginator, QueryState};
pub use query::SearchPlan;

use crate::models::{CandidateRecord, ExportRecord, QueryTarget, SortBy};
use crate::rules::RuleSet;
use crate::sources::ArticleSource;
use crate::utils::{Clock, MemoryMonitor, TokioClock};

/// Largest page the arXiv API serves in one request
pub const MAX_RESULTS_PER_QUERY: usize = 2000;

/// Default minimum spacing between requests
pub const MIN_REQUEST_INTERVAL: Duration = Duration::from_secs(3);

/// Terminal failure of a query
#[derive(Debug, Error)]
pub enum FetchError {
    #[error(
        "{label} query at offset {offset} failed after {attempts} attempts: \
         got {returned} results, expected at least {expected}"
    )]
    InsufficientResults {
        label: &'static str,
        offset: usize,
        attempts: u32,
        returned: usize,
        expected: usize,
    },
}

/// Tunables of a search run
#[derive(Debug, Clone, PartialEq)]
pub struct SearchSettings {
    /// Total result limit; `None` for unbounded
    pub max_results: Option<usize>,
    /// Upper bound on the requested page size
    pub max_results_per_query: usize,
    /// Floor for the request spacing and initial retry interval
    pub min_request_interval: Duration,
    pub max_query_attempts: u32,
    pub empty_page_retries: u32,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            max_results: None,
            max_results_per_query: MAX_RESULTS_PER_QUERY,
            min_request_interval: MIN_REQUEST_INTERVAL,
            max_query_attempts: 10,
            empty_page_retries: 3,
        }
    }
}

impl SearchSettings {
    pub fn max_results(mut self, max_results: Option<usize>) -> Self {
        self.max_results = max_results;
        self
    }

    /// Page size: `max_results * e` rounded down, capped by the per-query maximum
    pub fn page_size(&self) -> usize {
        let size = match self.max_results {
            Some(max) => {
                let scaled = (max as f64 * std::f64::consts::E).floor() as usize;
                scaled.min(self.max_results_per_query)
            }
            None => self.max_results_per_query,
        };
        size.max(1)
    }

    /// Initial interval: at least `ln(page_size)` seconds, never below the minimum
    pub fn initial_interval(&self) -> Duration {
        let scaled = Duration::from_secs_f64((self.page_size() as f64).ln().max(0.0));
        scaled.max(self.min_request_interval)
    }

    /// Bounded searches sort by last update, unbounded ones by submission
    pub fn sort_by(&self) -> SortBy {
        if self.max_results.is_some() {
            SortBy::LastUpdatedDate
        } else {
            SortBy::SubmittedDate
        }
    }

    pub fn pagination(&self) -> PaginationSettings {
        PaginationSettings {
            page_size: self.page_size(),
            initial_interval: self.initial_interval(),
            max_attempts: self.max_query_attempts,
            empty_page_retries: self.empty_page_retries,
            sort_by: self.sort_by(),
        }
    }
}

/// Result of a complete search run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOutcome {
    /// Accepted records, newest first
    pub records: Vec<CandidateRecord>,
    /// Whitelisted IDs already returned by title search
    pub redundant_ids: Vec<String>,
    pub title_count: usize,
    pub id_count: usize,
    /// Whether the identifier search was skipped because the limit was reached
    pub id_search_skipped: bool,
}

impl SearchOutcome {
    pub fn to_records(&self, rules: &RuleSet) -> Vec<ExportRecord> {
        self.records.iter().map(|r| r.to_record(rules)).collect()
    }
}

/// Runs the title and identifier searches for one rule set
pub struct Searcher<S, C = TokioClock> {
    source: S,
    clock: C,
    rules: Arc<RuleSet>,
    plan: SearchPlan,
    settings: SearchSettings,
    memory: MemoryMonitor,
}

impl<S: ArticleSource> Searcher<S, TokioClock> {
    pub fn new(source: S, rules: Arc<RuleSet>, settings: SearchSettings) -> Self {
        Self::with_clock(source, TokioClock, rules, settings)
    }
}

impl<S: ArticleSource, C: Clock> Searcher<S, C> {
    pub fn with_clock(source: S, clock: C, rules: Arc<RuleSet>, settings: SearchSettings) -> Self {
        let plan = SearchPlan::new(&rules);
        Self {
            source,
            clock,
            rules,
            plan,
            settings,
            memory: MemoryMonitor::new(),
        }
    }

    pub fn plan(&self) -> &SearchPlan {
        &self.plan
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    /// Run both searches and merge them
    pub async fn search(&self) -> Result<SearchOutcome, FetchError> {
        let limit = self.settings.max_results;
        let pagination = self.settings.pagination();
        info!(
            "Additional memory used before search is {}.",
            self.memory.describe()
        );
        info!(
            "Searching {} with page size {}, initial interval {:.1}s, sorted by {}.",
            self.source.name(),
            pagination.page_size,
            pagination.initial_interval.as_secs_f64(),
            pagination.sort_by.as_str()
        );

        let (title_results, last_request) = match self.plan.title_query() {
            Some(expression) => {
                info!("Title search query: {}", expression);
                let target = QueryTarget::Expression(expression.to_string());
                self.paginate(target, &pagination, None).await?
            }
            None => (Vec::new(), None),
        };

        let limit_reached = limit.is_some_and(|limit| title_results.len() >= limit);
        let id_results = if self.plan.id_list().is_empty() {
            Some(Vec::new())
        } else if limit_reached {
            info!(
                "Skipping ID search because title search already returned {} results.",
                title_results.len()
            );
            None
        } else {
            let target = QueryTarget::IdList(self.plan.id_list().to_vec());
            Some(self.paginate(target, &pagination, last_request).await?.0)
        };

        let title_count = title_results.len();
        let id_count = id_results.as_ref().map_or(0, Vec::len);
        let merged = merge_results(title_results, id_results, &self.rules, limit);

        info!(
            "Search finished with {} results. Additional memory used since searcher creation is {}.",
            merged.records.len(),
            self.memory.describe()
        );

        Ok(SearchOutcome {
            records: merged.records,
            redundant_ids: merged.redundant_ids,
            title_count,
            id_count,
            id_search_skipped: limit_reached && !self.plan.id_list().is_empty(),
        })
    }

    async fn paginate(
        &self,
        target: QueryTarget,
        pagination: &PaginationSettings,
        after: Option<Instant>,
    ) -> Result<(Vec<CandidateRecord>, Option<Instant>), FetchError> {
        let mut pager = Paginator::new(
            &self.source,
            &self.clock,
            &self.rules,
            target,
            pagination.clone(),
            self.settings.max_results,
        )
        .spaced_after(after);

        let mut records = Vec::new();
        while let Some(record) = pager.next().await? {
            records.push(record);
        }
        Ok((records, pager.last_completed()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbounded_settings() {
        let settings = SearchSettings::default();
        assert_eq!(settings.page_size(), 2000);
        assert_eq!(settings.sort_by(), SortBy::SubmittedDate);
        // ln(2000) is about 7.6s
        let interval = settings.initial_interval().as_secs_f64();
        assert!(interval > 7.5 && interval < 7.7);
    }

    #[test]
    fn test_bounded_settings() {
        let settings = SearchSettings::default().max_results(Some(10));
        // 10 * e = 27.18
        assert_eq!(settings.page_size(), 27);
        assert_eq!(settings.sort_by(), SortBy::LastUpdatedDate);
        // ln(27) is about 3.30s, just above the floor
        let interval = settings.initial_interval().as_secs_f64();
        assert!(interval > 3.29 && interval < 3.31);

        let tiny = SearchSettings::default().max_results(Some(1));
        assert_eq!(tiny.page_size(), 2);
        assert_eq!(tiny.initial_interval(), MIN_REQUEST_INTERVAL);
    }

    #[test]
    fn test_page_size_is_capped() {
        let settings = SearchSettings::default().max_results(Some(5000));
        assert_eq!(settings.page_size(), MAX_RESULTS_PER_QUERY);
    }

    #[test]
    fn test_page_size_never_zero() {
        let settings = SearchSettings::default().max_results(Some(0));
        assert_eq!(settings.page_size(), 1);
    }
}
