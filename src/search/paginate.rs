//! Offset-based pagination with bounded retry and request spacing.

use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::models::{CandidateRecord, PageRequest, QueryTarget, RawEntry, SortBy};
use crate::rules::RuleSet;
use crate::search::FetchError;
use crate::sources::ArticleSource;
use crate::utils::{AttemptState, Backoff, Clock, MemoryMonitor, PageOutcome, RetryPolicy};

/// Fixed parameters of one pagination run
#[derive(Debug, Clone, PartialEq)]
pub struct PaginationSettings {
    /// Requested page size
    pub page_size: usize,
    /// Initial retry interval and minimum spacing between requests
    pub initial_interval: Duration,
    /// Attempt ceiling per page
    pub max_attempts: u32,
    /// Attempts for which an empty page past offset 0 still counts as short
    pub empty_page_retries: u32,
    pub sort_by: SortBy,
}

/// Mutable cursor of a pagination run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueryState {
    pub offset: usize,
    pub yielded: usize,
}

/// A pull-based stream of accepted records for one query.
///
/// Pages are fetched lazily: a page is requested only once every accepted
/// record of the previous page has been consumed. Pagination ends when the
/// limit is reached or a page comes back shorter than the page size.
pub struct Paginator<'a, S: ?Sized, C: ?Sized> {
    source: &'a S,
    clock: &'a C,
    rules: &'a RuleSet,
    target: QueryTarget,
    settings: PaginationSettings,
    limit: Option<usize>,
    state: QueryState,
    backoff: Backoff,
    pending: VecDeque<CandidateRecord>,
    last_completed: Option<Instant>,
    exhausted: bool,
    finished: bool,
    memory: MemoryMonitor,
}

impl<'a, S, C> Paginator<'a, S, C>
where
    S: ArticleSource + ?Sized,
    C: Clock + ?Sized,
{
    pub fn new(
        source: &'a S,
        clock: &'a C,
        rules: &'a RuleSet,
        target: QueryTarget,
        settings: PaginationSettings,
        limit: Option<usize>,
    ) -> Self {
        let policy = RetryPolicy::default()
            .max_attempts(settings.max_attempts)
            .initial_interval(settings.initial_interval);

        Self {
            source,
            clock,
            rules,
            target,
            settings,
            limit,
            state: QueryState::default(),
            backoff: Backoff::new(policy),
            pending: VecDeque::new(),
            last_completed: None,
            exhausted: false,
            finished: false,
            memory: MemoryMonitor::new(),
        }
    }

    /// Space the first request from one completed by an earlier run
    pub fn spaced_after(mut self, completed: Option<Instant>) -> Self {
        self.last_completed = completed;
        self
    }

    pub fn state(&self) -> QueryState {
        self.state
    }

    /// When the most recent request completed
    pub fn last_completed(&self) -> Option<Instant> {
        self.last_completed
    }

    /// Current retry interval
    pub fn interval(&self) -> Duration {
        self.backoff.interval()
    }

    /// Get the next accepted record.
    ///
    /// Returns `Ok(None)` when pagination is complete.
    pub async fn next(&mut self) -> Result<Option<CandidateRecord>, FetchError> {
        loop {
            if self.limit.is_some_and(|limit| self.state.yielded >= limit) {
                self.finish();
                return Ok(None);
            }

            if let Some(record) = self.pending.pop_front() {
                self.state.yielded += 1;
                return Ok(Some(record));
            }

            if self.exhausted {
                self.finish();
                return Ok(None);
            }

            self.fetch_next_page().await?;
        }
    }

    /// Collect all remaining records into a Vec
    pub async fn collect_all(mut self) -> Result<Vec<CandidateRecord>, FetchError> {
        let mut records = Vec::new();
        while let Some(record) = self.next().await? {
            records.push(record);
        }
        Ok(records)
    }

    fn finish(&mut self) {
        if !self.finished {
            self.finished = true;
            self.pending.clear();
            info!(
                "Completed all {} queries, yielding {} results.",
                self.target.label(),
                self.state.yielded
            );
        }
    }

    async fn fetch_next_page(&mut self) -> Result<(), FetchError> {
        if let Some(completed) = self.last_completed {
            // Spacing is measured from completion of the previous request
            let spent = self.clock.now().saturating_duration_since(completed);
            let remaining = self.backoff.interval().saturating_sub(spent);
            if !remaining.is_zero() {
                info!("Sleeping for {:.1}s", remaining.as_secs_f64());
                self.clock.sleep(remaining).await;
            }
        }

        let entries = self.run_query().await?;
        self.last_completed = Some(self.clock.now());

        let returned = entries.len();
        self.filter_page(entries);

        let page_size = self.settings.page_size;
        if returned < page_size || self.is_id_list_done(page_size) {
            self.exhausted = true;
        } else {
            self.state.offset += page_size;
        }

        info!(
            "Additional memory used since start of {} queries, with {} results accepted, is {}.",
            self.target.label(),
            self.state.yielded + self.pending.len(),
            self.memory.describe()
        );
        Ok(())
    }

    /// An ID list is fully covered once the offset passes its length
    fn is_id_list_done(&self, page_size: usize) -> bool {
        match &self.target {
            QueryTarget::IdList(ids) => self.state.offset + page_size >= ids.len(),
            QueryTarget::Expression(_) => false,
        }
    }

    /// Minimum result count for the page at the current offset to be trusted
    fn min_expected(&self, attempt: u32) -> usize {
        let page_size = self.settings.page_size;
        // The final attempt always accepts an empty page past offset 0
        let empty_page_retries = self
            .settings
            .empty_page_retries
            .min(self.settings.max_attempts.saturating_sub(1));
        match &self.target {
            QueryTarget::Expression(_) if self.state.offset == 0 => page_size,
            // Past the first page an empty result may be genuine
            QueryTarget::Expression(_) if attempt <= empty_page_retries => 1,
            QueryTarget::Expression(_) => 0,
            QueryTarget::IdList(ids) => ids.len().saturating_sub(self.state.offset).min(page_size),
        }
    }

    /// Run one page request through the retry state machine
    async fn run_query(&mut self) -> Result<Vec<RawEntry>, FetchError> {
        let label = self.target.label();
        let offset = self.state.offset;
        let request = PageRequest::new(self.target.clone(), offset, self.settings.page_size)
            .sort_by(self.settings.sort_by);

        let mut entries = Vec::new();
        let mut expected = 0;
        let mut state = self.backoff.begin();

        loop {
            state = match state {
                AttemptState::Fetching { attempt } => {
                    info!("Starting {} query at offset {}.", label, offset);
                    entries = match self.source.query(&request).await {
                        Ok(entries) => entries,
                        Err(e) => {
                            warn!("The {} query at offset {} failed: {}", label, offset, e);
                            Vec::new()
                        }
                    };

                    expected = self.min_expected(attempt);
                    let outcome = if entries.len() >= expected {
                        PageOutcome::Sufficient
                    } else {
                        PageOutcome::Insufficient
                    };
                    self.backoff.record(outcome)
                }
                AttemptState::Waiting { delay, .. } => {
                    warn!(
                        "The {} query returned {} results which is an insufficient number relative to \
                         an expectation of at least {}. The query will be rerun.",
                        label,
                        entries.len(),
                        expected
                    );
                    info!("Sleeping for {:.1}s", delay.as_secs_f64());
                    self.clock.sleep(delay).await;
                    self.backoff.resume()
                }
                AttemptState::Succeeded { .. } => {
                    info!(
                        "The {} query returned {} results which is a sufficient number.",
                        label,
                        entries.len()
                    );
                    return Ok(entries);
                }
                AttemptState::ExhaustedRetries { attempts } => {
                    tracing::error!(
                        "Despite {} attempts, the {} query failed with insufficient results.",
                        attempts,
                        label
                    );
                    return Err(FetchError::InsufficientResults {
                        label,
                        offset,
                        attempts,
                        returned: entries.len(),
                        expected,
                    });
                }
                AttemptState::Idle => self.backoff.begin(),
            };
        }
    }

    /// Normalize and classify a page, queueing accepted records
    fn filter_page(&mut self, entries: Vec<RawEntry>) {
        let total = entries.len();
        let mut accepted = 0;

        for raw in &entries {
            let record = match CandidateRecord::from_raw(raw) {
                Ok(record) => record,
                Err(e) => {
                    warn!("Skipped malformed record: {}", e);
                    continue;
                }
            };

            let classification = record.classify(self.rules);
            if classification.is_accepted() {
                accepted += 1;
                self.pending.push_back(record);
            } else {
                debug!(
                    "Skipped result: {} (v{}) ({:?})",
                    record.title(),
                    record.version(),
                    classification
                );
            }
        }

        debug!("Accepted {} of {} results.", accepted, total);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Term;
    use crate::sources::mock::{make_entries, make_entry};
    use crate::sources::MockSource;
    use crate::utils::ManualClock;

    fn rules() -> RuleSet {
        RuleSet::builder()
            .category("cs.LG")
            .whitelist(Term::new("review").unwrap())
            .blacklist_id("2301.00001")
            .whitelist_id("2301.09999")
            .build()
            .unwrap()
    }

    fn settings(page_size: usize) -> PaginationSettings {
        PaginationSettings {
            page_size,
            initial_interval: Duration::from_secs(3),
            max_attempts: 10,
            empty_page_retries: 3,
            sort_by: SortBy::LastUpdatedDate,
        }
    }

    fn title_target() -> QueryTarget {
        QueryTarget::Expression("(ti:review)".to_string())
    }

    #[tokio::test]
    async fn test_stops_after_short_page() {
        let source = MockSource::new();
        source.push_page(make_entries(10, 4, "A Review"));
        source.push_page(make_entries(20, 4, "A Review"));
        source.push_page(make_entries(30, 2, "A Review"));
        let clock = ManualClock::new();
        let rules = rules();

        let pager = Paginator::new(&source, &clock, &rules, title_target(), settings(4), None);
        let records = pager.collect_all().await.unwrap();

        assert_eq!(records.len(), 10);
        let offsets: Vec<usize> = source.requests().iter().map(|r| r.start).collect();
        assert_eq!(offsets, vec![0, 4, 8]);
        // Spacing between the three requests, nothing after the short page
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(3); 2]);
    }

    #[tokio::test]
    async fn test_filter_pass_rate_and_malformed_records() {
        let source = MockSource::new();
        let mut page = make_entries(1, 2, "A Review");
        page.push(make_entry("2301.00003", "Something Else", "2023-01-01"));
        let mut broken = make_entry("2301.00004", "A Review", "2023-01-01");
        broken.updated = "yesterday".to_string();
        page.push(broken);
        source.push_page(page);
        source.push_page(vec![make_entry("2301.00005", "Nothing Here", "2023-01-01")]);

        let clock = ManualClock::new();
        let rules = rules();
        let pager = Paginator::new(&source, &clock, &rules, title_target(), settings(4), None);
        let records = pager.collect_all().await.unwrap();

        // 2301.00001 is blacklisted, 2301.00003 has no whitelist term, 2301.00004 is malformed
        let ids: Vec<&str> = records.iter().map(|r| r.identifier()).collect();
        assert_eq!(ids, vec!["2301.00002"]);
        assert_eq!(source.request_count(), 2);
    }

    #[tokio::test]
    async fn test_retry_escalates_then_succeeds() {
        let source = MockSource::new();
        source.push_page(Vec::new());
        source.push_error("connection reset");
        source.push_page(make_entries(10, 4, "A Review"));
        let clock = ManualClock::new();
        let rules = rules();

        let mut pager = Paginator::new(&source, &clock, &rules, title_target(), settings(4), None);
        let first = pager.next().await.unwrap();

        assert_eq!(first.map(|r| r.identifier().to_string()), Some("2301.00010".to_string()));
        assert_eq!(source.request_count(), 3);
        let sleeps = clock.sleeps();
        assert_eq!(sleeps.len(), 2);
        assert_eq!(sleeps[0], Duration::from_secs(3));
        assert!(sleeps[0] < sleeps[1]);
        assert!(pager.interval() > sleeps[1]);
    }

    #[tokio::test]
    async fn test_limit_stops_before_next_page() {
        let source = MockSource::new();
        source.push_page(make_entries(10, 4, "A Review"));
        source.push_page(make_entries(20, 4, "A Review"));
        let clock = ManualClock::new();
        let rules = rules();

        let pager = Paginator::new(&source, &clock, &rules, title_target(), settings(4), Some(3));
        let records = pager.collect_all().await.unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(source.request_count(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_retries_is_terminal() {
        let source = MockSource::new();
        let clock = ManualClock::new();
        let rules = rules();
        let mut settings = settings(4);
        settings.max_attempts = 5;

        let mut pager = Paginator::new(&source, &clock, &rules, title_target(), settings, None);
        let err = pager.next().await.unwrap_err();

        match err {
            FetchError::InsufficientResults {
                attempts, offset, ..
            } => {
                assert_eq!(attempts, 5);
                assert_eq!(offset, 0);
            }
        }
        assert_eq!(source.request_count(), 5);
        assert_eq!(clock.sleeps().len(), 4);
    }

    #[tokio::test]
    async fn test_empty_page_past_first_is_accepted_after_retries() {
        let source = MockSource::new();
        source.push_page(make_entries(10, 4, "A Review"));
        // Every later request returns an empty page
        let clock = ManualClock::new();
        let rules = rules();

        let pager = Paginator::new(&source, &clock, &rules, title_target(), settings(4), None);
        let records = pager.collect_all().await.unwrap();

        assert_eq!(records.len(), 4);
        // One first page, then empty_page_retries short attempts plus the accepted empty one
        assert_eq!(source.request_count(), 1 + 3 + 1);
    }

    #[tokio::test]
    async fn test_empty_page_accepted_on_last_attempt() {
        let source = MockSource::new();
        source.push_page(make_entries(10, 4, "A Review"));
        let clock = ManualClock::new();
        let rules = rules();
        let mut settings = settings(4);
        settings.max_attempts = 3;
        settings.empty_page_retries = 3;

        let pager = Paginator::new(&source, &clock, &rules, title_target(), settings, None);
        let records = pager.collect_all().await.unwrap();

        // A total that is a multiple of the page size ends cleanly
        assert_eq!(records.len(), 4);
        assert_eq!(source.request_count(), 1 + 3);
        let offsets: Vec<usize> = source.requests().iter().map(|r| r.start).collect();
        assert_eq!(offsets, vec![0, 4, 4, 4]);
    }

    #[tokio::test]
    async fn test_id_list_expectations() {
        let source = MockSource::new();
        let ids = vec!["2301.09999".to_string()];
        source.push_page(vec![make_entry("2301.09999", "Unrelated Title", "2023-01-01")]);
        let clock = ManualClock::new();
        let rules = rules();

        let pager = Paginator::new(
            &source,
            &clock,
            &rules,
            QueryTarget::IdList(ids),
            settings(4),
            None,
        );
        let records = pager.collect_all().await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].identifier(), "2301.09999");
        assert_eq!(source.request_count(), 1);
        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_processing_time_counts_toward_spacing() {
        let source = MockSource::new();
        source.push_page(make_entries(10, 4, "A Review"));
        source.push_page(make_entries(20, 1, "A Review"));
        let clock = ManualClock::new();
        let rules = rules();

        let mut pager = Paginator::new(&source, &clock, &rules, title_target(), settings(4), None);
        for _ in 0..4 {
            assert!(pager.next().await.unwrap().is_some());
        }
        clock.advance(Duration::from_secs(2));
        assert!(pager.next().await.unwrap().is_some());
        assert!(pager.next().await.unwrap().is_none());

        assert_eq!(clock.sleeps(), vec![Duration::from_secs(1)]);
        assert_eq!(pager.state(), QueryState { offset: 4, yielded: 5 });
    }
}
