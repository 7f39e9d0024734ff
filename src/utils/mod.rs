//! Utility modules supporting the search pipeline.
//!
//! - [`HttpClient`]: shared HTTP client with sensible defaults
//! - [`Clock`]: time source for rate-limit and backoff waits ([`TokioClock`], [`ManualClock`])
//! - [`Backoff`]: retry state machine for pages that come back short
//! - [`MemoryMonitor`]: resident memory growth for diagnostic logging
//! - [`format_markdown`] / [`format_table`]: rendering of exported records
//!
//! # Retry with Backoff
//!
//! ```rust
//! use arxiv_reviews::utils::{AttemptState, Backoff, PageOutcome, RetryPolicy};
//! use std::time::Duration;
//!
//! let mut backoff = Backoff::new(RetryPolicy::default().max_attempts(2));
//! backoff.begin();
//! match backoff.record(PageOutcome::Insufficient) {
//!     AttemptState::Waiting { delay, .. } => assert_eq!(delay, Duration::from_secs(3)),
//!     other => panic!("unexpected state {:?}", other),
//! }
//! ```

mod clock;
mod display;
mod http;
mod memory;
mod retry;

pub use clock::{Clock, ManualClock, TokioClock};
pub use display::{format_markdown, format_table, year_span};
pub use http::{HttpClient, DEFAULT_REQUEST_TIMEOUT};
pub use memory::{humanize_bytes, MemoryMonitor};
pub use retry::{AttemptState, Backoff, PageOutcome, RetryPolicy, BACKOFF_GROWTH};
