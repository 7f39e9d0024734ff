//! Retry state machine with sub-exponential backoff for insufficient pages.
//!
//! The remote source sometimes under-delivers a page even though more results
//! exist. Each page request goes through the states below; the caller performs
//! the actual fetch and sleep and reports outcomes back.
//!
//! ```text
//! Idle --begin--> Fetching(1)
//! Fetching(n) --sufficient--> Succeeded(n)
//! Fetching(n) --insufficient, n < max--> Waiting(n, delay) --resume--> Fetching(n + 1)
//! Fetching(n) --insufficient, n = max--> ExhaustedRetries(n)
//! ```

use std::time::Duration;

/// Interval growth per insufficient attempt: 1 + 1/e
pub const BACKOFF_GROWTH: f64 = 1.0 + 1.0 / std::f64::consts::E;

/// Configuration for retry behavior
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts per page, including the first
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_interval: Duration,
    /// Multiplier applied to the interval after every wait
    pub growth_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_interval: Duration::from_secs(3),
            growth_factor: BACKOFF_GROWTH,
        }
    }
}

impl RetryPolicy {
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn initial_interval(mut self, interval: Duration) -> Self {
        self.initial_interval = interval;
        self
    }
}

/// Whether a page met its expected minimum count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    Sufficient,
    Insufficient,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    Idle,
    Fetching { attempt: u32 },
    Waiting { attempt: u32, delay: Duration },
    Succeeded { attempt: u32 },
    ExhaustedRetries { attempts: u32 },
}

/// Per-pagination-run backoff state.
///
/// The escalated interval survives across pages of the same run and doubles
/// as the minimum spacing between consecutive requests.
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: RetryPolicy,
    interval: Duration,
    state: AttemptState,
}

impl Backoff {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            interval: policy.initial_interval,
            policy,
            state: AttemptState::Idle,
        }
    }

    /// Current retry interval
    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn state(&self) -> AttemptState {
        self.state
    }

    /// Start the attempts for a new page
    pub fn begin(&mut self) -> AttemptState {
        self.state = AttemptState::Fetching { attempt: 1 };
        self.state
    }

    /// Report the outcome of the attempt in flight
    pub fn record(&mut self, outcome: PageOutcome) -> AttemptState {
        let AttemptState::Fetching { attempt } = self.state else {
            return self.state;
        };

        self.state = match outcome {
            PageOutcome::Sufficient => AttemptState::Succeeded { attempt },
            PageOutcome::Insufficient if attempt >= self.policy.max_attempts.max(1) => {
                AttemptState::ExhaustedRetries { attempts: attempt }
            }
            PageOutcome::Insufficient => {
                let delay = self.interval;
                self.interval = self.interval.mul_f64(self.policy.growth_factor);
                AttemptState::Waiting { attempt, delay }
            }
        };
        self.state
    }

    /// Leave the waiting state once the delay has elapsed
    pub fn resume(&mut self) -> AttemptState {
        if let AttemptState::Waiting { attempt, .. } = self.state {
            self.state = AttemptState::Fetching {
                attempt: attempt + 1,
            };
        }
        self.state
    }
}
