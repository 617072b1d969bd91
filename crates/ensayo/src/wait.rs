//! Bounded condition polling.
//!
//! Every bounded operation in the crate runs the same loop: evaluate a
//! condition at a fixed interval until it holds or the wait-policy bound
//! elapses. Only the condition predicate varies per operation; the caller
//! decides what a timeout means (typed failure for hard operations, `false`
//! for soft queries).

use std::time::{Duration, Instant};

use crate::result::EnsayoResult;

/// Default wait bound (10 seconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Default polling interval (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Per-proxy wait configuration. Immutable for the proxy's lifetime; a
/// per-call override is expressed by copying and adjusting the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    /// Upper bound for every bounded operation, in milliseconds
    pub timeout_ms: u64,
    /// Interval between condition evaluations, in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitPolicy {
    /// Create a policy with default bounds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the wait bound in milliseconds.
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set the polling interval in milliseconds.
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Wait bound as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Polling interval as a [`Duration`].
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Outcome of one bounded poll loop.
#[derive(Debug, Clone, Copy)]
pub struct PollResult {
    /// Whether the condition held before the bound elapsed
    pub satisfied: bool,
    /// Time spent polling
    pub elapsed: Duration,
}

/// Evaluate `condition` at the policy's interval until it holds or the bound
/// elapses. The condition is always evaluated at least once, so a bound of
/// zero still observes an already-true condition.
///
/// # Errors
///
/// Propagates the first error the condition itself returns.
pub fn poll_until<F>(policy: &WaitPolicy, mut condition: F) -> EnsayoResult<PollResult>
where
    F: FnMut() -> EnsayoResult<bool>,
{
    let start = Instant::now();
    loop {
        if condition()? {
            return Ok(PollResult {
                satisfied: true,
                elapsed: start.elapsed(),
            });
        }
        if start.elapsed() >= policy.timeout() {
            return Ok(PollResult {
                satisfied: false,
                elapsed: start.elapsed(),
            });
        }
        std::thread::sleep(policy.poll_interval());
    }
}
