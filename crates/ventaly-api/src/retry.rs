// ── Timeout retry ──
//
// Venta firmware regularly drops a request on the floor while it is busy
// rewriting its own state, so every exchange is re-attempted on timeout.
// Any other failure is surfaced at once.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::Error;

/// How many times, and how patiently, a single logical request is attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero behaves like one.
    pub max_attempts: u32,
    /// Budget for each individual attempt.
    pub attempt_timeout: Duration,
    /// Pause between a timed-out attempt and the next one.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            attempt_timeout: Duration::from_secs(10),
            delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// A policy that tries exactly once with the given budget.
    pub fn single(attempt_timeout: Duration) -> Self {
        Self {
            max_attempts: 1,
            attempt_timeout,
            delay: Duration::ZERO,
        }
    }

    /// Run `op` until it completes without timing out.
    ///
    /// Returns `Ok(None)` when every attempt timed out. Errors that are not
    /// timeouts propagate from the attempt that produced them.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<Option<T>, Error>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>, Error>>,
    {
        let attempts = self.max_attempts.max(1);

        for attempt in 1..=attempts {
            match tokio::time::timeout(self.attempt_timeout, op()).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) if e.is_timeout() => {
                    warn!(what, attempt, attempts, error = %e, "request timed out");
                }
                Ok(Err(e)) => return Err(e),
                Err(_) => {
                    warn!(
                        what,
                        attempt,
                        attempts,
                        timeout_ms = self.attempt_timeout.as_millis(),
                        "request timed out"
                    );
                }
            }

            if attempt < attempts && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        }

        debug!(what, attempts, "giving up after repeated timeouts");
        Ok(None)
    }
}
