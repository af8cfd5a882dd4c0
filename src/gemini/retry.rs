//! Retry with linear backoff for transient upstream failures.
//!
//! The retry loop only knows whether an error is transient; it has no idea
//! which credential (if any) the work uses.

use std::future::Future;
use std::time::Duration;

/// Attempts per credential when rotating keys.
pub const ROTATION_ATTEMPTS: u32 = 2;

/// Attempt budget for standalone use.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Base delay for linear backoff (2 seconds).
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(2000);

/// Errors that can tell whether repeating the same work may succeed.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

/// Attempt budget and backoff base for [`retry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total invocations, including the first one.
    pub max_attempts: u32,
    /// Delay multiplied by the attempt index between transient failures.
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Delay after the given failed attempt (1-based): 2s, 4s, 6s, ...
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(ROTATION_ATTEMPTS, DEFAULT_BACKOFF_BASE)
    }
}

/// Outcome of a failed [`retry`].
#[derive(Debug, thiserror::Error)]
pub enum RetryError<E> {
    /// Every attempt failed transiently.
    #[error("{label} failed after {attempts} attempts: {last}")]
    Exhausted {
        label: String,
        attempts: u32,
        last: E,
    },

    /// A non-transient error, returned without further attempts.
    #[error("{0}")]
    Fatal(E),
}

impl<E> RetryError<E> {
    /// The underlying error of the last attempt.
    pub fn into_inner(self) -> E {
        match self {
            RetryError::Exhausted { last, .. } => last,
            RetryError::Fatal(e) => e,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, RetryError::Exhausted { .. })
    }
}

/// Run `operation` until it succeeds, fails fatally, or the budget is spent.
///
/// Sleeps `policy.backoff(n)` after the n-th transient failure. A zero budget
/// still runs the operation once.
pub async fn retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut operation: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Transient + std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) if error.is_transient() => {
                if attempt >= max_attempts {
                    log::error!(
                        "{} failed after {} attempts. Giving up. Error: {}",
                        label,
                        attempt,
                        error
                    );
                    return Err(RetryError::Exhausted {
                        label: label.to_string(),
                        attempts: attempt,
                        last: error,
                    });
                }

                let delay = policy.backoff(attempt);
                log::warn!(
                    "{} transient failure (attempt {}/{}): {}. Retrying in {:?}...",
                    label,
                    attempt,
                    max_attempts,
                    error,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(error) => return Err(RetryError::Fatal(error)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use tokio::time::Instant;

    #[derive(Debug)]
    struct FakeError(bool);

    impl std::fmt::Display for FakeError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            if self.0 {
                write!(f, "fetch failed")
            } else {
                write!(f, "bad request")
            }
        }
    }

    impl Transient for FakeError {
        fn is_transient(&self) -> bool {
            self.0
        }
    }

    #[test]
    fn test_backoff_is_linear() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_millis(2000));
        assert_eq!(policy.backoff(2), Duration::from_millis(4000));
        assert_eq!(policy.backoff(3), Duration::from_millis(6000));
    }

    #[test]
    fn test_default_retry_constants() {
        assert_eq!(ROTATION_ATTEMPTS, 2);
        assert_eq!(DEFAULT_MAX_ATTEMPTS, 3);
        assert_eq!(DEFAULT_BACKOFF_BASE, Duration::from_secs(2));
        assert_eq!(RetryPolicy::default().max_attempts, ROTATION_ATTEMPTS);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_on_first_attempt_does_not_sleep() {
        let calls = Cell::new(0);
        let start = Instant::now();
        let result: Result<u32, RetryError<FakeError>> =
            retry(&RetryPolicy::default(), "op", || {
                calls.set(calls.get() + 1);
                async { Ok(7) }
            })
            .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.get(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_back_off_with_increasing_delays() {
        let policy = RetryPolicy::new(4, DEFAULT_BACKOFF_BASE);
        let start = Instant::now();
        let stamps = RefCell::new(Vec::new());

        let result: Result<(), RetryError<FakeError>> = retry(&policy, "images", || {
            stamps.borrow_mut().push(start.elapsed());
            async { Err(FakeError(true)) }
        })
        .await;

        let stamps = stamps.into_inner();
        assert_eq!(stamps.len(), 4);
        let gaps: Vec<Duration> = stamps.windows(2).map(|w| w[1] - w[0]).collect();
        assert_eq!(
            gaps,
            vec![
                Duration::from_millis(2000),
                Duration::from_millis(4000),
                Duration::from_millis(6000)
            ]
        );

        match result {
            Err(RetryError::Exhausted {
                label, attempts, ..
            }) => {
                assert_eq!(label, "images");
                assert_eq!(attempts, 4);
            }
            other => panic!("Expected Exhausted, got {:?}", other),
        }
        // No sleep after the final attempt.
        assert_eq!(start.elapsed(), Duration::from_millis(12000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_error_is_not_retried() {
        let calls = Cell::new(0);
        let start = Instant::now();
        let result: Result<(), RetryError<FakeError>> =
            retry(&RetryPolicy::new(5, DEFAULT_BACKOFF_BASE), "op", || {
                calls.set(calls.get() + 1);
                async { Err(FakeError(false)) }
            })
            .await;

        assert!(matches!(result, Err(RetryError::Fatal(FakeError(false)))));
        assert_eq!(calls.get(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_failure() {
        let calls = Cell::new(0);
        let result: Result<&str, RetryError<FakeError>> =
            retry(&RetryPolicy::new(3, Duration::from_millis(10)), "op", || {
                calls.set(calls.get() + 1);
                let n = calls.get();
                async move {
                    if n < 3 {
                        Err(FakeError(true))
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_budget_still_runs_once() {
        let calls = Cell::new(0);
        let result: Result<(), RetryError<FakeError>> =
            retry(&RetryPolicy::new(0, DEFAULT_BACKOFF_BASE), "op", || {
                calls.set(calls.get() + 1);
                async { Err(FakeError(true)) }
            })
            .await;
        assert_eq!(calls.get(), 1);
        assert!(result.unwrap_err().is_exhausted());
    }

    #[test]
    fn test_exhausted_error_display() {
        let error = RetryError::Exhausted {
            label: "API call".to_string(),
            attempts: 2,
            last: FakeError(true),
        };
        assert_eq!(
            error.to_string(),
            "API call failed after 2 attempts: fetch failed"
        );
        assert!(matches!(error.into_inner(), FakeError(true)));
    }
}
