//! Bounded retry around external calls.

use std::fmt;
use std::future::Future;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// One failed attempt, as logged.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptFailure {
    /// 1-indexed attempt number.
    pub attempt: u32,
    pub detail: String,
}

/// Terminal failure after every allowed attempt failed.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{operation} failed after {attempts} attempt(s): {last_error}")]
pub struct RetryExhausted {
    pub operation: String,
    pub attempts: u32,
    pub last_error: String,
    pub failures: Vec<AttemptFailure>,
}

/// Runs a call up to a fixed number of times with identical inputs.
///
/// Attempts are immediate; there is no backoff.
#[derive(Debug)]
pub struct RetryCoordinator {
    max_attempts: u32,
    failures: Vec<AttemptFailure>,
}

impl RetryCoordinator {
    /// `max_attempts` is clamped to at least one.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            failures: Vec::new(),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Failures recorded by the most recent `run`.
    pub fn failures(&self) -> &[AttemptFailure] {
        &self.failures
    }

    /// Call `call` until it succeeds or the attempt limit is reached.
    pub async fn run<T, E, F, Fut>(
        &mut self,
        operation: &str,
        mut call: F,
    ) -> Result<T, RetryExhausted>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        self.failures.clear();

        for attempt in 1..=self.max_attempts {
            debug!("{}: attempt {}/{}", operation, attempt, self.max_attempts);

            match call().await {
                Ok(value) => {
                    if attempt > 1 {
                        info!("{} succeeded on attempt {}", operation, attempt);
                    }
                    return Ok(value);
                }
                Err(e) => {
                    let detail = e.to_string();
                    warn!(
                        "{} attempt {}/{} failed: {}",
                        operation, attempt, self.max_attempts, detail
                    );
                    self.failures.push(AttemptFailure { attempt, detail });
                }
            }
        }

        let last_error = self
            .failures
            .last()
            .map(|f| f.detail.clone())
            .unwrap_or_default();
        error!(
            "{} failed after {} attempts, giving up",
            operation, self.max_attempts
        );

        Err(RetryExhausted {
            operation: operation.to_string(),
            attempts: self.max_attempts,
            last_error,
            failures: self.failures.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_succeeds_after_two_failures() {
        let calls = Cell::new(0u32);
        let mut coordinator = RetryCoordinator::new(3);

        let result = tokio_test::block_on(coordinator.run("flaky call", || {
            calls.set(calls.get() + 1);
            let n = calls.get();
            async move {
                if n <= 2 {
                    Err(format!("failure {}", n))
                } else {
                    Ok(n)
                }
            }
        }));

        assert_eq!(result, Ok(3));
        assert_eq!(calls.get(), 3);
        assert_eq!(coordinator.failures().len(), 2);
        assert_eq!(coordinator.failures()[0].attempt, 1);
        assert_eq!(coordinator.failures()[1].detail, "failure 2");
    }

    #[test]
    fn test_always_failing_call_is_exhausted() {
        let calls = Cell::new(0u32);
        let mut coordinator = RetryCoordinator::new(3);

        let result: Result<(), _> = tokio_test::block_on(coordinator.run("dead call", || {
            calls.set(calls.get() + 1);
            async { Err("connection refused") }
        }));

        let exhausted = result.unwrap_err();
        assert_eq!(calls.get(), 3);
        assert_eq!(exhausted.attempts, 3);
        assert_eq!(exhausted.operation, "dead call");
        assert_eq!(exhausted.last_error, "connection refused");
        assert_eq!(exhausted.failures.len(), 3);
    }

    #[test]
    fn test_first_success_records_nothing() {
        let mut coordinator = RetryCoordinator::new(3);
        let result =
            tokio_test::block_on(coordinator.run("steady call", || async { Ok::<_, String>(7) }));

        assert_eq!(result, Ok(7));
        assert!(coordinator.failures().is_empty());
    }

    #[test]
    fn test_zero_limit_still_tries_once() {
        let calls = Cell::new(0u32);
        let mut coordinator = RetryCoordinator::new(0);

        let result: Result<(), _> = tokio_test::block_on(coordinator.run("once", || {
            calls.set(calls.get() + 1);
            async { Err("nope") }
        }));

        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
        assert_eq!(coordinator.max_attempts(), 1);
    }

    #[test]
    fn test_failures_reset_between_runs() {
        let mut coordinator = RetryCoordinator::new(2);

        let _ = tokio_test::block_on(
            coordinator.run("first", || async { Err::<(), _>("bad") }),
        );
        assert_eq!(coordinator.failures().len(), 2);

        let _ = tokio_test::block_on(coordinator.run("second", || async { Ok::<_, String>(()) }));
        assert!(coordinator.failures().is_empty());
    }
}
