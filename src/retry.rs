// src/retry.rs
//
// Bounded retry with a constant pause between attempts.

use crate::settings::Settings;
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio_retry::strategy::FixedInterval;
use tokio_retry::RetryIf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// `max_attempts` counts the first try; it is clamped to at least 1.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.fetch.max_attempts, settings.fetch.retry_delay())
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Runs `action` until it succeeds, `retryable` rejects the error, or
    /// `max_attempts` is reached. The action receives the 1-based attempt number.
    pub async fn run<T, E, F, Fut, R>(&self, mut action: F, retryable: R) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        R: FnMut(&E) -> bool,
    {
        let attempt = AtomicU32::new(0);
        let strategy =
            FixedInterval::new(self.delay).take(self.max_attempts.saturating_sub(1) as usize);

        RetryIf::spawn(
            strategy,
            || action(attempt.fetch_add(1, Ordering::Relaxed) + 1),
            retryable,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn test_always_failing_action_runs_max_attempts() {
        let calls = AtomicUsize::new(0);
        let policy = RetryPolicy::new(4, Duration::from_millis(1));

        let result: Result<(), &str> = policy
            .run(
                |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err("boom") }
                },
                |_| true,
            )
            .await;

        assert_eq!(result, Err("boom"));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_non_retryable_error_stops_immediately() {
        let calls = AtomicUsize::new(0);
        let policy = RetryPolicy::new(5, Duration::from_millis(1));

        let result: Result<(), &str> = policy
            .run(
                |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err("fatal") }
                },
                |_| false,
            )
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_succeeds_on_third_attempt() {
        let policy = RetryPolicy::new(5, Duration::from_millis(1));
        let mut seen = Vec::new();

        let result: Result<u32, &str> = policy
            .run(
                |attempt| {
                    seen.push(attempt);
                    async move {
                        if attempt < 3 {
                            Err("not yet")
                        } else {
                            Ok(attempt)
                        }
                    }
                },
                |_| true,
            )
            .await;

        assert_eq!(result, Ok(3));
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[test]
    fn test_zero_attempts_is_clamped() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts(), 1);
    }
}
