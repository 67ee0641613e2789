//! Bounded retry for upstream calls.
//!
//! The delay schedule is fixed rather than computed, and sleeping goes
//! through [`Sleeper`] so tests can record the delays instead of waiting.

use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

/// Retry configuration: how many attempts, and what to wait between them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Zero is treated as one.
    pub max_attempts: u32,
    /// Delay after failed attempt `n` is `schedule[n - 1]`; the last entry repeats.
    pub schedule: Vec<Duration>,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// No retries at all.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            schedule: Vec::new(),
        }
    }

    fn delay_after(&self, attempt: u32) -> Duration {
        let idx = attempt.saturating_sub(1) as usize;
        self.schedule
            .get(idx)
            .or_else(|| self.schedule.last())
            .copied()
            .unwrap_or_default()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            schedule: [500u64, 1000, 2000]
                .into_iter()
                .map(Duration::from_millis)
                .collect(),
        }
    }
}

pub trait Sleeper: Send + Sync {
    fn sleep(&self, delay: Duration) -> BoxFuture<'_, ()>;
}

/// Real sleeper backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, delay: Duration) -> BoxFuture<'_, ()> {
        Box::pin(tokio::time::sleep(delay))
    }
}

/// Returns immediately and remembers every requested delay.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delays(&self) -> Vec<Duration> {
        self.delays
            .lock()
            .map(|d| d.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, delay: Duration) -> BoxFuture<'_, ()> {
        match self.delays.lock() {
            Ok(mut d) => d.push(delay),
            Err(poisoned) => poisoned.into_inner().push(delay),
        }
        Box::pin(std::future::ready(()))
    }
}

/// Run `op` until it succeeds, `should_retry` rejects the error, or the
/// policy runs out of attempts. `op` receives the 1-based attempt number.
///
/// The last error is returned unchanged.
pub async fn with_retry<T, E, F, Fut, R>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    should_retry: R,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < max_attempts && should_retry(&e) => {
                let delay = policy.delay_after(attempt);
                tracing::warn!(
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "upstream call failed, retrying"
                );
                sleeper.sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_fail_twice_then_succeed() {
        let sleeper = RecordingSleeper::new();
        let calls = AtomicU32::new(0);

        let result: Result<&str, String> = with_retry(
            &RetryPolicy::default(),
            &sleeper,
            |_| true,
            |_| {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n < 3 {
                        Err(format!("transient failure {n}"))
                    } else {
                        Ok("ok")
                    }
                }
            },
        )
        .await;

        assert_eq!(result, Ok("ok"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            sleeper.delays(),
            vec![Duration::from_millis(500), Duration::from_millis(1000)]
        );
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let sleeper = RecordingSleeper::new();
        let calls = AtomicU32::new(0);

        let result: Result<(), String> = with_retry(
            &RetryPolicy::default(),
            &sleeper,
            |_| true,
            |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Err(format!("failure on attempt {attempt}")) }
            },
        )
        .await;

        assert_eq!(result, Err("failure on attempt 3".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(sleeper.delays().len(), 2);
    }

    #[tokio::test]
    async fn test_non_retryable_error_stops_immediately() {
        let sleeper = RecordingSleeper::new();
        let calls = AtomicU32::new(0);

        let result: Result<(), String> = with_retry(
            &RetryPolicy::default(),
            &sleeper,
            |e: &String| !e.starts_with("4"),
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("400 bad request".to_string()) }
            },
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(sleeper.delays().is_empty());
    }

    #[tokio::test]
    async fn test_last_delay_repeats() {
        let sleeper = RecordingSleeper::new();
        let _: Result<(), String> = with_retry(
            &RetryPolicy::new(5),
            &sleeper,
            |_| true,
            |_| async { Err("down".to_string()) },
        )
        .await;

        let ms: Vec<u128> = sleeper.delays().iter().map(|d| d.as_millis()).collect();
        assert_eq!(ms, vec![500, 1000, 2000, 2000]);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_calls_once() {
        let sleeper = RecordingSleeper::new();
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy {
            max_attempts: 0,
            schedule: vec![],
        };
        let result: Result<u8, String> = with_retry(&policy, &sleeper, |_| true, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(7) }
        })
        .await;
        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
