use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::pacing::DelayRange;

/// Delay between consecutive attempts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Backoff {
    /// Fresh uniform random delay before every retry
    Uniform(DelayRange),
    /// `base * factor^attempt`, capped at `max`, plus up to `jitter` of itself
    Exponential {
        base_ms: u64,
        factor: f64,
        max_ms: u64,
        jitter: f64,
    },
}

impl Backoff {
    /// Delay to wait after the failed attempt number `attempt` (0-based)
    pub fn delay(&self, attempt: u32) -> Duration {
        match self {
            Backoff::Uniform(range) => range.sample(),
            Backoff::Exponential {
                base_ms,
                factor,
                max_ms,
                jitter,
            } => {
                let exponential = (*base_ms as f64 * factor.powi(attempt as i32)) as u64;
                let capped = exponential.min(*max_ms);
                let jitter_range = (capped as f64 * jitter.clamp(0.0, 1.0)) as u64;
                let jitter = fastrand::u64(0..=jitter_range);
                Duration::from_millis(capped.saturating_add(jitter).min(*max_ms))
            }
        }
    }
}

/// Bounded retry: at most `max_attempts` tries of one operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Backoff::Uniform(DelayRange::from_secs(2, 5)),
        }
    }
}

/// Result of running an operation under a [`RetryPolicy`]
#[derive(Debug)]
pub enum RetryOutcome<T, E> {
    Succeeded { value: T, attempts: u32 },
    Exhausted { attempts: u32, last_error: E },
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Run `operation` until it succeeds or the attempts are used up.
    ///
    /// Every error is treated as retryable. There is no wait after the last
    /// attempt.
    pub async fn run<F, Fut, T, E>(&self, label: &str, mut operation: F) -> RetryOutcome<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            match operation(attempt).await {
                Ok(value) => {
                    if attempt > 0 {
                        info!("{} succeeded after {} retries", label, attempt);
                    }
                    return RetryOutcome::Succeeded {
                        value,
                        attempts: attempt + 1,
                    };
                }
                Err(e) if attempt + 1 < max_attempts => {
                    let delay = self.backoff.delay(attempt);
                    warn!(
                        "{} failed (attempt {}/{}): {}; retrying in {:?}",
                        label,
                        attempt + 1,
                        max_attempts,
                        e,
                        delay
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    debug!("{} failed on final attempt {}: {}", label, attempt + 1, e);
                    return RetryOutcome::Exhausted {
                        attempts: attempt + 1,
                        last_error: e,
                    };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn instant(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Backoff::Uniform(DelayRange::NONE))
    }

    #[test]
    fn test_first_try_success() {
        let outcome = tokio_test::block_on(instant(3).run("op", |_| async { Ok::<_, String>(7) }));
        assert!(matches!(outcome, RetryOutcome::Succeeded { value: 7, attempts: 1 }));
    }

    #[test]
    fn test_succeeds_after_failures() {
        let calls = Cell::new(0);
        let outcome = tokio_test::block_on(instant(3).run("op", |attempt| {
            calls.set(calls.get() + 1);
            async move {
                if attempt < 2 {
                    Err(format!("boom {}", attempt))
                } else {
                    Ok("done")
                }
            }
        }));
        assert_eq!(calls.get(), 3);
        assert!(matches!(outcome, RetryOutcome::Succeeded { value: "done", attempts: 3 }));
    }

    #[test]
    fn test_exhausts_after_max_attempts() {
        let calls = Cell::new(0);
        let outcome = tokio_test::block_on(instant(3).run("op", |attempt| {
            calls.set(calls.get() + 1);
            async move { Err::<(), _>(format!("fail {}", attempt)) }
        }));
        assert_eq!(calls.get(), 3);
        match outcome {
            RetryOutcome::Exhausted {
                attempts,
                last_error,
            } => {
                assert_eq!(attempts, 3);
                assert_eq!(last_error, "fail 2");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_zero_attempts_still_tries_once() {
        let calls = Cell::new(0);
        let policy = RetryPolicy::new(0, Backoff::Uniform(DelayRange::NONE));
        let outcome = tokio_test::block_on(policy.run("op", |_| {
            calls.set(calls.get() + 1);
            async { Err::<(), _>("nope") }
        }));
        assert_eq!(calls.get(), 1);
        assert!(matches!(outcome, RetryOutcome::Exhausted { attempts: 1, .. }));
    }

    #[test]
    fn test_exponential_backoff_is_capped() {
        let backoff = Backoff::Exponential {
            base_ms: 100,
            factor: 2.0,
            max_ms: 1000,
            jitter: 0.0,
        };
        assert_eq!(backoff.delay(0), Duration::from_millis(100));
        assert_eq!(backoff.delay(2), Duration::from_millis(400));
        assert_eq!(backoff.delay(10), Duration::from_millis(1000));
    }

    #[test]
    fn test_exponential_jitter_stays_under_max() {
        let backoff = Backoff::Exponential {
            base_ms: 100,
            factor: 2.0,
            max_ms: 300,
            jitter: 0.5,
        };
        for _ in 0..100 {
            let d = backoff.delay(1);
            assert!(d >= Duration::from_millis(200) && d <= Duration::from_millis(300));
        }
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.backoff, Backoff::Uniform(DelayRange::from_secs(2, 5)));
    }
}
