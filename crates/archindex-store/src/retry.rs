//! Bounded exponential backoff for vector-store writes.

use archindex_core::{IndexerError, StoreConfig};
use std::time::Duration;

/// Retry policy shared by every mutating store call.
///
/// Only [`IndexerError::is_transient`] failures are retried; anything else
/// is returned on the first attempt.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero is treated as one.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub base_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &StoreConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
            ..Self::default()
        }
    }

    /// Single attempt, no sleeping.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            multiplier: 1.0,
        }
    }

    /// Delay after the given failed attempt (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.powi(attempt.saturating_sub(1) as i32);
        let secs = (self.base_delay.as_secs_f64() * factor).min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(secs.max(0.0))
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    pub fn run<T, F>(&self, operation: &str, mut op: F) -> Result<T, IndexerError>
    where
        F: FnMut() -> Result<T, IndexerError>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match op() {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::debug!(
                            "{} succeeded on attempt {}/{}",
                            operation,
                            attempt,
                            max_attempts
                        );
                    }
                    return Ok(value);
                }
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) if attempt >= max_attempts => {
                    tracing::error!(
                        "{} failed after {} attempts: {}",
                        operation,
                        max_attempts,
                        e
                    );
                    return Err(e);
                }
                Err(e) => {
                    let delay = self.delay_for(attempt);
                    tracing::warn!(
                        "{} failed on attempt {}/{}: {} (retrying in {:?})",
                        operation,
                        attempt,
                        max_attempts,
                        e,
                        delay
                    );
                    std::thread::sleep(delay);
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            multiplier: 2.0,
        }
    }

    #[test]
    fn succeeds_after_transient_failures() {
        let calls = Cell::new(0);
        let result = fast(3).run("upsert", || {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err(IndexerError::Transient("connection refused".into()))
            } else {
                Ok(42)
            }
        });
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn gives_up_after_max_attempts() {
        let calls = Cell::new(0);
        let result: Result<(), _> = fast(3).run("upsert", || {
            calls.set(calls.get() + 1);
            Err(IndexerError::Transient("timeout".into()))
        });
        assert!(matches!(result, Err(IndexerError::Transient(_))));
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn permanent_errors_are_not_retried() {
        let calls = Cell::new(0);
        let result: Result<(), _> = fast(5).run("upsert", || {
            calls.set(calls.get() + 1);
            Err(IndexerError::Storage("400 Bad Request".into()))
        });
        assert!(matches!(result, Err(IndexerError::Storage(_))));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn zero_attempts_still_runs_once() {
        let calls = Cell::new(0);
        let _ = fast(0).run("delete", || {
            calls.set(calls.get() + 1);
            Err::<(), _>(IndexerError::Transient("down".into()))
        });
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn delay_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for(2), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(10), Duration::from_secs(10));
    }

    #[test]
    fn from_config_uses_store_settings() {
        let config = StoreConfig {
            max_attempts: 5,
            retry_base_delay_ms: 250,
            ..StoreConfig::default()
        };
        let policy = RetryPolicy::from_config(&config);
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.base_delay, Duration::from_millis(250));
    }
}
