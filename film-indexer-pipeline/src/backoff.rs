//! Exponential backoff with an injectable sleep.
//!
//! Delays follow `start, start·factor, start·factor², …` clamped at `cap`.
//! Retries never give up: a sync process that cannot reach its dependencies
//! keeps trying slowly instead of exiting.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

/// Backoff parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffConfig {
    /// First delay.
    pub start: Duration,
    /// Multiplier applied after each failure.
    pub factor: f64,
    /// Upper bound for any delay.
    pub cap: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            start: Duration::from_millis(100),
            factor: 2.0,
            cap: Duration::from_secs(10),
        }
    }
}

/// Sequence of delays for one failure streak.
#[derive(Debug, Clone)]
pub struct Backoff {
    config: BackoffConfig,
    next: Duration,
}

impl Backoff {
    pub fn new(config: BackoffConfig) -> Self {
        Self {
            next: config.start.min(config.cap),
            config,
        }
    }

    /// Delay to wait before the next attempt.
    pub fn next_delay(&mut self) -> Duration {
        let current = self.next;
        let scaled_nanos = (current.as_nanos() as f64 * self.config.factor).round() as u64;
        self.next = Duration::from_nanos(scaled_nanos).min(self.config.cap);
        current
    }
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        Some(self.next_delay())
    }
}

/// Something that can wait. Tests substitute one that records delays.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Run `operation` until it succeeds, sleeping with backoff between failures.
pub async fn retry_with_backoff<T, E, F, Fut>(
    config: BackoffConfig,
    sleeper: &dyn Sleeper,
    operation_name: &str,
    mut operation: F,
) -> T
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut backoff = Backoff::new(config);
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    info!(
                        operation = operation_name,
                        attempt = attempt,
                        "Succeeded after retry"
                    );
                }
                return value;
            }
            Err(e) => {
                let delay = backoff.next_delay();
                warn!(
                    operation = operation_name,
                    attempt = attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Operation failed, retrying"
                );
                sleeper.sleep(delay).await;
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::RecordingSleeper;
    use super::*;

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[test]
    fn test_backoff_sequence_is_clamped() {
        let delays: Vec<Duration> = Backoff::new(BackoffConfig::default()).take(11).collect();

        assert_eq!(
            delays,
            vec![
                ms(100),
                ms(200),
                ms(400),
                ms(800),
                ms(1600),
                ms(3200),
                ms(6400),
                ms(10_000),
                ms(10_000),
                ms(10_000),
                ms(10_000),
            ]
        );
    }

    #[test]
    fn test_start_above_cap_is_clamped() {
        let mut backoff = Backoff::new(BackoffConfig {
            start: Duration::from_secs(30),
            factor: 2.0,
            cap: Duration::from_secs(5),
        });

        assert_eq!(backoff.next_delay(), Duration::from_secs(5));
        assert_eq!(backoff.next_delay(), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_retry_until_success() {
        let sleeper = RecordingSleeper::default();
        let mut failures_left = 9;

        let value = retry_with_backoff(BackoffConfig::default(), &sleeper, "flaky", || {
            let fail = failures_left > 0;
            failures_left -= if fail { 1 } else { 0 };
            async move {
                if fail {
                    Err("connection refused")
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(value, 42);
        let delays = sleeper.delays();
        assert_eq!(delays.len(), 9);
        assert_eq!(delays[0], ms(100));
        assert_eq!(delays[6], ms(6400));
        assert_eq!(delays[7], ms(10_000));
        assert_eq!(delays[8], ms(10_000));
    }

    #[tokio::test]
    async fn test_no_sleep_on_first_success() {
        let sleeper = RecordingSleeper::default();

        let value: u8 =
            retry_with_backoff(BackoffConfig::default(), &sleeper, "steady", || async {
                Ok::<_, String>(7)
            })
            .await;

        assert_eq!(value, 7);
        assert!(sleeper.delays().is_empty());
    }
}
