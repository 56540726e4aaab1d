//! Retry With Exponential Backoff
//!
//! `delay(n) = min(base * multiplier^n, max_delay) * (1 ± jitter)`.
//! Non-retryable errors stop immediately; the last error is returned once
//! attempts run out.

use rand::Rng;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first call
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    /// Fraction of the delay randomized in either direction (0.0..=1.0)
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(4),
            multiplier: 2.0,
            jitter: 0.2,
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no retries
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay before retry number `attempt` (0-based) with `unit` in [-1, 1]
    /// selecting where inside the jitter band the delay lands
    pub fn delay_for(&self, attempt: u32, unit: f64) -> Duration {
        let exponent = attempt.min(i32::MAX as u32) as i32;
        let raw = self.base_delay.as_secs_f64() * self.multiplier.max(1.0).powi(exponent);
        let capped = raw.min(self.max_delay.as_secs_f64());
        let jitter = self.jitter.clamp(0.0, 1.0);
        let factor = 1.0 + jitter * unit.clamp(-1.0, 1.0);
        Duration::from_secs_f64((capped * factor).max(0.0))
    }

    /// Delay before retry number `attempt` with random jitter
    pub fn jittered_delay(&self, attempt: u32) -> Duration {
        let unit = rand::thread_rng().gen_range(-1.0..=1.0);
        self.delay_for(attempt, unit)
    }

    /// Upper bound of any single delay
    pub fn max_jittered_delay(&self) -> Duration {
        self.max_delay.mul_f64(1.0 + self.jitter.clamp(0.0, 1.0))
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or
/// `max_attempts` calls have been made
pub async fn retry_with_backoff<T, E, F, Fut, R>(
    policy: &RetryPolicy,
    label: &str,
    mut op: F,
    is_retryable: R,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
    E: Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match op().await {
            Ok(value) => {
                if attempt > 0 {
                    tracing::debug!("{} succeeded after {} retries", label, attempt);
                }
                return Ok(value);
            }
            Err(e) => {
                attempt += 1;
                if !is_retryable(&e) {
                    tracing::debug!("{} failed with non-retryable error: {}", label, e);
                    return Err(e);
                }
                if attempt >= max_attempts {
                    tracing::warn!("{} failed after {} attempts: {}", label, attempt, e);
                    return Err(e);
                }
                let backoff = policy.jittered_delay(attempt - 1);
                tracing::warn!(
                    "{} failed: {}, backing off for {:?} (attempt {}/{})",
                    label,
                    e,
                    backoff,
                    attempt,
                    max_attempts
                );
                tokio::time::sleep(backoff).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    fn no_jitter() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 4,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(250),
            multiplier: 2.0,
            jitter: 0.0,
        }
    }

    #[test]
    fn test_delay_grows_and_caps() {
        let policy = no_jitter();
        assert_eq!(policy.delay_for(0, 0.0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1, 0.0), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2, 0.0), Duration::from_millis(250));
        assert_eq!(policy.delay_for(40, 0.0), Duration::from_millis(250));
    }

    #[test]
    fn test_jitter_band() {
        let policy = no_jitter().with_jitter(0.5);
        assert_eq!(policy.delay_for(0, -1.0), Duration::from_millis(50));
        assert_eq!(policy.delay_for(0, 1.0), Duration::from_millis(150));
        // unit outside [-1, 1] is clamped
        assert_eq!(policy.delay_for(0, 7.0), Duration::from_millis(150));

        for attempt in 0..10 {
            assert!(policy.jittered_delay(attempt) <= policy.max_jittered_delay());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let result: Result<u32, String> = retry_with_backoff(
            &no_jitter(),
            "test",
            || async {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 { Err(format!("transient {}", n)) } else { Ok(n) }
            },
            |_| true,
        )
        .await;

        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 100ms + 200ms of backoff on the paused clock
        assert!(start.elapsed() >= Duration::from_millis(300));
        assert!(start.elapsed() < Duration::from_millis(350));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_on_non_retryable() {
        let calls = AtomicU32::new(0);

        let result: Result<(), String> = retry_with_backoff(
            &no_jitter(),
            "test",
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("401 unauthorized".to_string())
            },
            |e| !e.starts_with("401"),
        )
        .await;

        assert_eq!(result, Err("401 unauthorized".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);

        let result: Result<(), String> = retry_with_backoff(
            &no_jitter(),
            "test",
            || async {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Err(format!("attempt {}", n))
            },
            |_| true,
        )
        .await;

        assert_eq!(result, Err("attempt 4".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_attempts_still_calls_once() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::none().with_max_attempts(0);

        let _: Result<(), String> = retry_with_backoff(
            &policy,
            "test",
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("boom".to_string())
            },
            |_| true,
        )
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
