//! Token Bucket Rate Limiter
//!
//! Gates outbound calls to providers with published request budgets
//! (DexScreener allows 300 requests per minute). The bucket starts full,
//! refills continuously and never holds more than `capacity` permits.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Floor for the refill rate so wait times stay finite
const MIN_REFILL_PER_SEC: f64 = 0.001;

#[derive(Debug, Clone)]
pub struct TokenBucket {
    capacity: f64,
    tokens: f64,
    refill_per_sec: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// Create a full bucket
    pub fn new(capacity: u32, refill_per_sec: f64) -> Self {
        Self::starting_at(capacity, refill_per_sec, Instant::now())
    }

    pub fn starting_at(capacity: u32, refill_per_sec: f64, now: Instant) -> Self {
        let capacity = capacity.max(1) as f64;
        Self {
            capacity,
            tokens: capacity,
            refill_per_sec: refill_per_sec.max(MIN_REFILL_PER_SEC),
            last_refill: now,
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill);
        if elapsed.is_zero() {
            return;
        }
        self.tokens = (self.tokens + elapsed.as_secs_f64() * self.refill_per_sec).min(self.capacity);
        self.last_refill = now;
    }

    /// Take one permit, or report how long until one is available
    pub fn try_acquire_at(&mut self, now: Instant) -> Result<(), Duration> {
        self.refill(now);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            Ok(())
        } else {
            let deficit = 1.0 - self.tokens;
            Err(Duration::from_secs_f64(deficit / self.refill_per_sec))
        }
    }

    /// Permits available at `now` (fractional)
    pub fn available_at(&mut self, now: Instant) -> f64 {
        self.refill(now);
        self.tokens
    }

    pub fn capacity(&self) -> u32 {
        self.capacity as u32
    }

    pub fn refill_per_sec(&self) -> f64 {
        self.refill_per_sec
    }
}

/// Shared async rate limiter
#[derive(Debug)]
pub struct RateLimiter {
    name: &'static str,
    bucket: Mutex<TokenBucket>,
}

impl RateLimiter {
    pub fn new(name: &'static str, capacity: u32, refill_per_sec: f64) -> Self {
        Self {
            name,
            bucket: Mutex::new(TokenBucket::new(capacity, refill_per_sec)),
        }
    }

    /// Requests per minute expressed as a bucket that allows short bursts
    pub fn per_minute(name: &'static str, rpm: u32, burst: u32) -> Self {
        Self::new(name, burst, rpm as f64 / 60.0)
    }

    /// Wait until a permit is available, then take it
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut bucket = self.bucket.lock().await;
                match bucket.try_acquire_at(Instant::now()) {
                    Ok(()) => return,
                    Err(wait) => wait,
                }
            };
            tracing::debug!("{} rate limit reached, waiting {:?}", self.name, wait);
            tokio::time::sleep(wait).await;
        }
    }

    /// Take a permit only if one is available right now
    pub async fn try_acquire(&self) -> bool {
        self.bucket.lock().await.try_acquire_at(Instant::now()).is_ok()
    }

    pub async fn available(&self) -> f64 {
        self.bucket.lock().await.available_at(Instant::now())
    }
}
