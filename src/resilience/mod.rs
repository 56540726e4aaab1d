//! Resilience primitives shared by every provider adapter
//!
//! - `rate_limiter`: token bucket for providers with request budgets
//! - `retry`: exponential backoff with jitter
//! - `health`: per-source circuit breaker used by the fallback chain

pub mod rate_limiter;
pub mod retry;
pub mod health;

pub use rate_limiter::{RateLimiter, TokenBucket};
pub use retry::{retry_with_backoff, RetryPolicy};
pub use health::{HealthPolicy, SourceHealth, SourceStatus};
