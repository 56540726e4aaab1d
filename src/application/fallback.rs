//! Cache-or-fetch with an ordered fallback chain
//!
//! A chain is a list of `(source, future)` attempts. Futures are inert until
//! polled, so sources after the first success never see a request.

use futures::future::BoxFuture;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::cache::TtlCache;
use crate::domain::DataSource;
use crate::ports::MarketDataError;
use crate::resilience::SourceHealth;

pub type SourceFuture<'a, T> = BoxFuture<'a, Result<T, MarketDataError>>;

/// One failed attempt in a chain
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptFailure {
    pub provider: DataSource,
    pub error: MarketDataError,
}

pub struct FallbackChain<'a, T> {
    label: String,
    attempts: Vec<(DataSource, SourceFuture<'a, T>)>,
}

impl<'a, T> FallbackChain<'a, T> {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            attempts: Vec::new(),
        }
    }

    /// Builder method: append an attempt
    pub fn attempt(mut self, provider: DataSource, future: SourceFuture<'a, T>) -> Self {
        self.push(provider, future);
        self
    }

    pub fn push(&mut self, provider: DataSource, future: SourceFuture<'a, T>) {
        self.attempts.push((provider, future));
    }

    pub fn len(&self) -> usize {
        self.attempts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Try each attempt in order and return the first success
    ///
    /// Benched sources are skipped without being polled. `Unsupported` is
    /// skipped silently and `NotFound` does not count against the source.
    pub async fn run(self, health: &SourceHealth) -> Result<(DataSource, T), Vec<AttemptFailure>> {
        let mut failures = Vec::new();

        for (provider, future) in self.attempts {
            if !health.is_available(provider) {
                debug!("{}: skipping {} (cooling down)", self.label, provider);
                continue;
            }

            match future.await {
                Ok(value) => {
                    health.record_success(provider);
                    debug!("{}: served by {}", self.label, provider);
                    return Ok((provider, value));
                }
                Err(e) if e.is_unsupported() => {
                    debug!("{}: {}", self.label, e);
                }
                Err(e) => {
                    if e.is_source_failure() {
                        warn!("{}: {} failed: {}", self.label, provider, e);
                        health.record_failure(provider, &e.to_string());
                    } else {
                        debug!("{}: {}: {}", self.label, provider, e);
                    }
                    failures.push(AttemptFailure { provider, error: e });
                }
            }
        }

        Err(failures)
    }
}

/// Cached value if fresh, else the first chain success (cached), else the
/// placeholder (not cached, so the next call retries live sources)
pub async fn cache_or_fetch<'a, T, P>(
    cache: &Mutex<TtlCache<String, T>>,
    key: &str,
    chain: FallbackChain<'a, T>,
    health: &SourceHealth,
    placeholder: P,
) -> T
where
    T: Clone,
    P: FnOnce() -> T,
{
    if let Some(hit) = cache.lock().await.get(&key.to_string()) {
        debug!("cache hit: {}", key);
        return hit;
    }

    let label = chain.label().to_string();
    match chain.run(health).await {
        Ok((_, value)) => {
            cache.lock().await.insert(key.to_string(), value.clone());
            value
        }
        Err(failures) => {
            if failures.is_empty() {
                debug!("{}: no source available, using placeholder", label);
            } else {
                warn!(
                    "{}: all {} attempted sources failed, using placeholder",
                    label,
                    failures.len()
                );
            }
            placeholder()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::HealthPolicy;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn ok(value: u32) -> SourceFuture<'static, u32> {
        Box::pin(async move { Ok(value) })
    }

    fn fail(error: MarketDataError) -> SourceFuture<'static, u32> {
        Box::pin(async move { Err(error) })
    }

    fn counted<'a>(counter: &'a AtomicUsize, value: u32) -> SourceFuture<'a, u32> {
        Box::pin(async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(value)
        })
    }

    #[tokio::test]
    async fn test_first_success_wins_and_later_sources_untouched() {
        let health = SourceHealth::default();
        let later = AtomicUsize::new(0);

        let chain = FallbackChain::new("test")
            .attempt(DataSource::Birdeye, fail(MarketDataError::Timeout))
            .attempt(DataSource::DexScreener, ok(7))
            .attempt(DataSource::Kraken, counted(&later, 9));

        let (provider, value) = chain.run(&health).await.unwrap();
        assert_eq!(provider, DataSource::DexScreener);
        assert_eq!(value, 7);
        assert_eq!(later.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unsupported_is_not_a_failure() {
        let health = SourceHealth::new(HealthPolicy {
            failure_threshold: 1,
            cooldown: Duration::from_secs(60),
        });

        let chain = FallbackChain::new("test")
            .attempt(DataSource::Kraken, fail(MarketDataError::unsupported(DataSource::Kraken, "price")))
            .attempt(DataSource::Birdeye, fail(MarketDataError::RateLimited));

        let failures = chain.run(&health).await.unwrap_err();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].provider, DataSource::Birdeye);
        assert!(health.is_available(DataSource::Kraken));
        assert!(!health.is_available(DataSource::Birdeye));
    }

    #[tokio::test]
    async fn test_not_found_does_not_bench_source() {
        let health = SourceHealth::new(HealthPolicy {
            failure_threshold: 1,
            cooldown: Duration::from_secs(60),
        });

        let chain = FallbackChain::new("test")
            .attempt(DataSource::Birdeye, fail(MarketDataError::NotFound("mint".into())))
            .attempt(DataSource::Kraken, ok(3));

        let (provider, _) = chain.run(&health).await.unwrap();
        assert_eq!(provider, DataSource::Kraken);
        assert!(health.is_available(DataSource::Birdeye));
    }

    #[tokio::test]
    async fn test_benched_source_is_not_polled() {
        let health = SourceHealth::new(HealthPolicy {
            failure_threshold: 1,
            cooldown: Duration::from_secs(60),
        });
        health.record_failure(DataSource::Birdeye, "down");
        let polled = AtomicUsize::new(0);

        let chain = FallbackChain::new("test")
            .attempt(DataSource::Birdeye, counted(&polled, 1))
            .attempt(DataSource::Kraken, ok(2));

        let (provider, _) = chain.run(&health).await.unwrap();
        assert_eq!(provider, DataSource::Kraken);
        assert_eq!(polled.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cache_or_fetch_caches_success() {
        let cache = Mutex::new(TtlCache::with_config(Duration::from_secs(30), 10));
        let health = SourceHealth::default();
        let calls = AtomicUsize::new(0);

        let first = cache_or_fetch(
            &cache,
            "k",
            FallbackChain::new("test").attempt(DataSource::Birdeye, counted(&calls, 5)),
            &health,
            || 0,
        )
        .await;
        let second = cache_or_fetch(
            &cache,
            "k",
            FallbackChain::new("test").attempt(DataSource::Birdeye, counted(&calls, 6)),
            &health,
            || 0,
        )
        .await;

        assert_eq!(first, 5);
        assert_eq!(second, 5);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_placeholder_is_not_cached() {
        let cache = Mutex::new(TtlCache::with_config(Duration::from_secs(30), 10));
        let health = SourceHealth::default();

        let value = cache_or_fetch(
            &cache,
            "k",
            FallbackChain::new("test").attempt(DataSource::Birdeye, fail(MarketDataError::Timeout)),
            &health,
            || 42,
        )
        .await;

        assert_eq!(value, 42);
        assert!(cache.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_empty_chain_yields_placeholder() {
        let cache: Mutex<TtlCache<String, u32>> = Mutex::new(TtlCache::new());
        let health = SourceHealth::default();

        let value = cache_or_fetch(&cache, "k", FallbackChain::new("test"), &health, || 1).await;
        assert_eq!(value, 1);
    }
}
