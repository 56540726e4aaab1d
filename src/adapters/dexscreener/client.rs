//! DexScreener API Client
//!
//! Keyless, but limited to 300 requests per minute; every request waits on
//! a shared token bucket before it is sent.

use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use tracing::debug;

use crate::adapters::http::{build_client, send_json};
use crate::domain::{DataSource, PriceQuote, TokenInfo, TokenPair};
use crate::ports::{MarketDataError, MarketDataSource};
use crate::resilience::{retry_with_backoff, RateLimiter, RetryPolicy};

use super::types::{quote_from_pair, token_from_pair, DexPair, DexTokenPairs};

#[derive(Debug, Clone)]
pub struct DexScreenerConfig {
    pub api_url: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
    pub requests_per_minute: u32,
    pub burst: u32,
}

impl Default for DexScreenerConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.dexscreener.com".to_string(),
            timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
            requests_per_minute: 300,
            burst: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DexScreenerClient {
    config: DexScreenerConfig,
    http: Client,
    limiter: Arc<RateLimiter>,
}

impl DexScreenerClient {
    pub fn new() -> Result<Self, MarketDataError> {
        Self::with_config(DexScreenerConfig::default())
    }

    pub fn with_config(config: DexScreenerConfig) -> Result<Self, MarketDataError> {
        let http = build_client(config.timeout)?;
        let limiter = Arc::new(RateLimiter::per_minute(
            "dexscreener",
            config.requests_per_minute,
            config.burst,
        ));
        Ok(Self { config, http, limiter })
    }

    fn tokens_request(&self, mint: &str) -> RequestBuilder {
        let url = format!(
            "{}/latest/dex/tokens/{}",
            self.config.api_url.trim_end_matches('/'),
            mint
        );
        self.http.get(url).header("accept", "application/json")
    }

    /// Solana pairs for `mint`, most liquid first
    pub async fn get_pairs(&self, mint: &str) -> Result<Vec<DexPair>, MarketDataError> {
        let response: DexTokenPairs = retry_with_backoff(
            &self.config.retry,
            "dexscreener tokens",
            || async {
                self.limiter.acquire().await;
                send_json(self.tokens_request(mint)).await
            },
            MarketDataError::is_retryable,
        )
        .await?;

        let pairs = response.solana_pairs_for(mint);
        debug!("dexscreener: {} solana pairs for {}", pairs.len(), mint);
        Ok(pairs)
    }

    /// Pair summaries in domain form
    pub async fn token_pairs(&self, mint: &str) -> Result<Vec<TokenPair>, MarketDataError> {
        Ok(self
            .get_pairs(mint)
            .await?
            .into_iter()
            .map(DexPair::into_domain)
            .collect())
    }

    async fn most_liquid_pair(&self, mint: &str) -> Result<DexPair, MarketDataError> {
        self.get_pairs(mint)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| MarketDataError::NotFound(format!("dexscreener has no solana pairs for {}", mint)))
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }
}

#[async_trait]
impl MarketDataSource for DexScreenerClient {
    fn id(&self) -> DataSource {
        DataSource::DexScreener
    }

    async fn price(&self, mint: &str) -> Result<PriceQuote, MarketDataError> {
        let pair = self.most_liquid_pair(mint).await?;
        quote_from_pair(mint, &pair)
    }

    async fn token_info(&self, mint: &str) -> Result<TokenInfo, MarketDataError> {
        let pair = self.most_liquid_pair(mint).await?;
        Ok(token_from_pair(&pair))
    }

    async fn pairs(&self, mint: &str) -> Result<Vec<TokenPair>, MarketDataError> {
        self.token_pairs(mint).await
    }
}
