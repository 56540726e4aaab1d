//! Kraken Public API Client
//!
//! Centralized-exchange reference prices for the few Solana assets Kraken
//! lists. Mints without a Kraken pair are reported as unsupported so the
//! fallback chain moves on without marking Kraken unhealthy.

use std::collections::HashMap;
use std::time::Duration;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;

use crate::adapters::http::{build_client, fetch_json};
use crate::domain::{kraken_pair, DataSource, Interval, OhlcvSeries, PriceQuote};
use crate::ports::{MarketDataError, MarketDataSource};
use crate::resilience::RetryPolicy;

use super::types::{candles_from_ohlc, first_ticker, KrakenResponse, KrakenTicker};

#[derive(Debug, Clone)]
pub struct KrakenConfig {
    pub api_url: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for KrakenConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.kraken.com".to_string(),
            timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct KrakenClient {
    config: KrakenConfig,
    http: Client,
}

impl KrakenClient {
    pub fn new() -> Result<Self, MarketDataError> {
        Self::with_config(KrakenConfig::default())
    }

    pub fn with_config(config: KrakenConfig) -> Result<Self, MarketDataError> {
        let http = build_client(config.timeout)?;
        Ok(Self { config, http })
    }

    fn public(&self, method: &str, params: &[(&str, String)]) -> RequestBuilder {
        let url = format!("{}/0/public/{}", self.config.api_url.trim_end_matches('/'), method);
        self.http.get(url).query(params)
    }

    fn pair_for(mint: &str, operation: &'static str) -> Result<&'static str, MarketDataError> {
        kraken_pair(mint).ok_or_else(|| MarketDataError::unsupported(DataSource::Kraken, operation))
    }

    pub async fn get_ticker(&self, pair: &str) -> Result<KrakenTicker, MarketDataError> {
        let params = [("pair", pair.to_string())];
        let response: KrakenResponse<HashMap<String, KrakenTicker>> =
            fetch_json(&self.config.retry, "kraken ticker", || self.public("Ticker", &params)).await?;
        first_ticker(response.into_result()?)
    }

    pub async fn get_ohlc(
        &self,
        mint: &str,
        pair: &str,
        interval: Interval,
        limit: usize,
    ) -> Result<OhlcvSeries, MarketDataError> {
        let params = [
            ("pair", pair.to_string()),
            ("interval", interval.kraken_minutes().to_string()),
        ];
        let response: KrakenResponse<HashMap<String, Value>> =
            fetch_json(&self.config.retry, "kraken ohlc", || self.public("OHLC", &params)).await?;
        let candles = candles_from_ohlc(response.into_result()?)?;

        if candles.is_empty() {
            return Err(MarketDataError::NotFound(format!("kraken has no candles for {}", pair)));
        }
        Ok(OhlcvSeries::new(mint, interval, candles, limit, DataSource::Kraken))
    }
}

#[async_trait]
impl MarketDataSource for KrakenClient {
    fn id(&self) -> DataSource {
        DataSource::Kraken
    }

    async fn price(&self, mint: &str) -> Result<PriceQuote, MarketDataError> {
        let pair = Self::pair_for(mint, "price")?;
        self.get_ticker(pair).await?.into_domain(mint)
    }

    async fn ohlcv(
        &self,
        mint: &str,
        interval: Interval,
        limit: usize,
    ) -> Result<OhlcvSeries, MarketDataError> {
        let pair = Self::pair_for(mint, "ohlcv")?;
        self.get_ohlc(mint, pair, interval, limit).await
    }
}
