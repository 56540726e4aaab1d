//! Birdeye API Client
//!
//! Prices, OHLCV candles and token overviews from Birdeye's public API.
//! Every request carries `X-API-KEY` and `x-chain: solana`.

use std::time::Duration;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, RequestBuilder};

use crate::adapters::http::{build_client, fetch_json};
use crate::domain::{Candle, DataSource, Interval, OhlcvSeries, PriceQuote, TokenInfo};
use crate::ports::{MarketDataError, MarketDataSource};
use crate::resilience::RetryPolicy;

use super::types::{BirdeyeCandle, BirdeyeOhlcv, BirdeyePrice, BirdeyeResponse, BirdeyeTokenOverview};

#[derive(Debug, Clone)]
pub struct BirdeyeConfig {
    pub api_url: String,
    pub api_key: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for BirdeyeConfig {
    fn default() -> Self {
        Self {
            api_url: "https://public-api.birdeye.so".to_string(),
            api_key: String::new(),
            timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
        }
    }
}

impl BirdeyeConfig {
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct BirdeyeClient {
    config: BirdeyeConfig,
    http: Client,
}

impl BirdeyeClient {
    pub fn with_config(config: BirdeyeConfig) -> Result<Self, MarketDataError> {
        if config.api_key.trim().is_empty() {
            return Err(MarketDataError::MissingApiKey(DataSource::Birdeye));
        }
        let http = build_client(config.timeout)?;
        Ok(Self { config, http })
    }

    pub fn with_api_key(api_key: impl Into<String>) -> Result<Self, MarketDataError> {
        Self::with_config(BirdeyeConfig::with_api_key(api_key))
    }

    fn get(&self, path: &str, params: &[(&str, String)]) -> RequestBuilder {
        let url = format!("{}{}", self.config.api_url.trim_end_matches('/'), path);
        self.http
            .get(url)
            .header("X-API-KEY", &self.config.api_key)
            .header("x-chain", "solana")
            .header("accept", "application/json")
            .query(params)
    }

    pub async fn get_price(&self, mint: &str) -> Result<PriceQuote, MarketDataError> {
        let params = [("address", mint.to_string())];
        let response: BirdeyeResponse<BirdeyePrice> =
            fetch_json(&self.config.retry, "birdeye price", || self.get("/defi/price", &params)).await?;
        response.into_data()?.into_domain(mint)
    }

    /// Candles covering the last `limit` intervals
    pub async fn get_ohlcv(
        &self,
        mint: &str,
        interval: Interval,
        limit: usize,
    ) -> Result<OhlcvSeries, MarketDataError> {
        let time_to = Utc::now().timestamp();
        let span = interval.duration().as_secs() as i64 * limit as i64;
        let params = [
            ("address", mint.to_string()),
            ("type", interval.birdeye_type().to_string()),
            ("time_from", (time_to - span).to_string()),
            ("time_to", time_to.to_string()),
        ];

        let response: BirdeyeResponse<BirdeyeOhlcv> =
            fetch_json(&self.config.retry, "birdeye ohlcv", || self.get("/defi/ohlcv", &params)).await?;
        let candles: Vec<Candle> = response
            .into_data()?
            .items
            .into_iter()
            .filter_map(BirdeyeCandle::into_domain)
            .collect();

        if candles.is_empty() {
            return Err(MarketDataError::NotFound(format!("birdeye has no candles for {}", mint)));
        }
        Ok(OhlcvSeries::new(mint, interval, candles, limit, DataSource::Birdeye))
    }

    pub async fn get_token_overview(&self, mint: &str) -> Result<TokenInfo, MarketDataError> {
        let params = [("address", mint.to_string())];
        let response: BirdeyeResponse<BirdeyeTokenOverview> = fetch_json(
            &self.config.retry,
            "birdeye token overview",
            || self.get("/defi/token_overview", &params),
        )
        .await?;
        Ok(response.into_data()?.into_domain())
    }

    pub fn api_url(&self) -> &str {
        &self.config.api_url
    }
}

#[async_trait]
impl MarketDataSource for BirdeyeClient {
    fn id(&self) -> DataSource {
        DataSource::Birdeye
    }

    async fn price(&self, mint: &str) -> Result<PriceQuote, MarketDataError> {
        self.get_price(mint).await
    }

    async fn ohlcv(
        &self,
        mint: &str,
        interval: Interval,
        limit: usize,
    ) -> Result<OhlcvSeries, MarketDataError> {
        self.get_ohlcv(mint, interval, limit).await
    }

    async fn token_info(&self, mint: &str) -> Result<TokenInfo, MarketDataError> {
        self.get_token_overview(mint).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = BirdeyeConfig::default();
        assert_eq!(config.api_url, "https://public-api.birdeye.so");
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn test_requires_api_key() {
        assert_eq!(
            BirdeyeClient::with_config(BirdeyeConfig::default()).unwrap_err(),
            MarketDataError::MissingApiKey(DataSource::Birdeye)
        );
    }

    #[test]
    fn test_request_headers() {
        let client = BirdeyeClient::with_api_key("bird-key").unwrap();
        let request = client
            .get("/defi/price", &[("address", "MintA".to_string())])
            .build()
            .unwrap();

        assert_eq!(request.headers()["X-API-KEY"], "bird-key");
        assert_eq!(request.headers()["x-chain"], "solana");
        assert_eq!(
            request.url().as_str(),
            "https://public-api.birdeye.so/defi/price?address=MintA"
        );
    }

    #[tokio::test]
    async fn test_wallet_is_unsupported() {
        let client = BirdeyeClient::with_api_key("bird-key").unwrap();
        assert!(client.wallet_balance("Owner").await.unwrap_err().is_unsupported());
    }
}
