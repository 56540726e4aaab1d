//! Birdeye wire types
//!
//! Birdeye wraps payloads in `{ success, data }`; failures sometimes carry a
//! `message` instead of data.

use chrono::{TimeZone, Utc};
use serde::Deserialize;

use crate::domain::{Candle, DataSource, PriceQuote, TokenInfo};
use crate::ports::MarketDataError;

#[derive(Debug, Clone, Deserialize)]
pub struct BirdeyeResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
}

impl<T> BirdeyeResponse<T> {
    pub fn into_data(self) -> Result<T, MarketDataError> {
        if !self.success {
            return Err(MarketDataError::Api(format!(
                "birdeye: {}",
                self.message.unwrap_or_else(|| "request failed".to_string())
            )));
        }
        self.data
            .ok_or_else(|| MarketDataError::Parse("birdeye: success without data".to_string()))
    }
}

/// `/defi/price` data
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BirdeyePrice {
    pub value: f64,
    pub update_unix_time: Option<i64>,
    pub price_change24h: Option<f64>,
    pub liquidity: Option<f64>,
}

impl BirdeyePrice {
    pub fn into_domain(self, mint: &str) -> Result<PriceQuote, MarketDataError> {
        if !self.value.is_finite() || self.value <= 0.0 {
            return Err(MarketDataError::NotFound(format!("birdeye has no price for {}", mint)));
        }
        let mut quote = PriceQuote::new(mint, self.value, DataSource::Birdeye);
        quote.price_change_24h_pct = self.price_change24h;
        quote.liquidity_usd = self.liquidity;
        if let Some(at) = self.update_unix_time.and_then(|ts| Utc.timestamp_opt(ts, 0).single()) {
            quote.fetched_at = at;
        }
        Ok(quote)
    }
}

/// `/defi/ohlcv` data
#[derive(Debug, Clone, Deserialize)]
pub struct BirdeyeOhlcv {
    #[serde(default)]
    pub items: Vec<BirdeyeCandle>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BirdeyeCandle {
    pub o: f64,
    pub h: f64,
    pub l: f64,
    pub c: f64,
    pub v: f64,
    pub unix_time: i64,
}

impl BirdeyeCandle {
    pub fn into_domain(self) -> Option<Candle> {
        let timestamp = Utc.timestamp_opt(self.unix_time, 0).single()?;
        Some(Candle {
            timestamp,
            open: self.o,
            high: self.h,
            low: self.l,
            close: self.c,
            volume: self.v,
        })
    }
}

/// `/defi/token_overview` data
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BirdeyeTokenOverview {
    pub address: String,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub decimals: Option<u8>,
    #[serde(rename = "logoURI")]
    pub logo_uri: Option<String>,
    pub supply: Option<f64>,
    pub price: Option<f64>,
    pub liquidity: Option<f64>,
    #[serde(rename = "v24hUSD")]
    pub volume_24h_usd: Option<f64>,
    pub price_change24h_percent: Option<f64>,
}

impl BirdeyeTokenOverview {
    pub fn into_domain(self) -> TokenInfo {
        TokenInfo {
            mint: self.address,
            name: self.name.unwrap_or_default(),
            symbol: self.symbol.unwrap_or_default(),
            decimals: self.decimals,
            logo_uri: self.logo_uri.filter(|uri| !uri.is_empty()),
            supply: self.supply,
            source: DataSource::Birdeye,
        }
    }
}
