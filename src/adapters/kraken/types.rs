//! Kraken public API wire types
//!
//! Kraken answers `{ error: [...], result: {...} }` and keys results by its
//! own pair names, which may differ from the requested pair (`XXBTZUSD`
//! for `XBTUSD`), so results are taken by position rather than by key.
//! Every number is a string.

use std::collections::HashMap;
use chrono::{TimeZone, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::adapters::http::parse_f64;
use crate::domain::{Candle, DataSource, PriceQuote};
use crate::ports::MarketDataError;

#[derive(Debug, Clone, Deserialize)]
pub struct KrakenResponse<T> {
    #[serde(default)]
    pub error: Vec<String>,
    pub result: Option<T>,
}

impl<T> KrakenResponse<T> {
    pub fn into_result(self) -> Result<T, MarketDataError> {
        if !self.error.is_empty() {
            let message = self.error.join(", ");
            if message.contains("Unknown asset pair") {
                return Err(MarketDataError::NotFound(format!("kraken: {}", message)));
            }
            return Err(MarketDataError::Api(format!("kraken: {}", message)));
        }
        self.result
            .ok_or_else(|| MarketDataError::Parse("kraken: response without result".to_string()))
    }
}

/// One entry of `/0/public/Ticker`. The ticker's `o` is the open since
/// 00:00 UTC, not 24 hours ago, so no 24h change is derived from it.
#[derive(Debug, Clone, Deserialize)]
pub struct KrakenTicker {
    /// Last trade: [price, lot volume]
    pub c: Vec<String>,
    /// Volume: [today, last 24 hours]
    pub v: Vec<String>,
    /// High: [today, last 24 hours]
    #[serde(default)]
    pub h: Vec<String>,
    /// Low: [today, last 24 hours]
    #[serde(default)]
    pub l: Vec<String>,
}

impl KrakenTicker {
    pub fn into_domain(self, mint: &str) -> Result<PriceQuote, MarketDataError> {
        let last = self
            .c
            .first()
            .ok_or_else(|| MarketDataError::Parse("kraken ticker without last trade".to_string()))?;
        let price = parse_f64("kraken last trade", last)?;
        if !price.is_finite() || price <= 0.0 {
            return Err(MarketDataError::NotFound(format!("kraken has no price for {}", mint)));
        }

        let volume_24h = self
            .v
            .get(1)
            .map(|v| parse_f64("kraken volume", v))
            .transpose()?;

        let mut quote = PriceQuote::new(mint, price, DataSource::Kraken);
        quote.volume_24h_usd = volume_24h.map(|base| base * price);
        Ok(quote)
    }
}

/// Take the single ticker out of a `Ticker` result
pub fn first_ticker(result: HashMap<String, KrakenTicker>) -> Result<KrakenTicker, MarketDataError> {
    result
        .into_values()
        .next()
        .ok_or_else(|| MarketDataError::Parse("kraken: empty ticker result".to_string()))
}

/// `[time, open, high, low, close, vwap, volume, count]`
pub type KrakenOhlcRow = (i64, String, String, String, String, String, String, u64);

/// Candles out of an `OHLC` result. The result map holds the pair's rows
/// plus a numeric `last` cursor, which is skipped.
pub fn candles_from_ohlc(result: HashMap<String, Value>) -> Result<Vec<Candle>, MarketDataError> {
    let rows = result
        .into_iter()
        .find(|(key, _)| key != "last")
        .map(|(_, rows)| rows)
        .ok_or_else(|| MarketDataError::Parse("kraken: OHLC result without pair".to_string()))?;

    let rows: Vec<KrakenOhlcRow> = serde_json::from_value(rows)?;
    rows.into_iter().map(candle_from_row).collect()
}

fn candle_from_row(row: KrakenOhlcRow) -> Result<Candle, MarketDataError> {
    let (time, open, high, low, close, _vwap, volume, _count) = row;
    let timestamp = Utc
        .timestamp_opt(time, 0)
        .single()
        .ok_or_else(|| MarketDataError::Parse(format!("kraken: bad candle time {}", time)))?;
    Ok(Candle {
        timestamp,
        open: parse_f64("kraken open", &open)?,
        high: parse_f64("kraken high", &high)?,
        low: parse_f64("kraken low", &low)?,
        close: parse_f64("kraken close", &close)?,
        volume: parse_f64("kraken volume", &volume)?,
    })
}
