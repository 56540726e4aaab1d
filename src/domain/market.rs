//! Market Data Types
//!
//! Provider-neutral representations of prices, candles, token metadata and
//! wallet balances. Every adapter normalizes into these.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::interval::Interval;

/// Where a piece of market data came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Shyft,
    Birdeye,
    #[serde(rename = "dexscreener", alias = "dex_screener")]
    DexScreener,
    Kraken,
    SolanaRpc,
    /// Deterministic placeholder produced when every live source failed
    Synthetic,
}

impl DataSource {
    /// Every live (non-synthetic) source
    pub const LIVE: [DataSource; 5] = [
        DataSource::Shyft,
        DataSource::Birdeye,
        DataSource::DexScreener,
        DataSource::Kraken,
        DataSource::SolanaRpc,
    ];

    /// Name used in configuration files and log output
    pub fn name(&self) -> &'static str {
        match self {
            DataSource::Shyft => "shyft",
            DataSource::Birdeye => "birdeye",
            DataSource::DexScreener => "dexscreener",
            DataSource::Kraken => "kraken",
            DataSource::SolanaRpc => "solana_rpc",
            DataSource::Synthetic => "synthetic",
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shyft" => Ok(DataSource::Shyft),
            "birdeye" => Ok(DataSource::Birdeye),
            "dexscreener" | "dex_screener" => Ok(DataSource::DexScreener),
            "kraken" => Ok(DataSource::Kraken),
            "solana_rpc" | "solana" | "rpc" => Ok(DataSource::SolanaRpc),
            "synthetic" => Ok(DataSource::Synthetic),
            other => Err(format!("unknown data source '{}'", other)),
        }
    }
}

/// Spot price of a token in USD
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub mint: String,
    pub price_usd: f64,
    pub price_change_24h_pct: Option<f64>,
    pub volume_24h_usd: Option<f64>,
    pub liquidity_usd: Option<f64>,
    pub source: DataSource,
    pub fetched_at: DateTime<Utc>,
}

impl PriceQuote {
    /// Minimal quote with only a price
    pub fn new(mint: impl Into<String>, price_usd: f64, source: DataSource) -> Self {
        Self {
            mint: mint.into(),
            price_usd,
            price_change_24h_pct: None,
            volume_24h_usd: None,
            liquidity_usd: None,
            source,
            fetched_at: Utc::now(),
        }
    }

    pub fn is_synthetic(&self) -> bool {
        self.source == DataSource::Synthetic
    }
}

/// A single OHLCV candle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// High bounds open/close from above, low from below, volume non-negative
    pub fn is_valid(&self) -> bool {
        let body_hi = self.open.max(self.close);
        let body_lo = self.open.min(self.close);
        self.low <= body_lo
            && self.high >= body_hi
            && self.low > 0.0
            && self.volume >= 0.0
            && self.volume.is_finite()
    }
}

/// Candles for one token at one interval, ascending by timestamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcvSeries {
    pub mint: String,
    pub interval: Interval,
    pub candles: Vec<Candle>,
    pub source: DataSource,
}

impl OhlcvSeries {
    /// Build a series, sorting candles by time and keeping the newest `limit`
    pub fn new(
        mint: impl Into<String>,
        interval: Interval,
        mut candles: Vec<Candle>,
        limit: usize,
        source: DataSource,
    ) -> Self {
        candles.sort_by_key(|c| c.timestamp);
        if candles.len() > limit {
            candles.drain(..candles.len() - limit);
        }
        Self {
            mint: mint.into(),
            interval,
            candles,
            source,
        }
    }

    pub fn last_close(&self) -> Option<f64> {
        self.candles.last().map(|c| c.close)
    }

    pub fn is_synthetic(&self) -> bool {
        self.source == DataSource::Synthetic
    }
}

/// Token metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub mint: String,
    pub name: String,
    pub symbol: String,
    pub decimals: Option<u8>,
    pub logo_uri: Option<String>,
    /// Circulating supply in UI units (decimals applied)
    pub supply: Option<f64>,
    pub source: DataSource,
}

impl TokenInfo {
    pub fn is_synthetic(&self) -> bool {
        self.source == DataSource::Synthetic
    }
}

/// DEX pair summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenPair {
    pub dex_id: String,
    pub pair_address: String,
    pub base_mint: String,
    pub base_symbol: String,
    pub quote_symbol: String,
    pub price_usd: Option<f64>,
    pub liquidity_usd: Option<f64>,
    pub volume_24h_usd: Option<f64>,
    pub price_change_24h_pct: Option<f64>,
    pub url: Option<String>,
}

/// SPL token balance held by a wallet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenHolding {
    pub mint: String,
    pub symbol: Option<String>,
    /// Balance in UI units
    pub amount: f64,
    pub decimals: Option<u8>,
}

/// Native SOL plus SPL token balances of one wallet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletBalance {
    pub owner: String,
    pub sol: f64,
    pub tokens: Vec<TokenHolding>,
    pub source: DataSource,
}

impl WalletBalance {
    pub fn is_synthetic(&self) -> bool {
        self.source == DataSource::Synthetic
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn candle(ts: i64, o: f64, h: f64, l: f64, c: f64) -> Candle {
        Candle {
            timestamp: Utc.timestamp_opt(ts, 0).unwrap(),
            open: o,
            high: h,
            low: l,
            close: c,
            volume: 10.0,
        }
    }

    #[test]
    fn test_data_source_names_parse_back() {
        for source in DataSource::LIVE {
            assert_eq!(source.name().parse::<DataSource>().unwrap(), source);
        }
        assert_eq!("DexScreener".parse::<DataSource>().unwrap(), DataSource::DexScreener);
        assert!("coingecko".parse::<DataSource>().is_err());
    }

    #[test]
    fn test_candle_validity() {
        assert!(candle(0, 1.0, 1.2, 0.9, 1.1).is_valid());
        assert!(!candle(0, 1.0, 1.05, 0.9, 1.1).is_valid());
        assert!(!candle(0, 1.0, 1.2, 1.05, 1.1).is_valid());
    }

    #[test]
    fn test_series_sorts_and_truncates() {
        let candles = vec![
            candle(300, 1.0, 1.0, 1.0, 3.0),
            candle(100, 1.0, 1.0, 1.0, 1.0),
            candle(200, 1.0, 1.0, 1.0, 2.0),
        ];
        let series = OhlcvSeries::new("mint", Interval::M1, candles, 2, DataSource::Birdeye);

        assert_eq!(series.candles.len(), 2);
        assert_eq!(series.candles[0].timestamp.timestamp(), 200);
        assert_eq!(series.last_close(), Some(3.0));
    }

    #[test]
    fn test_source_serializes_as_config_name() {
        for source in DataSource::LIVE {
            let json = serde_json::to_value(source).unwrap();
            assert_eq!(json, source.name());
        }
        let parsed: DataSource = serde_json::from_str("\"dex_screener\"").unwrap();
        assert_eq!(parsed, DataSource::DexScreener);
    }
}
