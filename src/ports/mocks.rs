use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};

use crate::domain::{
    Candle, DataSource, Interval, OhlcvSeries, PriceQuote, TokenInfo, TokenPair, WalletBalance,
};
use super::market_data::{MarketDataError, MarketDataSource};

/// Scripted market data source that records calls and serves canned data.
///
/// An operation with nothing scripted reports `Unsupported`; a scripted
/// operation asked for an unknown key reports `NotFound`.
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    id: DataSource,
    calls: Arc<Mutex<Vec<String>>>,
    failure: Option<MarketDataError>,
    prices: Option<HashMap<String, f64>>,
    closes: Option<HashMap<String, f64>>,
    tokens: Option<HashMap<String, (String, String)>>,
    wallets: Option<HashMap<String, f64>>,
    pairs: Option<HashMap<String, Vec<TokenPair>>>,
}

impl ScriptedSource {
    pub fn new(id: DataSource) -> Self {
        Self {
            id,
            calls: Arc::new(Mutex::new(Vec::new())),
            failure: None,
            prices: None,
            closes: None,
            tokens: None,
            wallets: None,
            pairs: None,
        }
    }

    /// Builder method: every supported call fails with `error`
    pub fn failing(mut self, error: MarketDataError) -> Self {
        self.failure = Some(error);
        self
    }

    pub fn with_price(mut self, mint: &str, price: f64) -> Self {
        self.prices.get_or_insert_with(HashMap::new).insert(mint.to_string(), price);
        self
    }

    /// Builder method: flat candles closing at `close`
    pub fn with_ohlcv(mut self, mint: &str, close: f64) -> Self {
        self.closes.get_or_insert_with(HashMap::new).insert(mint.to_string(), close);
        self
    }

    pub fn with_token(mut self, mint: &str, name: &str, symbol: &str) -> Self {
        self.tokens
            .get_or_insert_with(HashMap::new)
            .insert(mint.to_string(), (name.to_string(), symbol.to_string()));
        self
    }

    pub fn with_wallet(mut self, owner: &str, sol: f64) -> Self {
        self.wallets.get_or_insert_with(HashMap::new).insert(owner.to_string(), sol);
        self
    }

    /// Builder method: one pair for `mint` on `dex_id` priced at `price`
    pub fn with_pair(mut self, mint: &str, dex_id: &str, price: f64) -> Self {
        let pair = TokenPair {
            dex_id: dex_id.to_string(),
            pair_address: format!("{}-{}", dex_id, mint),
            base_mint: mint.to_string(),
            base_symbol: "BASE".to_string(),
            quote_symbol: "USDC".to_string(),
            price_usd: Some(price),
            liquidity_usd: None,
            volume_24h_usd: None,
            price_change_24h_pct: None,
            url: None,
        };
        self.pairs
            .get_or_insert_with(HashMap::new)
            .entry(mint.to_string())
            .or_default()
            .push(pair);
        self
    }

    /// Get all recorded calls as `operation:key`
    pub fn get_calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn record(&self, operation: &str, key: &str) {
        self.calls.lock().unwrap().push(format!("{}:{}", operation, key));
    }

    fn lookup<'a, T>(
        &self,
        table: &'a Option<HashMap<String, T>>,
        operation: &'static str,
        key: &str,
    ) -> Result<&'a T, MarketDataError> {
        let table = table
            .as_ref()
            .ok_or_else(|| MarketDataError::unsupported(self.id, operation))?;
        self.record(operation, key);
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        table
            .get(key)
            .ok_or_else(|| MarketDataError::NotFound(key.to_string()))
    }
}

#[async_trait]
impl MarketDataSource for ScriptedSource {
    fn id(&self) -> DataSource {
        self.id
    }

    async fn price(&self, mint: &str) -> Result<PriceQuote, MarketDataError> {
        let price = *self.lookup(&self.prices, "price", mint)?;
        Ok(PriceQuote::new(mint, price, self.id))
    }

    async fn ohlcv(
        &self,
        mint: &str,
        interval: Interval,
        limit: usize,
    ) -> Result<OhlcvSeries, MarketDataError> {
        let close = *self.lookup(&self.closes, "ohlcv", mint)?;
        let newest = interval.floor(Utc::now());
        let step = ChronoDuration::minutes(interval.minutes() as i64);
        let candles = (0..limit)
            .map(|i| Candle {
                timestamp: newest - step * (limit - 1 - i) as i32,
                open: close,
                high: close,
                low: close,
                close,
                volume: 1.0,
            })
            .collect();
        Ok(OhlcvSeries::new(mint, interval, candles, limit, self.id))
    }

    async fn token_info(&self, mint: &str) -> Result<TokenInfo, MarketDataError> {
        let (name, symbol) = self.lookup(&self.tokens, "token_info", mint)?.clone();
        Ok(TokenInfo {
            mint: mint.to_string(),
            name,
            symbol,
            decimals: Some(9),
            logo_uri: None,
            supply: None,
            source: self.id,
        })
    }

    async fn wallet_balance(&self, owner: &str) -> Result<WalletBalance, MarketDataError> {
        let sol = *self.lookup(&self.wallets, "wallet_balance", owner)?;
        Ok(WalletBalance {
            owner: owner.to_string(),
            sol,
            tokens: Vec::new(),
            source: self.id,
        })
    }

    async fn pairs(&self, mint: &str) -> Result<Vec<TokenPair>, MarketDataError> {
        Ok(self.lookup(&self.pairs, "pairs", mint)?.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_price() {
        let mock = ScriptedSource::new(DataSource::Birdeye).with_price("MintA", 1.25);

        let quote = mock.price("MintA").await.unwrap();
        assert_eq!(quote.price_usd, 1.25);
        assert_eq!(quote.source, DataSource::Birdeye);
        assert_eq!(mock.get_calls(), vec!["price:MintA".to_string()]);

        assert!(matches!(mock.price("MintB").await, Err(MarketDataError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_unscripted_operation_is_unsupported_and_not_recorded() {
        let mock = ScriptedSource::new(DataSource::Kraken).with_price("MintA", 1.0);

        let err = mock.token_info("MintA").await.unwrap_err();
        assert!(err.is_unsupported());
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_failing_source() {
        let mock = ScriptedSource::new(DataSource::Shyft)
            .with_token("MintA", "Alpha", "ALP")
            .failing(MarketDataError::Timeout);

        assert_eq!(mock.token_info("MintA").await, Err(MarketDataError::Timeout));
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_scripted_ohlcv_is_flat() {
        let mock = ScriptedSource::new(DataSource::Birdeye).with_ohlcv("MintA", 2.0);
        let series = mock.ohlcv("MintA", Interval::M5, 3).await.unwrap();
        assert_eq!(series.candles.len(), 3);
        assert!(series.candles.iter().all(|c| c.close == 2.0 && c.is_valid()));
    }

    #[tokio::test]
    async fn test_scripted_pairs() {
        let mock = ScriptedSource::new(DataSource::DexScreener)
            .with_pair("MintA", "raydium", 1.0)
            .with_pair("MintA", "orca", 1.01);

        let pairs = mock.pairs("MintA").await.unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[1].dex_id, "orca");
        assert_eq!(mock.get_calls(), vec!["pairs:MintA".to_string()]);
    }
}
