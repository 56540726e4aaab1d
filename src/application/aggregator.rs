//! Market Data Aggregator
//!
//! The facade every caller goes through. Each operation resolves through
//! its own TTL cache and an ordered chain of sources, and falls back to a
//! deterministic placeholder when nothing answers. No operation returns an
//! error; callers check `source` (or `is_synthetic()`) instead.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use chrono::Utc;
use futures::future::join_all;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::adapters::birdeye::BirdeyeClient;
use crate::adapters::dexscreener::DexScreenerClient;
use crate::adapters::kraken::KrakenClient;
use crate::adapters::shyft::ShyftClient;
use crate::adapters::solana::SolanaRpcClient;
use crate::cache::{CacheStats, TtlCache};
use crate::config::Config;
use crate::domain::synthetic::{
    placeholder_ohlcv, placeholder_price, placeholder_token_info, placeholder_wallet,
};
use crate::domain::{
    short_address, validate_address, DataSource, Interval, OhlcvSeries, PriceQuote, TokenInfo,
    TokenPair, WalletBalance,
};
use crate::ports::{MarketDataError, MarketDataSource};
use crate::resilience::{HealthPolicy, SourceHealth, SourceStatus};

use super::fallback::{cache_or_fetch, FallbackChain, SourceFuture};

/// Most candles a single `get_ohlcv` call returns
pub const MAX_CANDLES: usize = 1000;

/// Which sources serve each kind of request, in the order they are tried
#[derive(Debug, Clone, PartialEq)]
pub struct SourceOrder {
    pub price: Vec<DataSource>,
    pub ohlcv: Vec<DataSource>,
    pub metadata: Vec<DataSource>,
    pub wallet: Vec<DataSource>,
    pub pairs: Vec<DataSource>,
}

impl Default for SourceOrder {
    fn default() -> Self {
        Self {
            price: vec![DataSource::Birdeye, DataSource::DexScreener, DataSource::Kraken],
            ohlcv: vec![DataSource::Birdeye, DataSource::Kraken],
            metadata: vec![
                DataSource::Shyft,
                DataSource::Birdeye,
                DataSource::DexScreener,
                DataSource::SolanaRpc,
            ],
            wallet: vec![DataSource::Shyft, DataSource::SolanaRpc],
            pairs: vec![DataSource::DexScreener],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregatorConfig {
    pub cache_ttl: Duration,
    pub max_entries: usize,
    pub order: SourceOrder,
    pub health: HealthPolicy,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            cache_ttl: TtlCache::<String, PriceQuote>::DEFAULT_TTL,
            max_entries: TtlCache::<String, PriceQuote>::DEFAULT_MAX_ENTRIES,
            order: SourceOrder::default(),
            health: HealthPolicy::default(),
        }
    }
}

pub struct MarketDataAggregator {
    sources: HashMap<DataSource, Arc<dyn MarketDataSource>>,
    order: SourceOrder,
    prices: Mutex<TtlCache<String, PriceQuote>>,
    series: Mutex<TtlCache<String, OhlcvSeries>>,
    tokens: Mutex<TtlCache<String, TokenInfo>>,
    wallets: Mutex<TtlCache<String, WalletBalance>>,
    pairs: Mutex<TtlCache<String, Vec<TokenPair>>>,
    health: SourceHealth,
}

impl MarketDataAggregator {
    /// Aggregator with no sources; every call yields a placeholder until
    /// sources are registered
    pub fn new(config: AggregatorConfig) -> Self {
        let ttl = config.cache_ttl;
        let max = config.max_entries;
        Self {
            sources: HashMap::new(),
            order: config.order,
            prices: Mutex::new(TtlCache::with_config(ttl, max)),
            series: Mutex::new(TtlCache::with_config(ttl, max)),
            tokens: Mutex::new(TtlCache::with_config(ttl, max)),
            wallets: Mutex::new(TtlCache::with_config(ttl, max)),
            pairs: Mutex::new(TtlCache::with_config(ttl, max)),
            health: SourceHealth::new(config.health),
        }
    }

    /// Build every enabled source the configuration has credentials for
    pub fn from_config(config: &Config) -> Self {
        let mut aggregator = Self::new(AggregatorConfig::from(config));

        if config.shyft.enabled {
            register_or_log(
                &mut aggregator,
                DataSource::Shyft,
                ShyftClient::with_config(config.shyft_client_config()),
            );
        }
        if config.birdeye.enabled {
            register_or_log(
                &mut aggregator,
                DataSource::Birdeye,
                BirdeyeClient::with_config(config.birdeye_client_config()),
            );
        }
        if config.dexscreener.enabled {
            register_or_log(
                &mut aggregator,
                DataSource::DexScreener,
                DexScreenerClient::with_config(config.dexscreener_client_config()),
            );
        }
        if config.kraken.enabled {
            register_or_log(
                &mut aggregator,
                DataSource::Kraken,
                KrakenClient::with_config(config.kraken_client_config()),
            );
        }
        if config.solana.enabled {
            match config.solana_client_config() {
                Ok(rpc) => aggregator.register(Arc::new(SolanaRpcClient::with_config(rpc))),
                Err(e) => warn!("solana_rpc disabled: {}", e),
            }
        }

        info!(
            "Market data aggregator ready with sources: {}",
            aggregator
                .source_ids()
                .iter()
                .map(DataSource::name)
                .collect::<Vec<_>>()
                .join(", ")
        );
        aggregator
    }

    /// Builder method: register a source, replacing any with the same id
    pub fn with_source(mut self, source: Arc<dyn MarketDataSource>) -> Self {
        self.register(source);
        self
    }

    pub fn register(&mut self, source: Arc<dyn MarketDataSource>) {
        let id = source.id();
        if self.sources.insert(id, source).is_some() {
            debug!("replaced source {}", id);
        }
    }

    pub fn has_source(&self, id: DataSource) -> bool {
        self.sources.contains_key(&id)
    }

    /// Registered sources in canonical order
    pub fn source_ids(&self) -> Vec<DataSource> {
        DataSource::LIVE
            .into_iter()
            .filter(|id| self.sources.contains_key(id))
            .collect()
    }

    pub fn order(&self) -> &SourceOrder {
        &self.order
    }

    pub fn health(&self) -> &SourceHealth {
        &self.health
    }

    fn chain<'a, T, F>(&'a self, label: String, order: &[DataSource], call: F) -> FallbackChain<'a, T>
    where
        F: Fn(&'a dyn MarketDataSource) -> SourceFuture<'a, T>,
    {
        let mut chain = FallbackChain::new(label);
        for id in order {
            if let Some(source) = self.sources.get(id) {
                chain.push(*id, call(source.as_ref()));
            }
        }
        chain
    }

    pub async fn get_price(&self, mint: &str) -> PriceQuote {
        let mint = mint.trim();
        if !is_valid_address(mint) {
            return placeholder_price(mint);
        }
        let chain = self.chain(format!("price {}", short_address(mint)), &self.order.price, |s| {
            s.price(mint)
        });
        cache_or_fetch(&self.prices, &format!("price:{}", mint), chain, &self.health, || {
            placeholder_price(mint)
        })
        .await
    }

    /// One quote per input, in input order; duplicates (after trimming) are fetched once
    pub async fn get_prices(&self, mints: &[String]) -> Vec<PriceQuote> {
        let mut unique: Vec<&str> = Vec::new();
        for mint in mints.iter().map(|m| m.trim()) {
            if !unique.contains(&mint) {
                unique.push(mint);
            }
        }

        let quotes = join_all(unique.iter().map(|mint| self.get_price(mint))).await;
        let by_mint: HashMap<&str, PriceQuote> = unique.into_iter().zip(quotes).collect();

        mints
            .iter()
            .map(|mint| match by_mint.get(mint.trim()) {
                Some(quote) => quote.clone(),
                None => placeholder_price(mint.trim()),
            })
            .collect()
    }

    /// Up to `limit` candles (clamped to 1..=`MAX_CANDLES`), oldest first
    pub async fn get_ohlcv(&self, mint: &str, interval: Interval, limit: usize) -> OhlcvSeries {
        let mint = mint.trim();
        let limit = limit.clamp(1, MAX_CANDLES);
        if !is_valid_address(mint) {
            return placeholder_ohlcv(mint, interval, limit, Utc::now());
        }
        let chain = self.chain(
            format!("ohlcv {} {}", short_address(mint), interval),
            &self.order.ohlcv,
            |s| s.ohlcv(mint, interval, limit),
        );
        let key = format!("ohlcv:{}:{}:{}", mint, interval, limit);
        cache_or_fetch(&self.series, &key, chain, &self.health, || {
            placeholder_ohlcv(mint, interval, limit, Utc::now())
        })
        .await
    }

    pub async fn get_token_info(&self, mint: &str) -> TokenInfo {
        let mint = mint.trim();
        if !is_valid_address(mint) {
            return placeholder_token_info(mint);
        }
        let chain = self.chain(format!("token {}", short_address(mint)), &self.order.metadata, |s| {
            s.token_info(mint)
        });
        cache_or_fetch(&self.tokens, &format!("token:{}", mint), chain, &self.health, || {
            placeholder_token_info(mint)
        })
        .await
    }

    pub async fn get_wallet_balance(&self, owner: &str) -> WalletBalance {
        let owner = owner.trim();
        if !is_valid_address(owner) {
            return placeholder_wallet(owner);
        }
        let chain = self.chain(format!("wallet {}", short_address(owner)), &self.order.wallet, |s| {
            s.wallet_balance(owner)
        });
        cache_or_fetch(&self.wallets, &format!("wallet:{}", owner), chain, &self.health, || {
            placeholder_wallet(owner)
        })
        .await
    }

    /// DEX pairs for a mint; empty when no pair source answers
    pub async fn get_pairs(&self, mint: &str) -> Vec<TokenPair> {
        let mint = mint.trim();
        if !is_valid_address(mint) {
            return Vec::new();
        }
        let chain = self.chain(format!("pairs {}", short_address(mint)), &self.order.pairs, |s| {
            s.pairs(mint)
        });
        cache_or_fetch(&self.pairs, &format!("pairs:{}", mint), chain, &self.health, Vec::new).await
    }

    /// Hit/miss and entry counts summed over every cache
    pub async fn cache_stats(&self) -> CacheStats {
        self.prices.lock().await.stats()
            + self.series.lock().await.stats()
            + self.tokens.lock().await.stats()
            + self.wallets.lock().await.stats()
            + self.pairs.lock().await.stats()
    }

    /// Health of every registered source
    pub fn source_status(&self) -> Vec<SourceStatus> {
        self.health.snapshot(&self.source_ids())
    }

    pub async fn clear_cache(&self) {
        self.prices.lock().await.clear();
        self.series.lock().await.clear();
        self.tokens.lock().await.clear();
        self.wallets.lock().await.clear();
        self.pairs.lock().await.clear();
        info!("Market data caches cleared");
    }
}

impl Default for MarketDataAggregator {
    fn default() -> Self {
        Self::new(AggregatorConfig::default())
    }
}

fn is_valid_address(address: &str) -> bool {
    match validate_address(address) {
        Ok(_) => true,
        Err(e) => {
            debug!("{}; serving placeholder", e);
            false
        }
    }
}

fn register_or_log<S>(aggregator: &mut MarketDataAggregator, id: DataSource, built: Result<S, MarketDataError>)
where
    S: MarketDataSource + 'static,
{
    match built {
        Ok(source) => aggregator.register(Arc::new(source)),
        Err(MarketDataError::MissingApiKey(_)) => info!("{} disabled: no API key configured", id),
        Err(e) => warn!("{} disabled: {}", id, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{SOL_MINT, USDC_MINT};
    use crate::ports::market_data::MockMarketDataSource;
    use crate::ports::ScriptedSource;

    fn aggregator_with(sources: Vec<ScriptedSource>) -> MarketDataAggregator {
        sources
            .into_iter()
            .fold(MarketDataAggregator::default(), |agg, source| agg.with_source(Arc::new(source)))
    }

    #[tokio::test]
    async fn test_price_follows_configured_order() {
        let birdeye = ScriptedSource::new(DataSource::Birdeye)
            .with_price(SOL_MINT, 1.0)
            .failing(MarketDataError::Timeout);
        let dex = ScriptedSource::new(DataSource::DexScreener).with_price(SOL_MINT, 142.0);
        let kraken = ScriptedSource::new(DataSource::Kraken).with_price(SOL_MINT, 143.0);
        let agg = aggregator_with(vec![birdeye.clone(), dex.clone(), kraken.clone()]);

        let quote = agg.get_price(SOL_MINT).await;

        assert_eq!(quote.source, DataSource::DexScreener);
        assert_eq!(quote.price_usd, 142.0);
        assert_eq!(birdeye.call_count(), 1);
        assert_eq!(kraken.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unregistered_sources_are_ignored() {
        let kraken = ScriptedSource::new(DataSource::Kraken).with_price(SOL_MINT, 143.0);
        let agg = aggregator_with(vec![kraken]);

        assert_eq!(agg.get_price(SOL_MINT).await.source, DataSource::Kraken);
        assert_eq!(agg.source_ids(), vec![DataSource::Kraken]);
    }

    #[tokio::test]
    async fn test_invalid_address_skips_sources() {
        let birdeye = ScriptedSource::new(DataSource::Birdeye).with_price(SOL_MINT, 1.0);
        let agg = aggregator_with(vec![birdeye.clone()]);

        let quote = agg.get_price("not-a-mint").await;
        assert!(quote.is_synthetic());
        assert!(agg.get_pairs("not-a-mint").await.is_empty());
        assert_eq!(birdeye.call_count(), 0);
    }

    #[tokio::test]
    async fn test_ohlcv_limit_is_clamped() {
        let agg = MarketDataAggregator::default();
        let series = agg.get_ohlcv(SOL_MINT, Interval::H1, 0).await;
        assert_eq!(series.candles.len(), 1);
        assert!(series.is_synthetic());
    }

    #[tokio::test]
    async fn test_get_prices_dedupes_and_preserves_order() {
        let birdeye = ScriptedSource::new(DataSource::Birdeye)
            .with_price(SOL_MINT, 142.0)
            .with_price(USDC_MINT, 1.0);
        let agg = aggregator_with(vec![birdeye.clone()]);

        let mints = vec![USDC_MINT.to_string(), SOL_MINT.to_string(), USDC_MINT.to_string()];
        let quotes = agg.get_prices(&mints).await;

        let prices: Vec<f64> = quotes.iter().map(|q| q.price_usd).collect();
        assert_eq!(prices, vec![1.0, 142.0, 1.0]);
        assert_eq!(birdeye.call_count(), 2);
    }

    #[tokio::test]
    async fn test_with_mockall_source() {
        let mut mock = MockMarketDataSource::new();
        mock.expect_id().return_const(DataSource::Birdeye);
        mock.expect_token_info().times(1).returning(|mint| {
            Ok(TokenInfo {
                mint: mint.to_string(),
                name: "Wrapped SOL".to_string(),
                symbol: "SOL".to_string(),
                decimals: Some(9),
                logo_uri: None,
                supply: None,
                source: DataSource::Birdeye,
            })
        });

        let agg = MarketDataAggregator::default().with_source(Arc::new(mock));
        let first = agg.get_token_info(SOL_MINT).await;
        let second = agg.get_token_info(SOL_MINT).await;

        assert_eq!(first.symbol, "SOL");
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_clear_cache_forces_refetch() {
        let birdeye = ScriptedSource::new(DataSource::Birdeye).with_price(SOL_MINT, 142.0);
        let agg = aggregator_with(vec![birdeye.clone()]);

        agg.get_price(SOL_MINT).await;
        agg.get_price(SOL_MINT).await;
        assert_eq!(birdeye.call_count(), 1);

        agg.clear_cache().await;
        agg.get_price(SOL_MINT).await;
        assert_eq!(birdeye.call_count(), 2);
    }

    #[tokio::test]
    async fn test_cache_stats_sum_all_caches() {
        let source = ScriptedSource::new(DataSource::Birdeye)
            .with_price(SOL_MINT, 142.0)
            .with_token(SOL_MINT, "Wrapped SOL", "SOL");
        let agg = aggregator_with(vec![source]);

        agg.get_price(SOL_MINT).await;
        agg.get_price(SOL_MINT).await;
        agg.get_token_info(SOL_MINT).await;

        let stats = agg.cache_stats().await;
        assert_eq!(stats.total_entries, 2);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
    }
}
