//! DexScreener wire types
//!
//! Prices arrive as strings, volume and liquidity as numbers. Every field
//! beyond the pair identity is optional: young pairs omit most of them.

use serde::Deserialize;

use crate::adapters::http::parse_f64;
use crate::domain::{DataSource, PriceQuote, TokenInfo, TokenPair};
use crate::ports::MarketDataError;

pub const SOLANA_CHAIN_ID: &str = "solana";

/// `/latest/dex/tokens/{mint}` response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DexTokenPairs {
    pub schema_version: Option<String>,
    pub pairs: Option<Vec<DexPair>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DexPair {
    pub chain_id: String,
    pub dex_id: String,
    pub url: Option<String>,
    pub pair_address: String,
    pub base_token: DexToken,
    pub quote_token: DexToken,
    pub price_native: Option<String>,
    pub price_usd: Option<String>,
    #[serde(default)]
    pub volume: Option<DexWindow>,
    #[serde(default)]
    pub price_change: Option<DexWindow>,
    #[serde(default)]
    pub liquidity: Option<DexLiquidity>,
    pub fdv: Option<f64>,
    pub pair_created_at: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DexToken {
    pub address: String,
    pub name: String,
    pub symbol: String,
}

/// Rolling windows; only `h24` is consumed
#[derive(Debug, Clone, Deserialize)]
pub struct DexWindow {
    pub h24: Option<f64>,
    pub h6: Option<f64>,
    pub h1: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DexLiquidity {
    pub usd: Option<f64>,
    pub base: Option<f64>,
    pub quote: Option<f64>,
}

impl DexPair {
    pub fn liquidity_usd(&self) -> Option<f64> {
        self.liquidity.as_ref().and_then(|l| l.usd)
    }

    pub fn volume_24h(&self) -> Option<f64> {
        self.volume.as_ref().and_then(|v| v.h24)
    }

    pub fn price_change_24h(&self) -> Option<f64> {
        self.price_change.as_ref().and_then(|p| p.h24)
    }

    pub fn price_usd(&self) -> Result<Option<f64>, MarketDataError> {
        self.price_usd
            .as_deref()
            .map(|raw| parse_f64("dexscreener priceUsd", raw))
            .transpose()
    }

    pub fn is_solana(&self) -> bool {
        self.chain_id == SOLANA_CHAIN_ID
    }

    pub fn into_domain(self) -> TokenPair {
        let price_usd = self.price_usd().ok().flatten();
        let liquidity_usd = self.liquidity_usd();
        let volume_24h_usd = self.volume_24h();
        let price_change_24h_pct = self.price_change_24h();
        TokenPair {
            dex_id: self.dex_id,
            pair_address: self.pair_address,
            base_mint: self.base_token.address,
            base_symbol: self.base_token.symbol,
            quote_symbol: self.quote_token.symbol,
            price_usd,
            liquidity_usd,
            volume_24h_usd,
            price_change_24h_pct,
            url: self.url,
        }
    }
}

impl DexTokenPairs {
    /// Solana pairs whose base token is `mint`, most liquid first
    pub fn solana_pairs_for(self, mint: &str) -> Vec<DexPair> {
        let mut pairs: Vec<DexPair> = self
            .pairs
            .unwrap_or_default()
            .into_iter()
            .filter(|p| p.is_solana() && p.base_token.address == mint)
            .collect();
        pairs.sort_by(|a, b| {
            let la = a.liquidity_usd().unwrap_or(0.0);
            let lb = b.liquidity_usd().unwrap_or(0.0);
            lb.total_cmp(&la)
        });
        pairs
    }
}

/// Quote from the most liquid pair
pub fn quote_from_pair(mint: &str, pair: &DexPair) -> Result<PriceQuote, MarketDataError> {
    let price = pair
        .price_usd()?
        .filter(|p| p.is_finite() && *p > 0.0)
        .ok_or_else(|| MarketDataError::NotFound(format!("dexscreener has no USD price for {}", mint)))?;

    let mut quote = PriceQuote::new(mint, price, DataSource::DexScreener);
    quote.price_change_24h_pct = pair.price_change_24h();
    quote.volume_24h_usd = pair.volume_24h();
    quote.liquidity_usd = pair.liquidity_usd();
    Ok(quote)
}

/// Name and symbol from a pair's base token; DexScreener carries no decimals
pub fn token_from_pair(pair: &DexPair) -> TokenInfo {
    TokenInfo {
        mint: pair.base_token.address.clone(),
        name: pair.base_token.name.clone(),
        symbol: pair.base_token.symbol.clone(),
        decimals: None,
        logo_uri: None,
        supply: None,
        source: DataSource::DexScreener,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const SOL: &str = "So11111111111111111111111111111111111111112";
    const JUP: &str = "JUPyiwrYJFskUPiHa7hkeR8VUtAeFoSYbKedZNsDvCN";

    fn load_fixture(name: &str) -> DexTokenPairs {
        let path = format!("{}/fixtures/dexscreener/{}.json", env!("CARGO_MANIFEST_DIR"), name);
        let raw = std::fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("Failed to load fixture '{}': {}", path, e));
        serde_json::from_str(&raw).unwrap()
    }

    #[test]
    fn test_filters_chain_and_base_then_sorts_by_liquidity() {
        let pairs = load_fixture("token_pairs").solana_pairs_for(SOL);

        // Ethereum pair and the JUP/SOL pair are dropped
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].dex_id, "raydium");
        assert_eq!(pairs[1].dex_id, "orca");
    }

    #[test]
    fn test_quote_from_most_liquid_pair() {
        let pairs = load_fixture("token_pairs").solana_pairs_for(SOL);
        let quote = quote_from_pair(SOL, &pairs[0]).unwrap();

        assert_relative_eq!(quote.price_usd, 142.31);
        assert_eq!(quote.price_change_24h_pct, Some(-2.41));
        assert_eq!(quote.source, DataSource::DexScreener);
        assert!(quote.liquidity_usd.unwrap() > 30_000_000.0);
    }

    #[test]
    fn test_token_from_pair() {
        let pairs = load_fixture("token_pairs").solana_pairs_for(JUP);
        let info = token_from_pair(&pairs[0]);

        assert_eq!(info.symbol, "JUP");
        assert_eq!(info.name, "Jupiter");
        assert_eq!(info.decimals, None);
    }

    #[test]
    fn test_null_pairs() {
        assert!(load_fixture("no_pairs").solana_pairs_for(SOL).is_empty());
    }

    #[test]
    fn test_missing_price_is_not_found() {
        let mut pair = load_fixture("token_pairs").solana_pairs_for(SOL).remove(0);
        pair.price_usd = None;
        assert!(matches!(quote_from_pair(SOL, &pair), Err(MarketDataError::NotFound(_))));
    }

    #[test]
    fn test_pair_into_domain() {
        let pair = load_fixture("token_pairs").solana_pairs_for(SOL).remove(0).into_domain();
        assert_eq!(pair.base_symbol, "SOL");
        assert_eq!(pair.quote_symbol, "USDC");
        assert_eq!(pair.pair_address, "58oQChx4yWmvKdwLLZzBi4ChoCc2fqCUWBkwMihLYQo2");
    }
}
