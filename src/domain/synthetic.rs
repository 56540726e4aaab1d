//! Deterministic Placeholders
//!
//! Values returned when every live source failed. They are seeded from the
//! request key so repeated failures for the same token render the same
//! numbers instead of jittering on every refresh. Every placeholder carries
//! `DataSource::Synthetic` so callers can tell it apart from real data.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::address::{is_stablecoin, known_symbol, short_address};
use super::interval::Interval;
use super::market::{Candle, DataSource, OhlcvSeries, PriceQuote, TokenInfo, WalletBalance};

/// FNV-1a, stable across builds unlike `DefaultHasher`
pub fn seed_for(key: &str) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    key.bytes().fold(OFFSET, |hash, byte| (hash ^ byte as u64).wrapping_mul(PRIME))
}

fn rng_for(key: &str) -> StdRng {
    StdRng::seed_from_u64(seed_for(key))
}

fn placeholder_price_usd(mint: &str) -> f64 {
    if is_stablecoin(mint) {
        return 1.0;
    }
    let mut rng = rng_for(&format!("price:{}", mint));
    let exponent: f64 = rng.gen_range(-6.0..2.0);
    10f64.powf(exponent)
}

pub fn placeholder_price(mint: &str) -> PriceQuote {
    let mut quote = PriceQuote::new(mint, placeholder_price_usd(mint), DataSource::Synthetic);
    quote.price_change_24h_pct = Some(0.0);
    quote
}

/// Random walk anchored at the placeholder price, newest candle in the
/// bucket containing `now`
pub fn placeholder_ohlcv(mint: &str, interval: Interval, limit: usize, now: DateTime<Utc>) -> OhlcvSeries {
    let mut rng = rng_for(&format!("ohlcv:{}:{}", mint, interval));
    let stable = is_stablecoin(mint);
    let max_move = if stable { 0.001 } else { 0.02 };
    let max_wick = if stable { 0.0005 } else { 0.01 };

    let step = ChronoDuration::minutes(interval.minutes() as i64);
    let newest = interval.floor(now);
    let mut price = placeholder_price_usd(mint);
    let mut candles = Vec::with_capacity(limit);

    for i in 0..limit {
        let offset = (limit - 1 - i) as i32;
        let open = price;
        let close = open * (1.0 + rng.gen_range(-max_move..max_move));
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..max_wick));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..max_wick));
        candles.push(Candle {
            timestamp: newest - step * offset,
            open,
            high,
            low,
            close,
            volume: rng.gen_range(1_000.0..100_000.0),
        });
        price = close;
    }

    OhlcvSeries {
        mint: mint.to_string(),
        interval,
        candles,
        source: DataSource::Synthetic,
    }
}

pub fn placeholder_token_info(mint: &str) -> TokenInfo {
    let symbol = known_symbol(mint)
        .map(str::to_string)
        .unwrap_or_else(|| short_address(mint));
    TokenInfo {
        mint: mint.to_string(),
        name: "Unknown Token".to_string(),
        symbol,
        decimals: None,
        logo_uri: None,
        supply: None,
        source: DataSource::Synthetic,
    }
}

pub fn placeholder_wallet(owner: &str) -> WalletBalance {
    WalletBalance {
        owner: owner.to_string(),
        sol: 0.0,
        tokens: Vec::new(),
        source: DataSource::Synthetic,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::address::{SOL_MINT, USDC_MINT};
    use chrono::TimeZone;

    #[test]
    fn test_seed_is_stable() {
        // FNV-1a reference value for the empty string
        assert_eq!(seed_for(""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(seed_for("abc"), seed_for("abc"));
        assert_ne!(seed_for("abc"), seed_for("abd"));
    }

    #[test]
    fn test_placeholder_price_is_deterministic() {
        let a = placeholder_price(SOL_MINT);
        let b = placeholder_price(SOL_MINT);
        assert_eq!(a.price_usd, b.price_usd);
        assert!(a.price_usd > 0.0);
        assert!(a.is_synthetic());
    }

    #[test]
    fn test_stablecoin_placeholder_is_pegged() {
        assert_eq!(placeholder_price(USDC_MINT).price_usd, 1.0);
    }

    #[test]
    fn test_placeholder_ohlcv_shape() {
        let now = Utc.timestamp_opt(1_700_000_123, 0).unwrap();
        let series = placeholder_ohlcv(SOL_MINT, Interval::H1, 24, now);

        assert_eq!(series.candles.len(), 24);
        assert!(series.candles.iter().all(Candle::is_valid));
        assert!(series
            .candles
            .windows(2)
            .all(|w| w[1].timestamp - w[0].timestamp == ChronoDuration::hours(1)));
        assert_eq!(series.candles.last().unwrap().timestamp, Interval::H1.floor(now));
        assert_eq!(series, placeholder_ohlcv(SOL_MINT, Interval::H1, 24, now));
    }

    #[test]
    fn test_placeholder_token_info_uses_known_symbol() {
        assert_eq!(placeholder_token_info(SOL_MINT).symbol, "SOL");
        let unknown = placeholder_token_info("4k3Dyjzvzp8eMZWUXbBCjEvwSkkk59S5iCNLY3QrkX6R");
        assert_eq!(unknown.symbol, "4k3D…kX6R");
        assert!(unknown.is_synthetic());
    }
}
