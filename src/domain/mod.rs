//! Domain Layer - Provider-neutral market data types
//!
//! Pure types and helpers with no I/O:
//! - `market`: prices, candles, token metadata, pairs, wallet balances
//! - `interval`: candle intervals and their provider spellings
//! - `address`: address validation and well-known mints
//! - `synthetic`: deterministic placeholders for when every source fails

pub mod market;
pub mod interval;
pub mod address;
pub mod synthetic;

pub use market::{
    Candle, DataSource, OhlcvSeries, PriceQuote, TokenHolding, TokenInfo, TokenPair, WalletBalance,
};
pub use interval::Interval;
pub use address::{
    is_stablecoin, known_symbol, kraken_pair, resolve_symbol, short_address, validate_address,
    AddressError, SOL_MINT, USDC_MINT, USDT_MINT,
};
