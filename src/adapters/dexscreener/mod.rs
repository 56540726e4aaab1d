//! DexScreener Adapter
//!
//! Keyless price, metadata and pair discovery across Solana DEXes.

mod client;
mod types;

pub use client::{DexScreenerClient, DexScreenerConfig};
pub use types::{DexPair, DexTokenPairs};
