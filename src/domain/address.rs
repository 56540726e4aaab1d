//! Token Address Helpers
//!
//! Validation of Solana base58 addresses and the well-known mints the CLI
//! accepts by symbol. Kraken pair names live here too since Kraken only
//! quotes a handful of Solana assets.

use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use thiserror::Error;

/// Wrapped SOL mint
pub const SOL_MINT: &str = "So11111111111111111111111111111111111111112";
/// USDC mint
pub const USDC_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";
/// USDT mint
pub const USDT_MINT: &str = "Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB";
/// BONK mint
pub const BONK_MINT: &str = "DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263";
/// JUP mint
pub const JUP_MINT: &str = "JUPyiwrYJFskUPiHa7hkeR8VUtAeFoSYbKedZNsDvCN";

/// Well-known mints: (symbol, mint, Kraken pair)
pub const KNOWN_MINTS: &[(&str, &str, &str)] = &[
    ("SOL", SOL_MINT, "SOLUSD"),
    ("USDC", USDC_MINT, "USDCUSD"),
    ("USDT", USDT_MINT, "USDTZUSD"),
    ("BONK", BONK_MINT, "BONKUSD"),
    ("JUP", JUP_MINT, "JUPUSD"),
];

/// USD-pegged mints
pub const STABLECOIN_MINTS: &[&str] = &[USDC_MINT, USDT_MINT];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("Address is empty")]
    Empty,
    #[error("Invalid Solana address '{0}'")]
    Invalid(String),
}

/// Parse a base58 Solana address
pub fn validate_address(address: &str) -> Result<Pubkey, AddressError> {
    let trimmed = address.trim();
    if trimmed.is_empty() {
        return Err(AddressError::Empty);
    }
    Pubkey::from_str(trimmed).map_err(|_| AddressError::Invalid(trimmed.to_string()))
}

/// Resolve a symbol like `SOL` to its mint; anything else is returned as-is
pub fn resolve_symbol(input: &str) -> String {
    let trimmed = input.trim();
    KNOWN_MINTS
        .iter()
        .find(|(symbol, _, _)| symbol.eq_ignore_ascii_case(trimmed))
        .map(|(_, mint, _)| mint.to_string())
        .unwrap_or_else(|| trimmed.to_string())
}

/// Symbol of a well-known mint
pub fn known_symbol(mint: &str) -> Option<&'static str> {
    KNOWN_MINTS
        .iter()
        .find(|(_, m, _)| *m == mint)
        .map(|(symbol, _, _)| *symbol)
}

/// Kraken pair quoting this mint in USD, if Kraken lists it
pub fn kraken_pair(mint: &str) -> Option<&'static str> {
    KNOWN_MINTS
        .iter()
        .find(|(_, m, _)| *m == mint)
        .map(|(_, _, pair)| *pair)
}

pub fn is_stablecoin(mint: &str) -> bool {
    STABLECOIN_MINTS.contains(&mint)
}

/// `AbCd…WxYz` form used when a provider gives no symbol
pub fn short_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 8 {
        return address.to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}…{}", head, tail)
}
