//! embassy-market - Cache-backed multi-source Solana market data
//!
//! Prices, OHLCV candles, token metadata, DEX pairs and wallet balances from
//! SHYFT, Birdeye, DexScreener, Kraken and Solana RPC. Each request walks a
//! configured source order, results are cached with a TTL, and when every
//! source fails the caller gets a deterministic placeholder tagged
//! `synthetic` instead of an error.
//!
//! # Modules
//!
//! - `domain`: Provider-neutral market types and address helpers
//! - `ports`: The `MarketDataSource` trait every provider implements
//! - `cache`: TTL cache
//! - `resilience`: Rate limiting, retry with backoff, source health
//! - `adapters`: Provider clients and the CLI
//! - `application`: Fallback chain, aggregator, price watcher
//! - `config`: Configuration loading and validation

pub mod domain;
pub mod ports;
pub mod cache;
pub mod resilience;
pub mod adapters;
pub mod application;
pub mod config;
