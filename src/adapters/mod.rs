//! Adapters Layer - External System Implementations
//!
//! Each provider client implements `MarketDataSource` for the operations
//! its API covers:
//! - SHYFT: token metadata and wallet balances
//! - Birdeye: prices, OHLCV and token overviews
//! - DexScreener: pair-derived prices, metadata and pair listings
//! - Kraken: CEX prices and OHLC for listed tokens
//! - Solana: RPC mint supply and native SOL balances
//! - CLI: Command-line interface handlers

pub mod http;
pub mod shyft;
pub mod birdeye;
pub mod dexscreener;
pub mod kraken;
pub mod solana;
pub mod cli;

pub use shyft::ShyftClient;
pub use birdeye::BirdeyeClient;
pub use dexscreener::DexScreenerClient;
pub use kraken::KrakenClient;
pub use solana::SolanaRpcClient;
pub use cli::CliApp;
