//! Ports Layer - Trait definitions for external dependencies
//!
//! Following hexagonal architecture, the aggregator only sees providers
//! through `MarketDataSource`. Adapters implement it; `mocks` provides a
//! scripted implementation for tests.

pub mod market_data;
pub mod mocks;

pub use market_data::{MarketDataError, MarketDataSource};
pub use mocks::ScriptedSource;
