//! Application Layer
//!
//! - `fallback`: cache-or-fetch over an ordered chain of sources
//! - `aggregator`: the market data facade built on it
//! - `watcher`: interval polling of a single price

pub mod fallback;
pub mod aggregator;
pub mod watcher;

pub use fallback::{cache_or_fetch, AttemptFailure, FallbackChain, SourceFuture};
pub use aggregator::{AggregatorConfig, MarketDataAggregator, SourceOrder, MAX_CANDLES};
pub use watcher::PriceWatcher;
