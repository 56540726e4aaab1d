//! In-memory caching for normalized market data

mod ttl_cache;

pub use ttl_cache::{CacheEntry, CacheStats, TtlCache};
