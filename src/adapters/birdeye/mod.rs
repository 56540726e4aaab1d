//! Birdeye Adapter
//!
//! Primary source for prices and candles; also serves token overviews.

mod client;
mod types;

pub use client::{BirdeyeClient, BirdeyeConfig};
pub use types::{BirdeyeCandle, BirdeyePrice, BirdeyeResponse, BirdeyeTokenOverview};
