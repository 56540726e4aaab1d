//! Kraken Adapter

mod client;
mod types;

pub use client::{KrakenClient, KrakenConfig};
pub use types::{KrakenResponse, KrakenTicker};
