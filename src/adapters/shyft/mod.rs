//! SHYFT Adapter
//!
//! Token metadata and wallet balances. SHYFT has no price endpoint, so it
//! only serves the metadata and wallet chains.

mod client;
mod types;

pub use client::{ShyftClient, ShyftConfig};
pub use types::{ShyftResponse, ShyftTokenBalance, ShyftTokenInfo};
