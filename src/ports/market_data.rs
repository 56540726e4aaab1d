//! Market Data Port
//!
//! The trait every provider adapter implements. A provider only overrides
//! the operations it supports; the rest report `Unsupported` and are skipped
//! by the fallback chain without counting as a failure.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{
    DataSource, Interval, OhlcvSeries, PriceQuote, TokenInfo, TokenPair, WalletBalance,
};

/// Errors a market data source can report
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarketDataError {
    /// Transport failure (connect, reset, TLS)
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Rate limit exceeded")]
    RateLimited,

    /// Non-success HTTP status
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{provider} does not support {operation}")]
    Unsupported {
        provider: DataSource,
        operation: &'static str,
    },

    /// Provider answered 2xx but flagged the request as failed
    #[error("API error: {0}")]
    Api(String),

    #[error("Missing API key for {0}")]
    MissingApiKey(DataSource),

    #[error("RPC error: {message}")]
    Rpc { message: String, retryable: bool },
}

impl MarketDataError {
    /// Whether another attempt against the same source may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            MarketDataError::Http(_) | MarketDataError::Timeout | MarketDataError::RateLimited => true,
            MarketDataError::Status { status, .. } => *status >= 500,
            MarketDataError::Rpc { retryable, .. } => *retryable,
            _ => false,
        }
    }

    /// Unsupported operations are skipped, not treated as source failures
    pub fn is_unsupported(&self) -> bool {
        matches!(self, MarketDataError::Unsupported { .. })
    }

    /// A healthy source can still answer `NotFound`; only real failures
    /// count toward benching it
    pub fn is_source_failure(&self) -> bool {
        !matches!(
            self,
            MarketDataError::Unsupported { .. } | MarketDataError::NotFound(_)
        )
    }

    pub fn unsupported(provider: DataSource, operation: &'static str) -> Self {
        MarketDataError::Unsupported { provider, operation }
    }
}

impl From<reqwest::Error> for MarketDataError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            MarketDataError::Timeout
        } else if err.is_decode() {
            MarketDataError::Parse(err.to_string())
        } else if let Some(status) = err.status() {
            MarketDataError::Status {
                status: status.as_u16(),
                body: err.to_string(),
            }
        } else {
            MarketDataError::Http(err.to_string())
        }
    }
}

impl From<serde_json::Error> for MarketDataError {
    fn from(err: serde_json::Error) -> Self {
        MarketDataError::Parse(err.to_string())
    }
}

/// A provider of Solana market data
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Which provider this is
    fn id(&self) -> DataSource;

    /// Current USD price of a mint
    async fn price(&self, _mint: &str) -> Result<PriceQuote, MarketDataError> {
        Err(MarketDataError::unsupported(self.id(), "price"))
    }

    /// Recent candles, newest last, at most `limit`
    async fn ohlcv(
        &self,
        _mint: &str,
        _interval: Interval,
        _limit: usize,
    ) -> Result<OhlcvSeries, MarketDataError> {
        Err(MarketDataError::unsupported(self.id(), "ohlcv"))
    }

    /// Name, symbol, decimals and supply of a mint
    async fn token_info(&self, _mint: &str) -> Result<TokenInfo, MarketDataError> {
        Err(MarketDataError::unsupported(self.id(), "token_info"))
    }

    /// SOL and SPL balances of a wallet
    async fn wallet_balance(&self, _owner: &str) -> Result<WalletBalance, MarketDataError> {
        Err(MarketDataError::unsupported(self.id(), "wallet_balance"))
    }

    /// DEX pairs trading the mint, most liquid first
    async fn pairs(&self, _mint: &str) -> Result<Vec<TokenPair>, MarketDataError> {
        Err(MarketDataError::unsupported(self.id(), "pairs"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(MarketDataError::Timeout.is_retryable());
        assert!(MarketDataError::RateLimited.is_retryable());
        assert!(MarketDataError::Http("reset".into()).is_retryable());
        assert!(MarketDataError::Status { status: 503, body: String::new() }.is_retryable());

        assert!(!MarketDataError::Status { status: 401, body: String::new() }.is_retryable());
        assert!(!MarketDataError::NotFound("x".into()).is_retryable());
        assert!(!MarketDataError::Parse("x".into()).is_retryable());
        assert!(!MarketDataError::unsupported(DataSource::Kraken, "ohlcv").is_retryable());
    }

    #[test]
    fn test_source_failure_classification() {
        assert!(MarketDataError::Timeout.is_source_failure());
        assert!(MarketDataError::Api("bad".into()).is_source_failure());
        assert!(!MarketDataError::NotFound("x".into()).is_source_failure());
        assert!(!MarketDataError::unsupported(DataSource::Kraken, "ohlcv").is_source_failure());
    }

    #[test]
    fn test_error_display() {
        let err = MarketDataError::unsupported(DataSource::Shyft, "price");
        assert_eq!(err.to_string(), "shyft does not support price");

        let err = MarketDataError::Status { status: 502, body: "bad gateway".into() };
        assert!(err.to_string().contains("502"));
    }

    struct MetadataOnly;

    #[async_trait]
    impl MarketDataSource for MetadataOnly {
        fn id(&self) -> DataSource {
            DataSource::SolanaRpc
        }
    }

    #[tokio::test]
    async fn test_default_operations_are_unsupported() {
        let source = MetadataOnly;
        let err = source.price("mint").await.unwrap_err();
        assert!(err.is_unsupported());
        assert!(source.wallet_balance("owner").await.unwrap_err().is_unsupported());
        assert!(source.pairs("mint").await.unwrap_err().is_unsupported());
    }
}
