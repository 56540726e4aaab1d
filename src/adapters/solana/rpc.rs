use solana_client::client_error::{ClientError, ClientErrorKind};
use solana_client::rpc_client::RpcClient;
use solana_client::rpc_request::RpcError;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;

use crate::domain::{known_symbol, short_address, DataSource, TokenInfo, WalletBalance};
use crate::ports::{MarketDataError, MarketDataSource};
use crate::resilience::{retry_with_backoff, RetryPolicy};

pub const LAMPORTS_PER_SOL: f64 = 1_000_000_000.0;

/// JSON-RPC error codes a healthy node may answer on the next attempt
const RETRYABLE_RPC_CODES: &[i64] = &[
    -32004, // block not available
    -32005, // node unhealthy / behind
    -32007, // slot skipped
    -32014, // block status not yet available
];

#[derive(Debug, Clone)]
pub struct SolanaRpcConfig {
    pub rpc_url: String,
    pub commitment: CommitmentConfig,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for SolanaRpcConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://api.mainnet-beta.solana.com".to_string(),
            commitment: CommitmentConfig::confirmed(),
            timeout: Duration::from_secs(15),
            retry: RetryPolicy::default(),
        }
    }
}

/// Solana JSON-RPC as a market data source
///
/// The RPC client is blocking; every call runs on the blocking pool.
#[derive(Clone)]
pub struct SolanaRpcClient {
    client: Arc<RpcClient>,
    rpc_url: String,
    retry: RetryPolicy,
}

impl SolanaRpcClient {
    pub fn new(rpc_url: impl Into<String>) -> Self {
        Self::with_config(SolanaRpcConfig {
            rpc_url: rpc_url.into(),
            ..Default::default()
        })
    }

    pub fn with_config(config: SolanaRpcConfig) -> Self {
        let client = Arc::new(RpcClient::new_with_timeout_and_commitment(
            config.rpc_url.clone(),
            config.timeout,
            config.commitment,
        ));
        Self {
            client,
            rpc_url: config.rpc_url,
            retry: config.retry,
        }
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    /// Run one blocking RPC call per attempt under the retry policy
    async fn call<T, F>(&self, label: &str, f: F) -> Result<T, MarketDataError>
    where
        T: Send + 'static,
        F: Fn(&RpcClient) -> Result<T, ClientError> + Send + Sync + Clone + 'static,
    {
        retry_with_backoff(
            &self.retry,
            label,
            || {
                let client = Arc::clone(&self.client);
                let f = f.clone();
                async move {
                    tokio::task::spawn_blocking(move || f(client.as_ref()).map_err(map_client_error))
                        .await
                        .map_err(|e| MarketDataError::Rpc {
                            message: format!("Task join error: {}", e),
                            retryable: false,
                        })?
                }
            },
            MarketDataError::is_retryable,
        )
        .await
    }

    /// Lamports held by `owner`
    pub async fn get_balance(&self, owner: &str) -> Result<u64, MarketDataError> {
        let pubkey = parse_pubkey(owner)?;
        self.call("solana getBalance", move |client| client.get_balance(&pubkey))
            .await
    }

    pub async fn get_slot(&self) -> Result<u64, MarketDataError> {
        self.call("solana getSlot", |client| client.get_slot()).await
    }

    /// Supply of a mint as (ui amount, decimals)
    pub async fn get_token_supply(&self, mint: &str) -> Result<(f64, u8), MarketDataError> {
        let pubkey = parse_pubkey(mint)?;
        let amount = self
            .call("solana getTokenSupply", move |client| client.get_token_supply(&pubkey))
            .await?;
        let ui = ui_amount(amount.ui_amount, &amount.amount, amount.decimals)?;
        Ok((ui, amount.decimals))
    }

    /// Balance of one SPL token account as (ui amount, decimals)
    pub async fn get_token_account_balance(&self, account: &str) -> Result<(f64, u8), MarketDataError> {
        let pubkey = parse_pubkey(account)?;
        let amount = self
            .call("solana getTokenAccountBalance", move |client| {
                client.get_token_account_balance(&pubkey)
            })
            .await?;
        let ui = ui_amount(amount.ui_amount, &amount.amount, amount.decimals)?;
        Ok((ui, amount.decimals))
    }
}

#[async_trait]
impl MarketDataSource for SolanaRpcClient {
    fn id(&self) -> DataSource {
        DataSource::SolanaRpc
    }

    /// Decimals and supply from the mint account; RPC has no names
    async fn token_info(&self, mint: &str) -> Result<TokenInfo, MarketDataError> {
        let (supply, decimals) = self.get_token_supply(mint).await?;
        let symbol = known_symbol(mint)
            .map(str::to_string)
            .unwrap_or_else(|| short_address(mint));
        Ok(TokenInfo {
            mint: mint.to_string(),
            name: symbol.clone(),
            symbol,
            decimals: Some(decimals),
            logo_uri: None,
            supply: Some(supply),
            source: DataSource::SolanaRpc,
        })
    }

    /// Native SOL only; token accounts need an indexer
    async fn wallet_balance(&self, owner: &str) -> Result<WalletBalance, MarketDataError> {
        let lamports = self.get_balance(owner).await?;
        Ok(WalletBalance {
            owner: owner.to_string(),
            sol: lamports as f64 / LAMPORTS_PER_SOL,
            tokens: Vec::new(),
            source: DataSource::SolanaRpc,
        })
    }
}

fn parse_pubkey(address: &str) -> Result<Pubkey, MarketDataError> {
    Pubkey::from_str(address.trim())
        .map_err(|e| MarketDataError::Parse(format!("invalid address '{}': {}", address, e)))
}

fn ui_amount(ui: Option<f64>, raw: &str, decimals: u8) -> Result<f64, MarketDataError> {
    if let Some(ui) = ui {
        return Ok(ui);
    }
    let raw: u64 = raw
        .parse()
        .map_err(|e| MarketDataError::Parse(format!("token amount '{}': {}", raw, e)))?;
    Ok(raw as f64 / 10f64.powi(decimals as i32))
}

/// Transport failures and lagging-node answers are retryable; everything
/// else (bad params, missing accounts) is final
pub fn map_client_error(err: ClientError) -> MarketDataError {
    let retryable = match err.kind() {
        ClientErrorKind::Io(_) | ClientErrorKind::Reqwest(_) => true,
        ClientErrorKind::RpcError(RpcError::RpcRequestError(_)) => true,
        ClientErrorKind::RpcError(RpcError::RpcResponseError { code, .. }) => {
            RETRYABLE_RPC_CODES.contains(code)
        }
        _ => false,
    };
    MarketDataError::Rpc {
        message: err.to_string(),
        retryable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_client::rpc_request::RpcResponseErrorData;

    fn response_error(code: i64) -> ClientError {
        ClientError::from(ClientErrorKind::RpcError(RpcError::RpcResponseError {
            code,
            message: "test".to_string(),
            data: RpcResponseErrorData::Empty,
        }))
    }

    #[test]
    fn test_client_creation() {
        let client = SolanaRpcClient::new("https://api.devnet.solana.com");
        assert_eq!(client.rpc_url(), "https://api.devnet.solana.com");
        assert_eq!(client.id(), DataSource::SolanaRpc);
    }

    #[test]
    fn test_lagging_node_is_retryable() {
        assert!(map_client_error(response_error(-32005)).is_retryable());
        assert!(!map_client_error(response_error(-32602)).is_retryable());
    }

    #[test]
    fn test_io_error_is_retryable() {
        let err = ClientError::from(ClientErrorKind::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "reset",
        )));
        assert!(map_client_error(err).is_retryable());
    }

    #[test]
    fn test_custom_error_is_final() {
        let err = ClientError::from(ClientErrorKind::Custom("boom".to_string()));
        let mapped = map_client_error(err);
        assert!(matches!(mapped, MarketDataError::Rpc { retryable: false, .. }));
    }

    #[test]
    fn test_ui_amount_falls_back_to_raw() {
        assert_eq!(ui_amount(Some(1.5), "1500000", 6).unwrap(), 1.5);
        assert_eq!(ui_amount(None, "2500000000", 9).unwrap(), 2.5);
        assert!(ui_amount(None, "abc", 9).is_err());
    }

    #[tokio::test]
    async fn test_invalid_owner_fails_before_rpc() {
        let client = SolanaRpcClient::new("http://127.0.0.1:1");
        let err = client.get_balance("not-a-key").await.unwrap_err();
        assert!(matches!(err, MarketDataError::Parse(_)));
    }

    #[tokio::test]
    async fn test_price_is_unsupported() {
        let client = SolanaRpcClient::new("http://127.0.0.1:1");
        assert!(client.price("mint").await.unwrap_err().is_unsupported());
    }
}
