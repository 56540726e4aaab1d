//! SHYFT API Client
//!
//! Token metadata and wallet balances from SHYFT's REST API. Requests carry
//! the `x-api-key` header; the network defaults to mainnet-beta.

use std::time::Duration;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};

use crate::adapters::http::{build_client, fetch_json};
use crate::domain::{DataSource, TokenHolding, TokenInfo, WalletBalance};
use crate::ports::{MarketDataError, MarketDataSource};
use crate::resilience::RetryPolicy;

use super::types::{ShyftResponse, ShyftSolBalance, ShyftTokenBalance, ShyftTokenInfo};

/// SHYFT client configuration
#[derive(Debug, Clone)]
pub struct ShyftConfig {
    /// Base URL, e.g. `https://api.shyft.to/sol/v1`
    pub api_url: String,
    pub api_key: String,
    /// `mainnet-beta`, `devnet` or `testnet`
    pub network: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for ShyftConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.shyft.to/sol/v1".to_string(),
            api_key: String::new(),
            network: "mainnet-beta".to_string(),
            timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
        }
    }
}

impl ShyftConfig {
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct ShyftClient {
    config: ShyftConfig,
    http: Client,
}

impl ShyftClient {
    pub fn with_config(config: ShyftConfig) -> Result<Self, MarketDataError> {
        if config.api_key.trim().is_empty() {
            return Err(MarketDataError::MissingApiKey(DataSource::Shyft));
        }
        let http = build_client(config.timeout)?;
        Ok(Self { config, http })
    }

    pub fn with_api_key(api_key: impl Into<String>) -> Result<Self, MarketDataError> {
        Self::with_config(ShyftConfig::with_api_key(api_key))
    }

    fn get(&self, path: &str, params: &[(&str, &str)]) -> RequestBuilder {
        let url = format!("{}{}", self.config.api_url.trim_end_matches('/'), path);
        self.http
            .get(url)
            .header("x-api-key", &self.config.api_key)
            .query(&[("network", self.config.network.as_str())])
            .query(params)
    }

    /// Token name, symbol, decimals and supply
    pub async fn get_token_info(&self, mint: &str) -> Result<TokenInfo, MarketDataError> {
        let response: ShyftResponse<ShyftTokenInfo> = fetch_json(&self.config.retry, "shyft token info", || {
            self.get("/token/get_info", &[("token_address", mint)])
        })
        .await?;
        Ok(response.into_result()?.into_domain())
    }

    /// Native SOL balance in SOL
    pub async fn get_sol_balance(&self, owner: &str) -> Result<f64, MarketDataError> {
        let response: ShyftResponse<ShyftSolBalance> = fetch_json(&self.config.retry, "shyft sol balance", || {
            self.get("/wallet/balance", &[("wallet", owner)])
        })
        .await?;
        Ok(response.into_result()?.balance)
    }

    /// All SPL token balances of a wallet
    pub async fn get_token_balances(&self, owner: &str) -> Result<Vec<TokenHolding>, MarketDataError> {
        let response: ShyftResponse<Vec<ShyftTokenBalance>> =
            fetch_json(&self.config.retry, "shyft token balances", || {
                self.get("/wallet/all_tokens", &[("wallet", owner)])
            })
            .await?;
        Ok(response
            .into_result()?
            .into_iter()
            .map(ShyftTokenBalance::into_domain)
            .collect())
    }

    pub fn api_url(&self) -> &str {
        &self.config.api_url
    }

    pub fn network(&self) -> &str {
        &self.config.network
    }
}

#[async_trait]
impl MarketDataSource for ShyftClient {
    fn id(&self) -> DataSource {
        DataSource::Shyft
    }

    async fn token_info(&self, mint: &str) -> Result<TokenInfo, MarketDataError> {
        self.get_token_info(mint).await
    }

    async fn wallet_balance(&self, owner: &str) -> Result<WalletBalance, MarketDataError> {
        let (sol, tokens) = tokio::try_join!(self.get_sol_balance(owner), self.get_token_balances(owner))?;
        Ok(WalletBalance {
            owner: owner.to_string(),
            sol,
            tokens,
            source: DataSource::Shyft,
        })
    }
}
