//! SHYFT REST wire types
//!
//! Every SHYFT endpoint wraps its payload in `{ success, message, result }`.

use serde::Deserialize;

use crate::domain::{DataSource, TokenHolding, TokenInfo};
use crate::ports::MarketDataError;

#[derive(Debug, Clone, Deserialize)]
pub struct ShyftResponse<T> {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    pub result: Option<T>,
}

impl<T> ShyftResponse<T> {
    /// Unwrap the envelope, turning `success: false` into an API error
    pub fn into_result(self) -> Result<T, MarketDataError> {
        if !self.success {
            return Err(MarketDataError::Api(format!("shyft: {}", self.message)));
        }
        self.result
            .ok_or_else(|| MarketDataError::Parse(format!("shyft: empty result ({})", self.message)))
    }
}

/// `/token/get_info` result
#[derive(Debug, Clone, Deserialize)]
pub struct ShyftTokenInfo {
    pub address: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub symbol: String,
    pub decimals: Option<u8>,
    pub image: Option<String>,
    pub current_supply: Option<f64>,
    pub mint_authority: Option<String>,
    pub freeze_authority: Option<String>,
}

impl ShyftTokenInfo {
    pub fn into_domain(self) -> TokenInfo {
        TokenInfo {
            mint: self.address,
            name: self.name,
            symbol: self.symbol,
            decimals: self.decimals,
            logo_uri: self.image.filter(|uri| !uri.is_empty()),
            supply: self.current_supply,
            source: DataSource::Shyft,
        }
    }
}

/// `/wallet/balance` result
#[derive(Debug, Clone, Deserialize)]
pub struct ShyftSolBalance {
    /// SOL (not lamports)
    pub balance: f64,
}

/// One entry of `/wallet/all_tokens`
#[derive(Debug, Clone, Deserialize)]
pub struct ShyftTokenBalance {
    /// Mint address
    pub address: String,
    pub balance: f64,
    pub associated_account: Option<String>,
    pub info: Option<ShyftTokenBalanceInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShyftTokenBalanceInfo {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub image: Option<String>,
    pub decimals: Option<u8>,
}

impl ShyftTokenBalance {
    pub fn into_domain(self) -> TokenHolding {
        let (symbol, decimals) = match self.info {
            Some(info) => (info.symbol.filter(|s| !s.is_empty()), info.decimals),
            None => (None, None),
        };
        TokenHolding {
            mint: self.address,
            symbol,
            amount: self.balance,
            decimals,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load_fixture(name: &str) -> String {
        let path = format!("{}/fixtures/shyft/{}.json", env!("CARGO_MANIFEST_DIR"), name);
        std::fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("Failed to load fixture '{}': {}", path, e))
    }

    #[test]
    fn test_token_info_fixture() {
        let response: ShyftResponse<ShyftTokenInfo> =
            serde_json::from_str(&load_fixture("token_info")).unwrap();
        let info = response.into_result().unwrap().into_domain();

        assert_eq!(info.mint, "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v");
        assert_eq!(info.symbol, "USDC");
        assert_eq!(info.decimals, Some(6));
        assert!(info.logo_uri.is_some());
        assert_eq!(info.source, DataSource::Shyft);
    }

    #[test]
    fn test_all_tokens_fixture() {
        let response: ShyftResponse<Vec<ShyftTokenBalance>> =
            serde_json::from_str(&load_fixture("all_tokens")).unwrap();
        let holdings: Vec<TokenHolding> = response
            .into_result()
            .unwrap()
            .into_iter()
            .map(ShyftTokenBalance::into_domain)
            .collect();

        assert_eq!(holdings.len(), 2);
        assert_eq!(holdings[0].symbol.as_deref(), Some("USDC"));
        assert_eq!(holdings[0].amount, 250.5);
        // Missing info block leaves symbol unknown
        assert_eq!(holdings[1].symbol, None);
    }

    #[test]
    fn test_unsuccessful_envelope() {
        let json = r#"{"success":false,"message":"Invalid API key","result":null}"#;
        let response: ShyftResponse<ShyftSolBalance> = serde_json::from_str(json).unwrap();
        let err = response.into_result().unwrap_err();
        assert!(matches!(err, MarketDataError::Api(ref m) if m.contains("Invalid API key")));
    }
}
