//! Configuration Loader
//!
//! Loads and validates `embassy-market` configuration from TOML. Every
//! section is optional and falls back to its defaults, so an empty file is a
//! valid configuration. API keys and the RPC endpoint can come from the
//! environment instead of the file.

use serde::Deserialize;
use solana_sdk::commitment_config::CommitmentConfig;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::adapters::birdeye::BirdeyeConfig;
use crate::adapters::dexscreener::DexScreenerConfig;
use crate::adapters::kraken::KrakenConfig;
use crate::adapters::shyft::ShyftConfig;
use crate::adapters::solana::SolanaRpcConfig;
use crate::application::{AggregatorConfig, SourceOrder};
use crate::domain::DataSource;
use crate::resilience::{HealthPolicy, RetryPolicy};

/// Main configuration structure matching config/default.toml
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub cache: CacheSection,
    pub sources: SourcesSection,
    pub shyft: ShyftSection,
    pub birdeye: BirdeyeSection,
    pub dexscreener: DexScreenerSection,
    pub kraken: KrakenSection,
    pub solana: SolanaSection,
    pub retry: RetrySection,
    pub logging: LoggingSection,
}

/// Cache configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    /// Time-to-live of every cached value in seconds
    pub ttl_secs: u64,
    /// Maximum entries per cache
    pub max_entries: usize,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            ttl_secs: 30,
            max_entries: 1000,
        }
    }
}

/// Source ordering and health configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourcesSection {
    pub price: Vec<DataSource>,
    pub ohlcv: Vec<DataSource>,
    pub metadata: Vec<DataSource>,
    pub wallet: Vec<DataSource>,
    pub pairs: Vec<DataSource>,
    /// Consecutive failures before a source is benched
    pub failure_threshold: u32,
    /// How long a benched source is skipped, in seconds
    pub cooldown_secs: u64,
}

impl Default for SourcesSection {
    fn default() -> Self {
        let order = SourceOrder::default();
        let health = HealthPolicy::default();
        Self {
            price: order.price,
            ohlcv: order.ohlcv,
            metadata: order.metadata,
            wallet: order.wallet,
            pairs: order.pairs,
            failure_threshold: health.failure_threshold,
            cooldown_secs: health.cooldown.as_secs(),
        }
    }
}

/// SHYFT API configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ShyftSection {
    pub enabled: bool,
    pub api_url: String,
    /// Prefer SHYFT_API_KEY in `.env` over committing the key here
    pub api_key: Option<String>,
    /// `mainnet-beta`, `devnet` or `testnet`
    pub network: String,
}

impl Default for ShyftSection {
    fn default() -> Self {
        let defaults = ShyftConfig::default();
        Self {
            enabled: true,
            api_url: defaults.api_url,
            api_key: None,
            network: defaults.network,
        }
    }
}

impl ShyftSection {
    /// Get API key with environment variable fallback
    /// Checks SHYFT_API_KEY env var if config value is empty/None
    pub fn get_api_key(&self) -> Option<String> {
        key_or_env(&self.api_key, "SHYFT_API_KEY")
    }
}

/// Birdeye API configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BirdeyeSection {
    pub enabled: bool,
    pub api_url: String,
    pub api_key: Option<String>,
}

impl Default for BirdeyeSection {
    fn default() -> Self {
        Self {
            enabled: true,
            api_url: BirdeyeConfig::default().api_url,
            api_key: None,
        }
    }
}

impl BirdeyeSection {
    /// Get API key with environment variable fallback
    /// Checks BIRDEYE_API_KEY env var if config value is empty/None
    pub fn get_api_key(&self) -> Option<String> {
        key_or_env(&self.api_key, "BIRDEYE_API_KEY")
    }
}

/// DexScreener configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DexScreenerSection {
    pub enabled: bool,
    pub api_url: String,
    /// Sustained request budget
    pub requests_per_minute: u32,
    /// Token bucket capacity
    pub burst: u32,
}

impl Default for DexScreenerSection {
    fn default() -> Self {
        let defaults = DexScreenerConfig::default();
        Self {
            enabled: true,
            api_url: defaults.api_url,
            requests_per_minute: defaults.requests_per_minute,
            burst: defaults.burst,
        }
    }
}

/// Kraken configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KrakenSection {
    pub enabled: bool,
    pub api_url: String,
}

impl Default for KrakenSection {
    fn default() -> Self {
        Self {
            enabled: true,
            api_url: KrakenConfig::default().api_url,
        }
    }
}

/// Solana RPC configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SolanaSection {
    pub enabled: bool,
    pub rpc_url: String,
    /// Commitment level: "processed", "confirmed", "finalized"
    pub commitment: String,
}

impl Default for SolanaSection {
    fn default() -> Self {
        Self {
            enabled: true,
            rpc_url: SolanaRpcConfig::default().rpc_url,
            commitment: "confirmed".to_string(),
        }
    }
}

impl SolanaSection {
    /// Get RPC URL with environment variable override
    /// Checks SOLANA_RPC_URL env var first, falls back to config value
    pub fn get_rpc_url(&self) -> String {
        std::env::var("SOLANA_RPC_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| self.rpc_url.clone())
    }
}

/// Retry and timeout configuration section, shared by every provider
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrySection {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
    /// Fraction of each delay randomized, 0.0-1.0
    pub jitter: f64,
    /// Per-request HTTP timeout in seconds
    pub timeout_secs: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            base_delay_ms: policy.base_delay.as_millis() as u64,
            max_delay_ms: policy.max_delay.as_millis() as u64,
            multiplier: policy.multiplier,
            jitter: policy.jitter,
            timeout_secs: 10,
        }
    }
}

impl RetrySection {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            multiplier: self.multiplier,
            jitter: self.jitter,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Logging configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Filter directive: "info", "debug", "embassy_market=trace", ...
    pub level: String,
    /// Also write logs to this file (`~` is expanded)
    pub log_file: Option<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            log_file: None,
        }
    }
}

impl LoggingSection {
    pub fn log_file_path(&self) -> Option<PathBuf> {
        self.log_file
            .as_deref()
            .filter(|path| !path.trim().is_empty())
            .map(|path| PathBuf::from(shellexpand::tilde(path).as_ref()))
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// Load configuration from a TOML file (`~` is expanded)
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let raw = path.as_ref().to_string_lossy();
    let expanded = shellexpand::tilde(raw.as_ref()).to_string();
    let content = std::fs::read_to_string(expanded)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

fn key_or_env(value: &Option<String>, var: &str) -> Option<String> {
    if let Some(key) = value {
        if !key.trim().is_empty() {
            return Some(key.clone());
        }
    }
    std::env::var(var).ok().filter(|key| !key.trim().is_empty())
}

fn validate_order(kind: &str, order: &[DataSource]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for source in order {
        if *source == DataSource::Synthetic {
            return Err(ConfigError::ValidationError(format!(
                "sources.{} cannot list synthetic; placeholders are always the last resort",
                kind
            )));
        }
        if !seen.insert(*source) {
            return Err(ConfigError::ValidationError(format!(
                "sources.{} lists {} more than once",
                kind, source
            )));
        }
    }
    Ok(())
}

impl Config {
    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Cache
        if self.cache.ttl_secs == 0 {
            return Err(ConfigError::ValidationError(
                "cache.ttl_secs must be > 0".to_string(),
            ));
        }

        if self.cache.max_entries == 0 {
            return Err(ConfigError::ValidationError(
                "cache.max_entries must be > 0".to_string(),
            ));
        }

        // Sources
        validate_order("price", &self.sources.price)?;
        validate_order("ohlcv", &self.sources.ohlcv)?;
        validate_order("metadata", &self.sources.metadata)?;
        validate_order("wallet", &self.sources.wallet)?;
        validate_order("pairs", &self.sources.pairs)?;

        if self.sources.failure_threshold == 0 {
            return Err(ConfigError::ValidationError(
                "sources.failure_threshold must be > 0".to_string(),
            ));
        }

        // Providers
        for (name, enabled, url) in [
            ("shyft", self.shyft.enabled, &self.shyft.api_url),
            ("birdeye", self.birdeye.enabled, &self.birdeye.api_url),
            ("dexscreener", self.dexscreener.enabled, &self.dexscreener.api_url),
            ("kraken", self.kraken.enabled, &self.kraken.api_url),
            ("solana", self.solana.enabled, &self.solana.rpc_url),
        ] {
            if enabled && url.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "{} url cannot be empty",
                    name
                )));
            }
        }

        if self.dexscreener.requests_per_minute == 0 || self.dexscreener.burst == 0 {
            return Err(ConfigError::ValidationError(format!(
                "dexscreener rate limit must be > 0, got {} rpm / burst {}",
                self.dexscreener.requests_per_minute, self.dexscreener.burst
            )));
        }

        if CommitmentConfig::from_str(&self.solana.commitment).is_err() {
            return Err(ConfigError::ValidationError(format!(
                "solana.commitment must be processed, confirmed or finalized, got '{}'",
                self.solana.commitment
            )));
        }

        // Retry
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "retry.max_attempts must be >= 1".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.retry.jitter) {
            return Err(ConfigError::ValidationError(format!(
                "retry.jitter must be 0-1, got {}",
                self.retry.jitter
            )));
        }

        if self.retry.multiplier < 1.0 {
            return Err(ConfigError::ValidationError(format!(
                "retry.multiplier must be >= 1, got {}",
                self.retry.multiplier
            )));
        }

        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(ConfigError::ValidationError(format!(
                "retry.base_delay_ms ({}) exceeds retry.max_delay_ms ({})",
                self.retry.base_delay_ms, self.retry.max_delay_ms
            )));
        }

        if self.retry.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "retry.timeout_secs must be > 0".to_string(),
            ));
        }

        // Logging
        if EnvFilter::try_new(&self.logging.level).is_err() {
            return Err(ConfigError::ValidationError(format!(
                "logging.level '{}' is not a valid filter",
                self.logging.level
            )));
        }

        Ok(())
    }

    pub fn shyft_client_config(&self) -> ShyftConfig {
        ShyftConfig {
            api_url: self.shyft.api_url.clone(),
            api_key: self.shyft.get_api_key().unwrap_or_default(),
            network: self.shyft.network.clone(),
            timeout: self.retry.timeout(),
            retry: self.retry.policy(),
        }
    }

    pub fn birdeye_client_config(&self) -> BirdeyeConfig {
        BirdeyeConfig {
            api_url: self.birdeye.api_url.clone(),
            api_key: self.birdeye.get_api_key().unwrap_or_default(),
            timeout: self.retry.timeout(),
            retry: self.retry.policy(),
        }
    }

    pub fn dexscreener_client_config(&self) -> DexScreenerConfig {
        DexScreenerConfig {
            api_url: self.dexscreener.api_url.clone(),
            timeout: self.retry.timeout(),
            retry: self.retry.policy(),
            requests_per_minute: self.dexscreener.requests_per_minute,
            burst: self.dexscreener.burst,
        }
    }

    pub fn kraken_client_config(&self) -> KrakenConfig {
        KrakenConfig {
            api_url: self.kraken.api_url.clone(),
            timeout: self.retry.timeout(),
            retry: self.retry.policy(),
        }
    }

    pub fn solana_client_config(&self) -> Result<SolanaRpcConfig, ConfigError> {
        let commitment = CommitmentConfig::from_str(&self.solana.commitment).map_err(|_| {
            ConfigError::ValidationError(format!(
                "unknown commitment '{}'",
                self.solana.commitment
            ))
        })?;
        Ok(SolanaRpcConfig {
            rpc_url: self.solana.get_rpc_url(),
            commitment,
            timeout: self.retry.timeout(),
            retry: self.retry.policy(),
        })
    }
}

impl From<&Config> for AggregatorConfig {
    fn from(config: &Config) -> Self {
        AggregatorConfig {
            cache_ttl: Duration::from_secs(config.cache.ttl_secs),
            max_entries: config.cache.max_entries,
            order: SourceOrder {
                price: config.sources.price.clone(),
                ohlcv: config.sources.ohlcv.clone(),
                metadata: config.sources.metadata.clone(),
                wallet: config.sources.wallet.clone(),
                pairs: config.sources.pairs.clone(),
            },
            health: HealthPolicy {
                failure_threshold: config.sources.failure_threshold,
                cooldown: Duration::from_secs(config.sources.cooldown_secs),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_valid_config() -> String {
        r#"
[cache]
ttl_secs = 15
max_entries = 500

[sources]
price = ["kraken", "dexscreener"]
ohlcv = ["birdeye"]
metadata = ["shyft", "solana_rpc"]
wallet = ["solana_rpc"]
failure_threshold = 2
cooldown_secs = 120

[shyft]
api_key = "shyft-test-key"
network = "devnet"

[birdeye]
enabled = false

[dexscreener]
requests_per_minute = 120
burst = 4

[solana]
rpc_url = "https://api.devnet.solana.com"
commitment = "finalized"

[retry]
max_attempts = 5
base_delay_ms = 100
max_delay_ms = 2000
multiplier = 3.0
jitter = 0.1
timeout_secs = 5

[logging]
level = "embassy_market=debug"
log_file = "~/.embassy-market/market.log"
"#
        .to_string()
    }

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let file = write_config(&create_valid_config());
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.cache.ttl_secs, 15);
        assert_eq!(config.sources.price, vec![DataSource::Kraken, DataSource::DexScreener]);
        assert_eq!(config.sources.metadata, vec![DataSource::Shyft, DataSource::SolanaRpc]);
        assert_eq!(config.shyft.network, "devnet");
        assert!(!config.birdeye.enabled);
        assert_eq!(config.retry.max_attempts, 5);
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = parse_config("").unwrap();

        assert_eq!(config.cache.ttl_secs, 30);
        assert_eq!(config.sources.price, SourceOrder::default().price);
        assert_eq!(config.dexscreener.requests_per_minute, 300);
        assert_eq!(config.solana.commitment, "confirmed");
        assert!(config.shyft.enabled);
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_config("/nonexistent/path/config.toml");
        assert!(matches!(result.unwrap_err(), ConfigError::IoError(_)));
    }

    #[test]
    fn test_malformed_toml() {
        let result = parse_config("[cache\nttl_secs = 1");
        assert!(matches!(result.unwrap_err(), ConfigError::ParseError(_)));
    }

    #[test]
    fn test_unknown_source_name_is_parse_error() {
        let result = parse_config("[sources]\nprice = [\"coingecko\"]");
        assert!(matches!(result.unwrap_err(), ConfigError::ParseError(_)));
    }

    #[test]
    fn test_synthetic_in_order_rejected() {
        let result = parse_config("[sources]\nprice = [\"birdeye\", \"synthetic\"]");
        assert!(matches!(result.unwrap_err(), ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_duplicate_source_rejected() {
        let result = parse_config("[sources]\nwallet = [\"shyft\", \"shyft\"]");
        assert!(matches!(result.unwrap_err(), ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_invalid_values_rejected() {
        for invalid in [
            "[cache]\nttl_secs = 0",
            "[retry]\nmax_attempts = 0",
            "[retry]\njitter = 1.5",
            "[retry]\nbase_delay_ms = 5000\nmax_delay_ms = 100",
            "[dexscreener]\nburst = 0",
            "[solana]\ncommitment = \"eventually\"",
            "[sources]\nfailure_threshold = 0",
        ] {
            let result = parse_config(invalid);
            assert!(
                matches!(result, Err(ConfigError::ValidationError(_))),
                "expected validation error for {:?}",
                invalid
            );
        }
    }

    #[test]
    fn test_config_to_aggregator_config() {
        let config = parse_config(&create_valid_config()).unwrap();
        let aggregator = AggregatorConfig::from(&config);

        assert_eq!(aggregator.cache_ttl, Duration::from_secs(15));
        assert_eq!(aggregator.max_entries, 500);
        assert_eq!(aggregator.order.wallet, vec![DataSource::SolanaRpc]);
        assert_eq!(aggregator.health.failure_threshold, 2);
        assert_eq!(aggregator.health.cooldown, Duration::from_secs(120));
    }

    #[test]
    fn test_client_configs_share_retry_section() {
        let config = parse_config(&create_valid_config()).unwrap();

        let shyft = config.shyft_client_config();
        assert_eq!(shyft.api_key, "shyft-test-key");
        assert_eq!(shyft.network, "devnet");
        assert_eq!(shyft.timeout, Duration::from_secs(5));
        assert_eq!(shyft.retry.max_attempts, 5);

        let dex = config.dexscreener_client_config();
        assert_eq!(dex.requests_per_minute, 120);
        assert_eq!(dex.burst, 4);
        assert_eq!(dex.retry.base_delay, Duration::from_millis(100));
    }

    #[test]
    fn test_config_key_wins_over_environment() {
        let section = ShyftSection {
            api_key: Some("from-file".to_string()),
            ..Default::default()
        };
        assert_eq!(section.get_api_key().as_deref(), Some("from-file"));
    }

    #[test]
    fn test_log_file_tilde_expanded() {
        let config = parse_config(&create_valid_config()).unwrap();
        let path = config.logging.log_file_path().unwrap();
        assert!(!path.to_string_lossy().starts_with('~'));
        assert!(path.ends_with(".embassy-market/market.log"));
    }
}
