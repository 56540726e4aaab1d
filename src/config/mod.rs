//! Configuration Module
//!
//! Loads and validates configuration from TOML files.

pub mod loader;

pub use loader::{
    load_config, parse_config, BirdeyeSection, CacheSection, Config, ConfigError,
    DexScreenerSection, KrakenSection, LoggingSection, RetrySection, ShyftSection, SolanaSection,
    SourcesSection,
};
