//! CLI Adapter
//!
//! Command-line interface for embassy-market.
//! Uses clap derive macros for argument parsing.

mod commands;

pub use commands::{
    execute, CliApp, Command, OhlcvCmd, PairsCmd, PriceCmd, SourcesCmd, TokenCmd, WalletCmd,
    WatchCmd,
};
