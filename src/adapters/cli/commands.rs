//! CLI Command Handlers
//!
//! Every command resolves its token arguments (`SOL`, `USDC`, or a raw mint),
//! asks the aggregator, and prints either a short text summary or JSON.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::application::{MarketDataAggregator, PriceWatcher};
use crate::cache::CacheStats;
use crate::domain::{
    known_symbol, resolve_symbol, short_address, DataSource, Interval, OhlcvSeries, PriceQuote,
    TokenInfo, TokenPair, WalletBalance,
};
use crate::resilience::SourceStatus;

/// embassy-market - Solana market data from SHYFT, Birdeye, DexScreener and Kraken
#[derive(Parser, Debug)]
#[command(
    name = "embassy-market",
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    about = "Cache-backed Solana market data aggregator",
    long_about = "Fetches prices, candles, token metadata, DEX pairs and wallet balances, \
                  trying each configured provider in order and falling back to clearly \
                  marked placeholders when every provider fails."
)]
pub struct CliApp {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,

    /// Path to configuration file (defaults to config/default.toml when present)
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Spot price of one or more tokens
    Price(PriceCmd),

    /// OHLCV candles
    Ohlcv(OhlcvCmd),

    /// Token metadata
    Token(TokenCmd),

    /// DEX pairs trading a token
    Pairs(PairsCmd),

    /// SOL and SPL balances of a wallet
    Wallet(WalletCmd),

    /// Poll a price until Ctrl+C
    Watch(WatchCmd),

    /// Registered sources, their health and cache usage
    Sources(SourcesCmd),
}

/// Spot price
#[derive(Parser, Debug)]
pub struct PriceCmd {
    /// Token symbols or mint addresses
    #[arg(value_name = "TOKEN", required = true)]
    pub tokens: Vec<String>,
}

/// OHLCV candles
#[derive(Parser, Debug)]
pub struct OhlcvCmd {
    /// Token symbol or mint address
    #[arg(value_name = "TOKEN")]
    pub token: String,

    /// Candle interval (1m, 5m, 15m, 30m, 1h, 4h, 1d)
    #[arg(short, long, value_name = "INTERVAL", default_value = "15m")]
    pub interval: Interval,

    /// Number of candles
    #[arg(short, long, value_name = "N", default_value = "100")]
    pub limit: usize,
}

/// Token metadata
#[derive(Parser, Debug)]
pub struct TokenCmd {
    /// Token symbol or mint address
    #[arg(value_name = "TOKEN")]
    pub token: String,
}

/// DEX pairs
#[derive(Parser, Debug)]
pub struct PairsCmd {
    /// Token symbol or mint address
    #[arg(value_name = "TOKEN")]
    pub token: String,

    /// Show at most this many pairs
    #[arg(short, long, value_name = "N", default_value = "10")]
    pub top: usize,
}

/// Wallet balances
#[derive(Parser, Debug)]
pub struct WalletCmd {
    /// Wallet address
    #[arg(value_name = "ADDRESS")]
    pub owner: String,
}

/// Poll a price
#[derive(Parser, Debug)]
pub struct WatchCmd {
    /// Token symbol or mint address
    #[arg(value_name = "TOKEN")]
    pub token: String,

    /// Seconds between polls
    #[arg(short, long, value_name = "SECS", default_value = "5")]
    pub every: u64,

    /// Stop after this many quotes
    #[arg(short = 'n', long, value_name = "N")]
    pub count: Option<usize>,
}

/// Source status
#[derive(Parser, Debug)]
pub struct SourcesCmd {}

/// Execute the CLI command against an assembled aggregator
pub async fn execute(command: Command, aggregator: Arc<MarketDataAggregator>, json: bool) -> Result<()> {
    match command {
        Command::Price(cmd) => price_command(&aggregator, cmd, json).await,
        Command::Ohlcv(cmd) => ohlcv_command(&aggregator, cmd, json).await,
        Command::Token(cmd) => token_command(&aggregator, cmd, json).await,
        Command::Pairs(cmd) => pairs_command(&aggregator, cmd, json).await,
        Command::Wallet(cmd) => wallet_command(&aggregator, cmd, json).await,
        Command::Watch(cmd) => watch_command(aggregator, cmd, json).await,
        Command::Sources(_) => sources_command(&aggregator, json).await,
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", out);
    Ok(())
}

/// Label for a mint: its symbol when well known, else the short address
fn label(mint: &str) -> String {
    known_symbol(mint)
        .map(str::to_string)
        .unwrap_or_else(|| short_address(mint))
}

fn format_usd(value: f64) -> String {
    if value >= 1.0 {
        format!("${:.4}", value)
    } else {
        format!("${:.8}", value)
    }
}

fn format_compact(value: f64) -> String {
    if value >= 1e9 {
        format!("${:.2}B", value / 1e9)
    } else if value >= 1e6 {
        format!("${:.2}M", value / 1e6)
    } else if value >= 1e3 {
        format!("${:.2}K", value / 1e3)
    } else {
        format!("${:.2}", value)
    }
}

fn synthetic_marker(synthetic: bool) -> &'static str {
    if synthetic {
        "  [placeholder - all sources failed]"
    } else {
        ""
    }
}

fn quote_line(quote: &PriceQuote) -> String {
    let mut line = format!(
        "{:<10} {:>16}  ({})",
        label(&quote.mint),
        format_usd(quote.price_usd),
        quote.source
    );
    if let Some(change) = quote.price_change_24h_pct {
        line.push_str(&format!("  24h {:+.2}%", change));
    }
    if let Some(volume) = quote.volume_24h_usd {
        line.push_str(&format!("  vol {}", format_compact(volume)));
    }
    line.push_str(synthetic_marker(quote.is_synthetic()));
    line
}

/// Handle price command
async fn price_command(aggregator: &MarketDataAggregator, cmd: PriceCmd, json: bool) -> Result<()> {
    let mints: Vec<String> = cmd.tokens.iter().map(|t| resolve_symbol(t)).collect();
    tracing::info!("Fetching {} price(s)", mints.len());

    let quotes = aggregator.get_prices(&mints).await;
    if json {
        return print_json(&quotes);
    }

    for quote in &quotes {
        println!("{}", quote_line(quote));
    }
    Ok(())
}

fn print_series(series: &OhlcvSeries) {
    println!(
        "{} {} candles from {}{}",
        label(&series.mint),
        series.interval,
        series.source,
        synthetic_marker(series.is_synthetic())
    );
    println!(
        "{:<20} {:>14} {:>14} {:>14} {:>14} {:>16}",
        "time (UTC)", "open", "high", "low", "close", "volume"
    );
    for candle in &series.candles {
        println!(
            "{:<20} {:>14.6} {:>14.6} {:>14.6} {:>14.6} {:>16.2}",
            candle.timestamp.format("%Y-%m-%d %H:%M"),
            candle.open,
            candle.high,
            candle.low,
            candle.close,
            candle.volume
        );
    }
}

/// Handle ohlcv command
async fn ohlcv_command(aggregator: &MarketDataAggregator, cmd: OhlcvCmd, json: bool) -> Result<()> {
    let mint = resolve_symbol(&cmd.token);
    let series = aggregator.get_ohlcv(&mint, cmd.interval, cmd.limit).await;

    if json {
        return print_json(&series);
    }
    print_series(&series);
    Ok(())
}

fn print_token(info: &TokenInfo) {
    println!("{} ({}){}", info.name, info.symbol, synthetic_marker(info.is_synthetic()));
    println!("  Mint:     {}", info.mint);
    if let Some(decimals) = info.decimals {
        println!("  Decimals: {}", decimals);
    }
    if let Some(supply) = info.supply {
        println!("  Supply:   {:.2}", supply);
    }
    if let Some(ref logo) = info.logo_uri {
        println!("  Logo:     {}", logo);
    }
    println!("  Source:   {}", info.source);
}

/// Handle token command
async fn token_command(aggregator: &MarketDataAggregator, cmd: TokenCmd, json: bool) -> Result<()> {
    let mint = resolve_symbol(&cmd.token);
    let info = aggregator.get_token_info(&mint).await;

    if json {
        return print_json(&info);
    }
    print_token(&info);
    Ok(())
}

fn pair_line(pair: &TokenPair) -> String {
    format!(
        "{:<10} {}/{:<8} {:>16} liq {:>10} vol {:>10}  {}",
        pair.dex_id,
        pair.base_symbol,
        pair.quote_symbol,
        pair.price_usd.map(format_usd).unwrap_or_else(|| "-".to_string()),
        pair.liquidity_usd.map(format_compact).unwrap_or_else(|| "-".to_string()),
        pair.volume_24h_usd.map(format_compact).unwrap_or_else(|| "-".to_string()),
        short_address(&pair.pair_address)
    )
}

/// Handle pairs command
async fn pairs_command(aggregator: &MarketDataAggregator, cmd: PairsCmd, json: bool) -> Result<()> {
    let mint = resolve_symbol(&cmd.token);
    let mut pairs = aggregator.get_pairs(&mint).await;
    pairs.truncate(cmd.top);

    if json {
        return print_json(&pairs);
    }

    if pairs.is_empty() {
        println!("No pairs found for {}", label(&mint));
        return Ok(());
    }
    for pair in &pairs {
        println!("{}", pair_line(pair));
    }
    Ok(())
}

fn print_wallet(wallet: &WalletBalance) {
    println!(
        "Wallet {}  ({}){}",
        wallet.owner,
        wallet.source,
        synthetic_marker(wallet.is_synthetic())
    );
    println!("  SOL: {:.9}", wallet.sol);
    for holding in &wallet.tokens {
        let symbol = holding
            .symbol
            .clone()
            .unwrap_or_else(|| label(&holding.mint));
        println!("  {:<10} {}", symbol, holding.amount);
    }
}

/// Handle wallet command
async fn wallet_command(aggregator: &MarketDataAggregator, cmd: WalletCmd, json: bool) -> Result<()> {
    let wallet = aggregator.get_wallet_balance(cmd.owner.trim()).await;

    if json {
        return print_json(&wallet);
    }
    print_wallet(&wallet);
    Ok(())
}

/// Handle watch command
async fn watch_command(aggregator: Arc<MarketDataAggregator>, cmd: WatchCmd, json: bool) -> Result<()> {
    let mint = resolve_symbol(&cmd.token);
    let watcher = PriceWatcher::new(aggregator);
    let mut quotes = watcher.watch(mint.clone(), Duration::from_secs(cmd.every));
    let mut received = 0usize;

    tracing::info!("Watching {} (Ctrl+C to stop)", label(&mint));

    loop {
        tokio::select! {
            quote = quotes.recv() => {
                let Some(quote) = quote else { break };
                if json {
                    println!("{}", serde_json::to_string(&quote).context("Failed to serialize quote")?);
                } else {
                    println!("{}  {}", quote.fetched_at.format("%H:%M:%S"), quote_line(&quote));
                }
                received += 1;
                if cmd.count.is_some_and(|limit| received >= limit) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown signal received");
                break;
            }
        }
    }

    Ok(())
}

#[derive(Serialize)]
struct SourcesReport {
    registered: Vec<DataSource>,
    order: OrderReport,
    status: Vec<SourceStatus>,
    cache: CacheStats,
}

#[derive(Serialize)]
struct OrderReport {
    price: Vec<DataSource>,
    ohlcv: Vec<DataSource>,
    metadata: Vec<DataSource>,
    wallet: Vec<DataSource>,
    pairs: Vec<DataSource>,
}

fn join_sources(sources: &[DataSource]) -> String {
    sources
        .iter()
        .map(|s| s.name())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Handle sources command
async fn sources_command(aggregator: &MarketDataAggregator, json: bool) -> Result<()> {
    let order = aggregator.order();
    let report = SourcesReport {
        registered: aggregator.source_ids(),
        order: OrderReport {
            price: order.price.clone(),
            ohlcv: order.ohlcv.clone(),
            metadata: order.metadata.clone(),
            wallet: order.wallet.clone(),
            pairs: order.pairs.clone(),
        },
        status: aggregator.source_status(),
        cache: aggregator.cache_stats().await,
    };

    if json {
        return print_json(&report);
    }

    println!("Registered: {}", join_sources(&report.registered));
    println!("Order:");
    println!("  price     {}", join_sources(&report.order.price));
    println!("  ohlcv     {}", join_sources(&report.order.ohlcv));
    println!("  metadata  {}", join_sources(&report.order.metadata));
    println!("  wallet    {}", join_sources(&report.order.wallet));
    println!("  pairs     {}", join_sources(&report.order.pairs));

    if !report.status.is_empty() {
        println!("Health:");
        for status in &report.status {
            let state = match status.cooldown_remaining_secs {
                Some(secs) => format!("benched {}s", secs),
                None => "ok".to_string(),
            };
            println!(
                "  {:<12} {:<12} ok {:>5} failed {:>5}{}",
                status.source.name(),
                state,
                status.total_successes,
                status.total_failures,
                status
                    .last_error
                    .as_ref()
                    .map(|e| format!("  last error: {}", e))
                    .unwrap_or_default()
            );
        }
    }

    println!(
        "Cache: {} valid / {} total entries, hit rate {:.1}%",
        report.cache.valid_entries,
        report.cache.total_entries,
        report.cache.hit_rate() * 100.0
    );
    Ok(())
}
