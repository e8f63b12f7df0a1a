//! Command-line arguments for the ticker client.
//!
//! This module defines the CLI interface using `clap`. See `main` for end-to-end usage.
use std::path::PathBuf;

use clap::Parser;
use ticker_client::aggregator::RecoveryMode;
use ticker_client::source::SourceKind;

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Base URL of the quote proxy. A localhost URL selects the development interval.
    #[arg(long, default_value = "http://localhost:3000")]
    pub proxy_url: String,

    /// Quote sources in priority order.
    #[arg(
        long,
        value_enum,
        value_delimiter = ',',
        default_values_t = [SourceKind::Proxy, SourceKind::Yahoo, SourceKind::CoinGecko]
    )]
    pub sources: Vec<SourceKind>,

    /// Optional file with the symbols to show, one per line.
    /// A line is either a symbol or `SYMBOL,price,change,changePercent`.
    #[arg(long)]
    pub symbols_file: Option<String>,

    /// File that receives the rendered ticker container.
    #[arg(long, default_value = "ticker.html")]
    pub output: PathBuf,

    /// How to leave degraded mode.
    #[arg(long, value_enum, default_value_t = RecoveryMode::Probabilistic)]
    pub recovery: RecoveryMode,

    /// Seed for synthetic data and recovery draws; random when absent.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Refresh interval in seconds, overriding the detected environment.
    #[arg(long)]
    pub interval_secs: Option<u64>,

    /// Timeout of a single remote call in seconds.
    #[arg(long, default_value_t = 5)]
    pub timeout_secs: u64,

    /// Render once and exit instead of refreshing on a timer.
    #[arg(long)]
    pub once: bool,
}
