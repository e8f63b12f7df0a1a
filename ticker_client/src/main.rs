//! Ticker Client — keeps a scrolling stock/crypto ticker fragment up to date.
//!
//! It loads the configured symbols and their baselines, renders the baselines right
//! away, then refreshes from the configured quote sources on a timer and rewrites the
//! output file after every cycle. When the sources keep failing it switches to
//! synthetic data until they recover.
//!
//! Usage example (CLI):
//! ```bash
//! ticker_client --proxy-url http://localhost:3000 --sources proxy,yahoo --output ./ticker.html
//! ```
//!
//! The optional symbols file lists one symbol per line. See `ticker_common::symbols`.
#![warn(missing_docs)]
mod args;

use crate::args::Args;
use clap::Parser;
use log::{info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::time::Duration;
use ticker_client::aggregator::{Environment, TickerAggregator};
use ticker_client::render::HtmlFileDisplay;
use ticker_client::scheduler::{IntervalScheduler, Scheduler};
use ticker_client::source::{FallbackSource, QuoteSource, build_source, http_client};
use ticker_common::symbols::SymbolParser;
use ticker_common::{FallbackTable, Result, TickerError};

fn main() -> Result<()> {
    init_logger();
    let args = Args::parse();

    let table = load_table(args.symbols_file.as_deref())?;
    info!("Symbols: {:?}", table.symbols());

    let proxy_url = args.proxy_url.trim().replace('"', "");
    let client = http_client(Duration::from_secs(args.timeout_secs))?;
    let sources: Vec<Box<dyn QuoteSource>> = args
        .sources
        .iter()
        .map(|kind| build_source(*kind, &proxy_url, client.clone()))
        .collect();
    info!("Sources: {:?}", args.sources);

    let rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let display = HtmlFileDisplay::new(normalize_path(&args.output.to_string_lossy()));
    info!("Writing ticker to {}", display.path().display());

    let mut aggregator = TickerAggregator::new(table, FallbackSource::new(sources), display, rng)
        .with_recovery(args.recovery.into());

    if args.once {
        let outcome = aggregator.start();
        info!("Rendered once: {:?}", outcome);
        return Ok(());
    }

    let environment = Environment::detect(&proxy_url);
    let interval = args
        .interval_secs
        .map(Duration::from_secs)
        .unwrap_or_else(|| environment.refresh_interval());
    info!("{} environment, refreshing every {:?}", environment, interval);

    let mut scheduler = IntervalScheduler::new(interval);
    let handle = scheduler.handle();
    ctrlc::set_handler(move || {
        info!("Ctrl+C received. Stopping ticker...");
        handle.cancel();
    })
    .map_err(|e| TickerError::Format(format!("Error setting Ctrl+C handler: {}", e)))?;

    aggregator.run(&mut scheduler);
    Ok(())
}

fn load_table(symbols_file: Option<&str>) -> Result<FallbackTable> {
    let Some(raw) = symbols_file else {
        return Ok(FallbackTable::default_symbols());
    };
    let path = normalize_path(raw);
    if !is_file_exist(&path) {
        warn!("Symbols file {} not found, using defaults", path.display());
        return Ok(FallbackTable::default_symbols());
    }
    let file = File::open(&path)?;
    FallbackTable::parse_from_file(BufReader::new(file))
}

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}

/// Normalize a CLI-provided path string by trimming whitespace and matching quotes.
///
/// This allows passing Windows paths in quotes without breaking parsing.
fn normalize_path(raw: &str) -> PathBuf {
    let trimmed = raw.trim();
    let no_quotes = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed);
    PathBuf::from(no_quotes)
}

/// Returns `true` if the provided path exists and is a regular file.
fn is_file_exist(path: &PathBuf) -> bool {
    path.exists() && path.is_file()
}
