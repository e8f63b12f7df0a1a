//! Ticker Proxy — cached JSON quotes for the ticker aggregator.
//!
//! Binds `0.0.0.0:<port>` (moving to the next port while the current one is taken),
//! primes the quote cache with every configured symbol and the coin cache with every
//! tracked coin, then serves until Ctrl+C.
//!
//! Usage example (CLI):
//! ```bash
//! RUST_LOG=debug ticker_proxy --port 3000 --symbols AAPL,MSFT,BTC
//! ```
//!
//! Every flag can also be given through a `TICKER_PROXY_*` environment variable.
#![warn(missing_docs)]
use std::io;
use std::sync::Arc;

use clap::Parser;
use log::{error, info, warn};
use ticker_common::net::addr;
use ticker_common::{Result, TickerError};
use ticker_proxy::routes::{refresh_cache, refresh_coins};
use ticker_proxy::upstream::{CoinGeckoMarkets, ResilientUpstream, RetryPolicy, YahooUpstream};
use ticker_proxy::{AppState, ProxyConfig, router};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<()> {
    init_logger();
    let config = ProxyConfig::parse();
    info!("Symbols: {:?}", config.symbols);

    let yahoo = YahooUpstream::new(&config.yahoo_url, config.upstream_timeout())?;
    let upstream = ResilientUpstream::new(
        yahoo,
        RetryPolicy::from_config(&config),
        config.rate_limit_cooldown(),
    );
    let coingecko = CoinGeckoMarkets::new(&config.coingecko_url, config.upstream_timeout())?;
    let markets = ResilientUpstream::new(
        coingecko,
        RetryPolicy::from_config(&config),
        config.rate_limit_cooldown(),
    );

    let listener = bind(config.port, config.max_port_attempts).await?;
    let state = Arc::new(AppState::new(config, Arc::new(upstream), Arc::new(markets)));

    match refresh_cache(&state).await {
        Ok(count) => info!("Cache primed with {} quotes", count),
        Err(e) => error!("Initial cache refresh failed: {}", e),
    }
    match refresh_coins(&state).await {
        Ok(count) => info!("Coin cache primed with {} coins", count),
        Err(e) => error!("Initial coin refresh failed: {}", e),
    }

    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server stopped");
    Ok(())
}

/// Binds the first free port among `port`, `port + 1`, ... (`attempts` ports in total).
async fn bind(port: u16, attempts: u16) -> Result<TcpListener> {
    let mut last_error = None;
    for offset in 0..attempts.max(1) {
        let Some(candidate) = port.checked_add(offset) else {
            break;
        };
        match TcpListener::bind(addr("0.0.0.0", candidate)).await {
            Ok(listener) => return Ok(listener),
            Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
                warn!("Port {} is in use, trying {}", candidate, candidate.saturating_add(1));
                last_error = Some(e);
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(match last_error {
        Some(e) => TickerError::Io(e),
        None => TickerError::Format(format!("no port available from {}", port)),
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Error listening for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Ctrl+C received. Shutting down...");
}

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}
