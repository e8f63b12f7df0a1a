//! CoinGecko market records served under `/api/crypto`.
//!
//! One `coins/markets` call returns every tracked coin. Entries for ids outside the
//! tracked set, or without a usable price, are dropped; missing volume, market cap
//! or 24h change default to zero.
use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use ticker_common::symbols::symbol_for_coingecko_id;
use ticker_common::{Result, TickerError};

/// Market snapshot of one coin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinRecord {
    /// Display symbol (`BTC`).
    pub symbol: String,
    /// CoinGecko id (`bitcoin`).
    pub coingecko_id: String,
    /// Human readable name.
    pub name: String,
    /// USD price.
    pub price: f64,
    /// Price change over 24 hours, in percent.
    pub change_percent_24h: f64,
    /// Traded volume over 24 hours, in USD.
    pub volume: f64,
    /// Market capitalisation in USD.
    pub market_cap: f64,
    /// When CoinGecko answered.
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct MarketEntry {
    id: String,
    #[serde(default)]
    name: String,
    current_price: Option<f64>,
    total_volume: Option<f64>,
    market_cap: Option<f64>,
    price_change_percentage_24h: Option<f64>,
}

fn finite_or_zero(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// Parses a `coins/markets` body, keeping tracked coins in response order.
pub fn parse_markets(body: &str, fetched_at: DateTime<Utc>) -> Result<Vec<CoinRecord>> {
    let entries: Vec<serde_json::Value> = serde_json::from_str(body)
        .map_err(|e| TickerError::malformed("coins/markets", e.to_string()))?;

    let mut records = Vec::with_capacity(entries.len());
    for raw in entries {
        let entry: MarketEntry = match serde_json::from_value(raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable market entry: {}", e);
                continue;
            }
        };
        let Some(symbol) = symbol_for_coingecko_id(&entry.id) else {
            continue;
        };
        let Some(price) = entry.current_price.filter(|p| p.is_finite() && *p > 0.0) else {
            warn!("Missing price data for {}, skipping", symbol);
            continue;
        };
        records.push(CoinRecord {
            symbol: symbol.to_string(),
            coingecko_id: entry.id,
            name: entry.name,
            price,
            change_percent_24h: finite_or_zero(entry.price_change_percentage_24h),
            volume: finite_or_zero(entry.total_volume),
            market_cap: finite_or_zero(entry.market_cap),
            timestamp: fetched_at,
        });
    }
    Ok(records)
}
