//! CoinGecko `simple/price` endpoint for crypto symbols.
//!
//! All requested crypto symbols go out in one call. The endpoint reports the current
//! USD price and the 24h change percentage; the reference price is derived from the
//! two. Symbols without a CoinGecko id are left for other sources.
use std::collections::HashMap;

use log::{debug, warn};
use reqwest::blocking::Client;
use serde::Deserialize;
use ticker_common::net::COINGECKO_API_URL;
use ticker_common::symbols::{coingecko_id, symbol_for_coingecko_id};
use ticker_common::{Quote, Result, TickerError};

use super::{QuoteBatch, QuoteSource, check_status};

const NAME: &str = "coingecko";

#[derive(Debug, Deserialize)]
struct SimplePrice {
    usd: Option<f64>,
    usd_24h_change: Option<f64>,
}

/// Batch crypto prices from CoinGecko.
pub struct CoinGeckoSource {
    client: Client,
    base_url: String,
}

impl CoinGeckoSource {
    /// Source against the public CoinGecko API.
    pub fn new(client: Client) -> Self {
        CoinGeckoSource {
            client,
            base_url: COINGECKO_API_URL.to_string(),
        }
    }

    /// Overrides the API root.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

impl QuoteSource for CoinGeckoSource {
    fn name(&self) -> &str {
        NAME
    }

    fn fetch(&self, symbols: &[String]) -> Result<QuoteBatch> {
        let ids: Vec<&str> = symbols.iter().filter_map(|s| coingecko_id(s)).collect();
        if ids.is_empty() {
            return Ok(QuoteBatch::new());
        }

        let url = format!("{}/simple/price", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("ids", ids.join(",").as_str()),
                ("vs_currencies", "usd"),
                ("include_24hr_change", "true"),
            ])
            .send()?;
        let body = check_status(NAME, response)?.text()?;
        parse_simple_price(&body)
    }
}

/// Parses a `simple/price` body into quotes keyed by display symbol.
pub fn parse_simple_price(body: &str) -> Result<QuoteBatch> {
    let prices: HashMap<String, SimplePrice> =
        serde_json::from_str(body).map_err(|e| TickerError::malformed(NAME, e.to_string()))?;

    let mut batch = QuoteBatch::new();
    for (id, entry) in prices {
        let Some(symbol) = symbol_for_coingecko_id(&id) else {
            continue;
        };
        let Some(price) = entry.usd.filter(|p| p.is_finite() && *p > 0.0) else {
            debug!("{}: no usd price for {}", NAME, symbol);
            continue;
        };
        let percent = entry.usd_24h_change.filter(|c| c.is_finite()).unwrap_or(0.0);
        // a drop of 100% or more has no positive reference price
        if percent <= -100.0 {
            warn!("{}: unusable 24h change {} for {}", NAME, percent, symbol);
            continue;
        }
        let previous = price / (1.0 + percent / 100.0);
        batch.insert(symbol.to_string(), Quote::from_prices(symbol, price, previous));
    }
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_change_from_percentage() {
        let body = r#"{"bitcoin":{"usd":67540.28,"usd_24h_change":3.54},"ethereum":{"usd":3450.75,"usd_24h_change":-1.5}}"#;
        let batch = parse_simple_price(body).unwrap();
        assert_eq!(batch["BTC"].price, "67540.28");
        assert_eq!(batch["BTC"].change_percent, "+3.54%");
        assert!(batch["BTC"].is_positive());
        assert_eq!(batch["ETH"].change_percent, "-1.50%");
        assert!(!batch["ETH"].is_positive());
    }

    #[test]
    fn skips_unknown_ids_and_missing_prices() {
        let body = r#"{"shibacoin":{"usd":0.1},"dogecoin":{"usd_24h_change":1.0},"ripple":{"usd":0.5234}}"#;
        let batch = parse_simple_price(body).unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch["XRP"].price, "0.5234");
        assert_eq!(batch["XRP"].change_percent, "+0.00%");
    }

    #[test]
    fn total_loss_change_is_skipped() {
        let body = r#"{"bitcoin":{"usd":67540.28,"usd_24h_change":-100.0},"solana":{"usd":145.67,"usd_24h_change":-120.5},"ethereum":{"usd":3450.75,"usd_24h_change":-99.0}}"#;
        let batch = parse_simple_price(body).unwrap();
        assert_eq!(batch.len(), 1);
        assert!(batch["ETH"].is_well_formed());
        assert!(!batch["ETH"].is_positive());
    }

    #[test]
    fn non_object_body_is_malformed() {
        assert!(parse_simple_price("[]").is_err());
    }
}
