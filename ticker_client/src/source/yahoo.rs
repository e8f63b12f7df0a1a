//! Yahoo Finance chart endpoint.
//!
//! The chart API answers one symbol per call, so symbols are fetched sequentially with
//! a pause between calls. A single failed symbol is skipped; a rate-limit answer aborts
//! the rest of the batch, since every further call would be refused as well.
use std::thread;
use std::time::Duration;

use log::{debug, warn};
use reqwest::blocking::Client;
use ticker_common::net::{REQUEST_DELAY, YAHOO_CHART_URL};
use ticker_common::symbols::provider_symbol;
use ticker_common::yahoo;
use ticker_common::{Quote, Result};

use super::{QuoteBatch, QuoteSource, check_status};

const NAME: &str = "yahoo";

/// Per-symbol fetches against the Yahoo chart API.
pub struct YahooSource {
    client: Client,
    base_url: String,
    delay: Duration,
}

impl YahooSource {
    /// Source against the public endpoint with the default inter-call delay.
    pub fn new(client: Client) -> Self {
        YahooSource {
            client,
            base_url: YAHOO_CHART_URL.to_string(),
            delay: REQUEST_DELAY,
        }
    }

    /// Overrides the endpoint root.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Overrides the pause between two symbol calls.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn fetch_one(&self, symbol: &str) -> Result<Quote> {
        let url = format!("{}/{}", self.base_url, provider_symbol(symbol));
        let response = self
            .client
            .get(&url)
            .query(&[("interval", "1d"), ("range", "1d")])
            .send()?;
        let body = check_status(NAME, response)?.text()?;
        parse_chart(symbol, &body)
    }
}

impl QuoteSource for YahooSource {
    fn name(&self) -> &str {
        NAME
    }

    fn fetch(&self, symbols: &[String]) -> Result<QuoteBatch> {
        let mut batch = QuoteBatch::new();
        for (i, symbol) in symbols.iter().enumerate() {
            if i > 0 && !self.delay.is_zero() {
                thread::sleep(self.delay);
            }
            match self.fetch_one(symbol) {
                Ok(quote) => {
                    debug!("{}: {} = {}", NAME, symbol, quote.price);
                    batch.insert(symbol.clone(), quote);
                }
                Err(e) if e.is_rate_limited() => return Err(e),
                Err(e) => warn!("{}: no quote for {}: {}", NAME, symbol, e),
            }
        }
        Ok(batch)
    }
}

/// Extracts a quote for `symbol` from a chart response body.
pub fn parse_chart(symbol: &str, body: &str) -> Result<Quote> {
    let prices = yahoo::parse_chart(symbol, body)?;
    Ok(Quote::from_prices(symbol, prices.price, prices.previous_close))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_quote_from_chart() {
        let body = r#"{"chart":{"result":[{"meta":{"symbol":"AAPL","regularMarketPrice":175.34,"chartPreviousClose":174.11}}],"error":null}}"#;
        let quote = parse_chart("AAPL", body).unwrap();
        assert_eq!(quote.symbol, "AAPL");
        assert_eq!(quote.price, "175.34");
        assert_eq!(quote.change, "+1.23");
    }

    #[test]
    fn keeps_configured_symbol_for_crypto_pairs() {
        let body = r#"{"chart":{"result":[{"meta":{"symbol":"BTC-USD","regularMarketPrice":60000.0,"previousClose":61000.0}}],"error":null}}"#;
        let quote = parse_chart("BTC", body).unwrap();
        assert_eq!(quote.symbol, "BTC");
        assert!(!quote.is_positive());
    }
}
