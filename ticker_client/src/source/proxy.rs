//! Batch fetch from the quote proxy (`GET /api/quotes?symbols=A,B`).
use log::{debug, warn};
use reqwest::blocking::Client;
use serde_json::Value;
use ticker_common::{Quote, Result, TickerError};

use super::{QuoteBatch, QuoteSource, check_status};

const NAME: &str = "proxy";

/// Source backed by the workspace's quote proxy.
pub struct ProxySource {
    client: Client,
    base_url: String,
}

impl ProxySource {
    /// Source talking to the proxy at `base_url` (e.g. `http://localhost:3000`).
    pub fn new(client: Client, base_url: &str) -> Self {
        ProxySource {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl QuoteSource for ProxySource {
    fn name(&self) -> &str {
        NAME
    }

    fn fetch(&self, symbols: &[String]) -> Result<QuoteBatch> {
        let url = format!("{}/api/quotes", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("symbols", symbols.join(","))])
            .send()?;
        let body = check_status(NAME, response)?.text()?;
        parse_quotes(symbols, &body)
    }
}

/// Parses the proxy's JSON array, keeping well-formed entries for requested symbols.
///
/// A body that is not an array fails the whole call; a bad entry only drops itself.
pub fn parse_quotes(symbols: &[String], body: &str) -> Result<QuoteBatch> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| TickerError::malformed(&symbols.join(","), e.to_string()))?;
    let Value::Array(entries) = value else {
        return Err(TickerError::malformed(
            &symbols.join(","),
            "expected a JSON array",
        ));
    };

    let mut batch = QuoteBatch::new();
    for entry in entries {
        match serde_json::from_value::<Quote>(entry) {
            Ok(quote) if quote.is_well_formed() && symbols.contains(&quote.symbol) => {
                debug!("{}: {} = {}", NAME, quote.symbol, quote.price);
                batch.insert(quote.symbol.clone(), quote);
            }
            Ok(quote) => warn!("{}: ignoring unusable entry for {}", NAME, quote.symbol),
            Err(e) => warn!("{}: ignoring malformed entry: {}", NAME, e),
        }
    }
    Ok(batch)
}
