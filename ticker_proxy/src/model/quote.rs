//! Quote payload served by the proxy.
//!
//! A `ProxyQuote` is the shared [`Quote`] (symbol, price, change, change percent, with
//! the camelCase wire names) plus the UTC time it was fetched upstream. Crypto pairs
//! are reported under their display symbol (`BTC`, not `BTC-USD`).
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ticker_common::Quote;
use ticker_common::symbols::display_symbol;
use ticker_common::yahoo::ChartPrices;

/// Quote plus fetch time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProxyQuote {
    /// The quote fields, flattened into the JSON object.
    #[serde(flatten)]
    pub quote: Quote,
    /// When the upstream answered.
    pub last_updated: DateTime<Utc>,
}

impl ProxyQuote {
    /// Builds a quote for `symbol` from upstream prices, stamped with `fetched_at`.
    pub fn from_chart(symbol: &str, prices: ChartPrices, fetched_at: DateTime<Utc>) -> Self {
        ProxyQuote {
            quote: Quote::from_prices(
                &display_symbol(symbol),
                prices.price,
                prices.previous_close,
            ),
            last_updated: fetched_at,
        }
    }

    /// Display symbol.
    pub fn symbol(&self) -> &str {
        &self.quote.symbol
    }
}
