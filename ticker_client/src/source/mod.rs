//! Remote quote sources.
//!
//! Every provider implements [`QuoteSource`]: given the configured symbols it returns
//! the live quotes it could obtain, keyed by display symbol. A partial batch is a
//! normal answer; an `Err` means the call as a whole failed (transport error,
//! timeout, rate limit, unusable body). Filling the gaps with fallback values is the
//! aggregator's job, not the source's.
//!
//! - `proxy` — the workspace's own quote proxy, one batch call.
//! - `yahoo` — Yahoo Finance chart endpoint, one call per symbol with a delay.
//! - `coingecko` — CoinGecko simple price endpoint for crypto symbols.
//! - `fallback` — priority list composing the above.
use std::collections::HashMap;
use std::time::Duration;

use clap::ValueEnum;
use log::debug;
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use reqwest::header::RETRY_AFTER;
use strum_macros::{Display, EnumString};
use ticker_common::net::USER_AGENT;
use ticker_common::{Quote, Result, TickerError};

pub mod coingecko;
pub mod fallback;
pub mod proxy;
pub mod yahoo;

pub use coingecko::CoinGeckoSource;
pub use fallback::FallbackSource;
pub use proxy::ProxySource;
pub use yahoo::YahooSource;

/// Live quotes of one fetch, keyed by display symbol.
pub type QuoteBatch = HashMap<String, Quote>;

/// Timeout applied to every remote call.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// A provider of live quotes.
pub trait QuoteSource {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    /// Fetches current quotes for `symbols`.
    ///
    /// Symbols the provider could not deliver are simply absent from the batch.
    fn fetch(&self, symbols: &[String]) -> Result<QuoteBatch>;
}

impl<S: QuoteSource + ?Sized> QuoteSource for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn fetch(&self, symbols: &[String]) -> Result<QuoteBatch> {
        (**self).fetch(symbols)
    }
}

/// Providers selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Display, EnumString)]
#[value(rename_all = "lower")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SourceKind {
    /// The quote proxy (`ticker_proxy`).
    Proxy,
    /// Yahoo Finance chart API.
    Yahoo,
    /// CoinGecko, crypto symbols only.
    CoinGecko,
}

/// Builds the concrete source for `kind`.
pub fn build_source(kind: SourceKind, proxy_url: &str, client: Client) -> Box<dyn QuoteSource> {
    match kind {
        SourceKind::Proxy => Box::new(ProxySource::new(client, proxy_url)),
        SourceKind::Yahoo => Box::new(YahooSource::new(client)),
        SourceKind::CoinGecko => Box::new(CoinGeckoSource::new(client)),
    }
}

/// Blocking HTTP client shared by the sources.
pub fn http_client(timeout: Duration) -> Result<Client> {
    let client = Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()?;
    Ok(client)
}

/// Turns 429 into [`TickerError::RateLimited`] and other failures into
/// [`TickerError::Status`].
pub(crate) fn check_status(source_name: &str, response: Response) -> Result<Response> {
    let status = response.status();
    debug!("{} answered {}", source_name, status);
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        return Err(TickerError::RateLimited {
            source_name: source_name.to_string(),
            retry_after,
        });
    }
    if !status.is_success() {
        return Err(TickerError::Status {
            source_name: source_name.to_string(),
            status: status.as_u16(),
        });
    }
    Ok(response)
}
