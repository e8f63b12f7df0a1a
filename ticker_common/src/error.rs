//! Error types shared between the aggregator and the proxy.
//!
//! The `TickerError` enum unifies the failure cases met while loading the symbol
//! configuration, talking to remote quote sources and decoding their payloads, so
//! every crate in the workspace can propagate a single error type with `?`.
use std::io;

use thiserror::Error;

/// Unified error type shared by the aggregator and the proxy.
#[derive(Error, Debug)]
pub enum TickerError {
    /// I/O error originating from the standard library (files, sockets).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Generic formatting/validation error with a human-readable message.
    #[error("Format error: {0}")]
    Format(String),

    /// Error while parsing the symbols file into fallback entries.
    #[error("Parse symbols file error: {0}")]
    ParseSymbolsFile(String),

    /// Failure while encoding/decoding JSON via serde_json.
    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    /// Transport level failure of an HTTP call (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote answered with a non-success status other than a rate limit.
    #[error("Unexpected HTTP status {status} from {source_name}")]
    Status {
        /// Name of the source that answered.
        source_name: String,
        /// Numeric HTTP status code.
        status: u16,
    },

    /// The remote signalled a rate limit (HTTP 429 or an equivalent body).
    #[error("Rate limited by {source_name}")]
    RateLimited {
        /// Name of the source that refused the call.
        source_name: String,
        /// Seconds the remote asked us to wait, when it said so.
        retry_after: Option<u64>,
    },

    /// The response arrived but did not carry a usable price.
    #[error("Malformed response for {symbol}: {reason}")]
    MalformedResponse {
        /// Symbol the response was meant to describe.
        symbol: String,
        /// What was missing or wrong.
        reason: String,
    },

    /// A requested symbol has no entry in the static fallback table.
    #[error("Internal Logic Error: Symbol not found: {0}")]
    SymbolNotFound(String),
}

impl TickerError {
    /// Shorthand for [`TickerError::MalformedResponse`].
    pub fn malformed(symbol: &str, reason: impl Into<String>) -> Self {
        TickerError::MalformedResponse {
            symbol: symbol.to_string(),
            reason: reason.into(),
        }
    }

    /// `true` when the error is a rate-limit signal from the remote.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, TickerError::RateLimited { .. })
    }
}
