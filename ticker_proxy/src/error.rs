//! Error types of the quote proxy.
//!
//! `ProxyError` is what handlers return; it renders itself as a JSON body
//! `{"error": "..."}` with a matching status code. Upstream failures arrive as
//! `TickerError` and are converted with `?`; a poisoned cache lock converts through the
//! blanket `From<PoisonError<T>>`.
use std::sync::PoisonError;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use ticker_common::TickerError;

/// Failure of a proxy request.
#[derive(Error, Debug)]
pub enum ProxyError {
    /// Unknown path or symbol.
    #[error("{0}")]
    NotFound(String),

    /// Upstream refused us; the body carries `retry_after`.
    #[error("Rate limited by upstream")]
    RateLimited {
        /// Seconds until the cooldown ends.
        retry_after: u64,
    },

    /// Upstream call failed.
    #[error("Failed to fetch data for {symbol}: {source}")]
    Upstream {
        /// Symbol that was requested.
        symbol: String,
        /// Underlying failure.
        source: TickerError,
    },

    /// No data to serve and no rate limit to blame.
    #[error("{0}")]
    Unavailable(String),

    /// Error indicating a poisoned mutex/lock was encountered.
    #[error("Mutex Lock Poisoned: {0}")]
    MutexLock(String),
}

impl ProxyError {
    /// Wraps an upstream failure, keeping rate limits distinguishable.
    pub fn upstream(symbol: &str, source: TickerError) -> Self {
        match source {
            TickerError::RateLimited { retry_after, .. } => ProxyError::RateLimited {
                retry_after: retry_after.unwrap_or(0),
            },
            source => ProxyError::Upstream {
                symbol: symbol.to_string(),
                source,
            },
        }
    }

    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::NotFound(_) => StatusCode::NOT_FOUND,
            ProxyError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ProxyError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ProxyError::Upstream { .. } | ProxyError::MutexLock(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl<T> From<PoisonError<T>> for ProxyError {
    fn from(err: PoisonError<T>) -> Self {
        ProxyError::MutexLock(err.to_string())
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ProxyError::RateLimited { retry_after } => json!({
                "error": self.to_string(),
                "retry_after": retry_after,
            }),
            _ => json!({ "error": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_keeps_its_status() {
        let err = ProxyError::upstream(
            "AAPL",
            TickerError::RateLimited {
                source_name: "yahoo".to_string(),
                retry_after: Some(42),
            },
        );
        assert!(matches!(err, ProxyError::RateLimited { retry_after: 42 }));
        assert_eq!(err.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn other_failures_are_internal_errors() {
        let err = ProxyError::upstream("AAPL", TickerError::malformed("AAPL", "empty"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_string().starts_with("Failed to fetch data for AAPL"));
    }

    #[test]
    fn missing_data_is_service_unavailable() {
        let err = ProxyError::Unavailable("No cryptocurrency data available".to_string());
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.to_string(), "No cryptocurrency data available");
    }
}
