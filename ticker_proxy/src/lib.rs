//! Quote proxy.
//!
//! A small JSON service that fronts the Yahoo Finance chart API and the CoinGecko
//! markets API for the ticker aggregator. It keeps time-to-live caches of the
//! configured symbols and the tracked coins, spaces out upstream calls, retries
//! transient failures and honours upstream rate limits.
//!
//! - `config` — command-line and environment settings.
//! - `error` — `ProxyError` and its HTTP rendering.
//! - `model` — the served quote and coin shapes and the caches.
//! - `upstream` — the upstream traits, the Yahoo and CoinGecko clients and the retry
//!   wrapper.
//! - `routes` — axum handlers and the router.
#![warn(missing_docs)]
pub mod config;
pub mod error;
pub mod model;
pub mod routes;
pub mod upstream;

pub use config::ProxyConfig;
pub use error::ProxyError;
pub use routes::{AppState, router};
