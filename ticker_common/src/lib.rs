//!
//! Common types and utilities shared by the ticker aggregator and the quote proxy.
//!
//! This crate aggregates:
//! - `error` — unified error type `TickerError` used across the workspace.
//! - `result` — handy `Result<T, TickerError>` alias.
//! - `quote` — the `Quote` model and its decimal formatting rules.
//! - `symbols` — configured symbols, the static fallback table and provider symbol mapping.
//! - `net` — upstream endpoints, ports and small helpers.
//! - `yahoo` — decoding of Yahoo Finance chart responses.
#![warn(missing_docs)]
pub mod error;
pub mod net;
pub mod quote;
pub mod result;
pub mod symbols;
pub mod yahoo;

pub use error::TickerError;
pub use quote::Quote;
pub use result::Result;
pub use symbols::FallbackTable;
