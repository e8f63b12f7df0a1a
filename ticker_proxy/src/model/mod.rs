//! Domain models of the quote proxy.
//!
//! - `quote` — the `ProxyQuote` served to clients.
//! - `coin` — CoinGecko market records.
//! - `cache` — the TTL caches of both.

pub mod cache;
pub mod coin;
pub mod quote;
