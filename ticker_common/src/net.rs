//! Shared networking constants and helpers used by the aggregator and the proxy.
use std::time::Duration;

/// Default TCP port of the quote proxy.
pub const PROXY_PORT: u16 = 3000;
/// Yahoo Finance chart endpoint, the symbol is appended as a path segment.
pub const YAHOO_CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
/// CoinGecko public API root.
pub const COINGECKO_API_URL: &str = "https://api.coingecko.com/api/v3";
/// User agent sent to every upstream.
pub const USER_AGENT: &str = concat!("resume-ticker/", env!("CARGO_PKG_VERSION"));
/// Pause between two per-symbol calls against the same provider.
pub const REQUEST_DELAY: Duration = Duration::from_millis(200);

/// Helper to format a host with a port like "host:port".
pub fn addr(host: &str, port: u16) -> String {
    format!("{}:{}", host, port)
}

/// Returns `true` when `url` points at the local machine.
///
/// Used to tell a development setup (proxy on localhost) from production.
pub fn is_local_url(url: &str) -> bool {
    let without_scheme = url.split("://").nth(1).unwrap_or(url);
    let host_port = without_scheme.split('/').next().unwrap_or_default();
    let host = match host_port.strip_prefix('[') {
        Some(rest) => rest.split(']').next().unwrap_or_default(),
        None => host_port.split(':').next().unwrap_or_default(),
    };
    matches!(host, "localhost" | "127.0.0.1" | "::1" | "0.0.0.0")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_loopback_hosts() {
        assert!(is_local_url("http://localhost:3000"));
        assert!(is_local_url("http://127.0.0.1:3000/api/quotes"));
        assert!(is_local_url("http://[::1]:3000"));
        assert!(!is_local_url("https://ticker.example.com/api"));
    }

    #[test]
    fn formats_address() {
        assert_eq!(addr("0.0.0.0", PROXY_PORT), "0.0.0.0:3000");
    }
}
