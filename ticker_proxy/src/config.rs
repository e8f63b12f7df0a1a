//! Proxy configuration.
//!
//! Every option is a command-line flag with an environment variable fallback, so the
//! same binary runs unchanged under a process manager or in a container.
use std::time::Duration;

use clap::Parser;
use ticker_common::net::{COINGECKO_API_URL, PROXY_PORT, YAHOO_CHART_URL};

/// Stock and crypto symbols cached by default.
pub const DEFAULT_PROXY_SYMBOLS: [&str; 13] = [
    "SPY", "AAPL", "MSFT", "NVDA", "META", "TSLA", "GOOGL", "PLTR", "GME", "BTC", "ETH", "XRP",
    "DOGE",
];

/// Runtime settings of the quote proxy.
#[derive(Debug, Clone, Parser)]
#[command(version, about, long_about = None)]
pub struct ProxyConfig {
    /// Port to listen on; the next ports are tried when it is taken.
    #[arg(long, env = "TICKER_PROXY_PORT", default_value_t = PROXY_PORT)]
    pub port: u16,

    /// How many consecutive ports to try before giving up.
    #[arg(long, env = "TICKER_PROXY_MAX_PORT_ATTEMPTS", default_value_t = 5)]
    pub max_port_attempts: u16,

    /// Symbols refreshed as a whole when the cache expires.
    #[arg(
        long,
        env = "TICKER_PROXY_SYMBOLS",
        value_delimiter = ',',
        default_values_t = DEFAULT_PROXY_SYMBOLS.map(String::from)
    )]
    pub symbols: Vec<String>,

    /// Cache lifetime in seconds.
    #[arg(long, env = "TICKER_PROXY_CACHE_TTL_SECS", default_value_t = 300)]
    pub cache_ttl_secs: u64,

    /// Pause between two upstream calls of a refresh, in milliseconds.
    #[arg(long, env = "TICKER_PROXY_REQUEST_DELAY_MS", default_value_t = 200)]
    pub request_delay_ms: u64,

    /// Attempts per upstream call.
    #[arg(long, env = "TICKER_PROXY_RETRY_ATTEMPTS", default_value_t = 5)]
    pub retry_attempts: u32,

    /// Upper bound of the backoff between attempts, in seconds.
    #[arg(long, env = "TICKER_PROXY_MAX_BACKOFF_SECS", default_value_t = 30)]
    pub max_backoff_secs: u64,

    /// Cooldown after a rate limit without `Retry-After`, in seconds.
    #[arg(long, env = "TICKER_PROXY_RATE_LIMIT_COOLDOWN_SECS", default_value_t = 300)]
    pub rate_limit_cooldown_secs: u64,

    /// Timeout of one upstream call, in seconds.
    #[arg(long, env = "TICKER_PROXY_UPSTREAM_TIMEOUT_SECS", default_value_t = 15)]
    pub upstream_timeout_secs: u64,

    /// Yahoo chart endpoint root.
    #[arg(long, env = "TICKER_PROXY_YAHOO_URL", default_value = YAHOO_CHART_URL)]
    pub yahoo_url: String,

    /// CoinGecko API root used for `/api/crypto`.
    #[arg(long, env = "TICKER_PROXY_COINGECKO_URL", default_value = COINGECKO_API_URL)]
    pub coingecko_url: String,
}

impl ProxyConfig {
    /// Cache lifetime.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Pause between two upstream calls of a refresh.
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    /// Cooldown used when the upstream gives no `Retry-After`.
    pub fn rate_limit_cooldown(&self) -> Duration {
        Duration::from_secs(self.rate_limit_cooldown_secs)
    }

    /// Timeout of one upstream call.
    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        ProxyConfig {
            port: PROXY_PORT,
            max_port_attempts: 5,
            symbols: DEFAULT_PROXY_SYMBOLS.map(String::from).to_vec(),
            cache_ttl_secs: 300,
            request_delay_ms: 200,
            retry_attempts: 5,
            max_backoff_secs: 30,
            rate_limit_cooldown_secs: 300,
            upstream_timeout_secs: 15,
            yahoo_url: YAHOO_CHART_URL.to_string(),
            coingecko_url: COINGECKO_API_URL.to_string(),
        }
    }
}
