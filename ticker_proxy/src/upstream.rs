//! Upstream market data.
//!
//! [`YahooUpstream`] and [`CoinGeckoMarkets`] perform exactly one HTTP call per
//! request. [`ResilientUpstream`] wraps either with the policies the proxy relies on:
//! - transient failures are retried with a capped exponential backoff
//!   (`min(2 + 2^attempt, max)` units before attempt `attempt`);
//! - a rate-limit answer trips a cooldown (the upstream's `Retry-After`, or the
//!   configured default) during which calls fail immediately without touching the
//!   network;
//! - malformed bodies are not retried, the same request would answer the same way.
use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info, warn};
use reqwest::header::{ACCEPT, RETRY_AFTER};
use reqwest::{Response, StatusCode};
use ticker_common::net::USER_AGENT;
use ticker_common::symbols::provider_symbol;
use ticker_common::{Result, TickerError, yahoo};

use crate::config::ProxyConfig;
use crate::model::coin::{CoinRecord, parse_markets};
use crate::model::quote::ProxyQuote;

/// A market data provider queried one symbol at a time.
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    /// Current quote for a display symbol.
    async fn fetch_quote(&self, symbol: &str) -> Result<ProxyQuote>;

    /// Remaining rate-limit cooldown, if one is active.
    fn rate_limited_for(&self) -> Option<Duration> {
        None
    }
}

/// A provider of crypto market snapshots, queried for many coins at once.
#[async_trait]
pub trait CoinMarkets: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    /// Market records for the given CoinGecko ids.
    async fn fetch_markets(&self, ids: &[String]) -> Result<Vec<CoinRecord>>;

    /// Remaining rate-limit cooldown, if one is active.
    fn rate_limited_for(&self) -> Option<Duration> {
        None
    }
}

fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()?;
    Ok(client)
}

/// Turns 429 into [`TickerError::RateLimited`] and other failures into
/// [`TickerError::Status`].
fn check_status(source_name: &str, response: Response) -> Result<Response> {
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

/// Yahoo Finance chart endpoint.
pub struct YahooUpstream {
    client: reqwest::Client,
    base_url: String,
}

impl YahooUpstream {
    /// Upstream against `base_url` with a per-call `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(YahooUpstream {
            client: http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Upstream for YahooUpstream {
    fn name(&self) -> &str {
        "yahoo"
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<ProxyQuote> {
        let url = format!("{}/{}", self.base_url, provider_symbol(symbol));
        debug!("GET {}", url);
        let response = self
            .client
            .get(&url)
            .query(&[("interval", "1d"), ("range", "1d")])
            .send()
            .await?;
        let body = check_status(self.name(), response)?.text().await?;
        let prices = yahoo::parse_chart(symbol, &body)?;
        Ok(ProxyQuote::from_chart(symbol, prices, Utc::now()))
    }
}

/// CoinGecko `coins/markets` endpoint.
pub struct CoinGeckoMarkets {
    client: reqwest::Client,
    base_url: String,
}

impl CoinGeckoMarkets {
    /// Upstream against the API root `base_url` with a per-call `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(CoinGeckoMarkets {
            client: http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl CoinMarkets for CoinGeckoMarkets {
    fn name(&self) -> &str {
        "coingecko"
    }

    async fn fetch_markets(&self, ids: &[String]) -> Result<Vec<CoinRecord>> {
        let url = format!("{}/coins/markets", self.base_url);
        let ids = ids.join(",");
        debug!("GET {} ids={}", url, ids);
        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "application/json")
            .query(&[
                ("vs_currency", "usd"),
                ("ids", ids.as_str()),
                ("order", "market_cap_desc"),
                ("per_page", "100"),
                ("page", "1"),
                ("sparkline", "false"),
                ("price_change_percentage", "24h"),
            ])
            .send()
            .await?;
        let body = check_status(self.name(), response)?.text().await?;
        parse_markets(&body, Utc::now())
    }
}

/// Attempts and backoff of [`ResilientUpstream`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts per call, at least one.
    pub attempts: u32,
    /// Length of one backoff step.
    pub unit: Duration,
    /// Upper bound of a single backoff.
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Policy from the proxy settings, in one-second units.
    pub fn from_config(config: &ProxyConfig) -> Self {
        RetryPolicy {
            attempts: config.retry_attempts,
            unit: Duration::from_secs(1),
            max_backoff: Duration::from_secs(config.max_backoff_secs),
        }
    }

    /// Pause before attempt number `attempt` (the first attempt is 0).
    pub fn backoff(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let steps = 2u32.saturating_add(2u32.saturating_pow(attempt));
        self.unit.saturating_mul(steps).min(self.max_backoff)
    }
}

/// Cooldown window after an upstream rate limit.
#[derive(Debug)]
pub struct RateLimitGate {
    until: Mutex<Option<Instant>>,
    default_cooldown: Duration,
}

impl RateLimitGate {
    /// Gate using `default_cooldown` when the upstream does not say how long to wait.
    pub fn new(default_cooldown: Duration) -> Self {
        RateLimitGate {
            until: Mutex::new(None),
            default_cooldown,
        }
    }

    /// Remaining cooldown at `now`.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        let until = *self.until.lock().unwrap_or_else(PoisonError::into_inner);
        until
            .map(|u| u.saturating_duration_since(now))
            .filter(|d| !d.is_zero())
    }

    /// Starts a cooldown at `now`; returns its length.
    pub fn trip(&self, now: Instant, retry_after: Option<u64>) -> Duration {
        let cooldown = retry_after
            .map(Duration::from_secs)
            .unwrap_or(self.default_cooldown);
        let mut until = self.until.lock().unwrap_or_else(PoisonError::into_inner);
        *until = Some(now + cooldown);
        cooldown
    }
}

/// Retry, backoff and rate-limit cooldown around another upstream.
///
/// Each wrapper owns its own gate, so a rate limit on one provider never blocks
/// another.
pub struct ResilientUpstream<U> {
    inner: U,
    retry: RetryPolicy,
    gate: RateLimitGate,
}

impl<U> ResilientUpstream<U> {
    /// Wraps `inner`.
    pub fn new(inner: U, retry: RetryPolicy, default_cooldown: Duration) -> Self {
        ResilientUpstream {
            inner,
            retry,
            gate: RateLimitGate::new(default_cooldown),
        }
    }

    fn rate_limited(source_name: &str, remaining: Duration) -> TickerError {
        TickerError::RateLimited {
            source_name: source_name.to_string(),
            retry_after: Some(remaining.as_secs().max(1)),
        }
    }

    /// Runs `fetch` under the retry policy and the rate-limit gate.
    async fn call<T, F, Fut>(&self, source_name: &str, what: &str, mut fetch: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.retry.attempts.max(1);
        let mut last_error = None;

        for attempt in 0..attempts {
            if let Some(remaining) = self.gate.remaining(Instant::now()) {
                warn!(
                    "Rate limit cooldown active. Retry in {} seconds",
                    remaining.as_secs()
                );
                return Err(Self::rate_limited(source_name, remaining));
            }

            let delay = self.retry.backoff(attempt);
            if !delay.is_zero() {
                info!("Backing off for {:?} before retry", delay);
                tokio::time::sleep(delay).await;
            }

            debug!("Fetching {} (attempt {}/{})", what, attempt + 1, attempts);
            match fetch().await {
                Ok(value) => return Ok(value),
                Err(TickerError::RateLimited { retry_after, .. }) => {
                    let cooldown = self.gate.trip(Instant::now(), retry_after);
                    warn!("Rate limit hit for {}, cooling down {:?}", what, cooldown);
                    return Err(Self::rate_limited(source_name, cooldown));
                }
                Err(e @ TickerError::MalformedResponse { .. }) => return Err(e),
                Err(e) => {
                    warn!("Fetch of {} failed: {}", what, e);
                    last_error = Some(e);
                }
            }
        }

        warn!("All {} attempts for {} failed", attempts, what);
        match last_error {
            Some(e) => Err(e),
            None => Err(TickerError::Format(format!("no attempt for {}", what))),
        }
    }
}

#[async_trait]
impl<U: Upstream> Upstream for ResilientUpstream<U> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<ProxyQuote> {
        self.call(self.inner.name(), symbol, || self.inner.fetch_quote(symbol)).await
    }

    fn rate_limited_for(&self) -> Option<Duration> {
        self.gate.remaining(Instant::now())
    }
}

#[async_trait]
impl<M: CoinMarkets> CoinMarkets for ResilientUpstream<M> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn fetch_markets(&self, ids: &[String]) -> Result<Vec<CoinRecord>> {
        self.call(self.inner.name(), "coin markets", || self.inner.fetch_markets(ids)).await
    }

    fn rate_limited_for(&self) -> Option<Duration> {
        self.gate.remaining(Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use ticker_common::yahoo::ChartPrices;

    struct ScriptedUpstream {
        answers: Mutex<VecDeque<Result<ProxyQuote>>>,
        calls: AtomicUsize,
    }

    impl ScriptedUpstream {
        fn new(answers: Vec<Result<ProxyQuote>>) -> Self {
            ScriptedUpstream {
                answers: Mutex::new(answers.into()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Upstream for ScriptedUpstream {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn fetch_quote(&self, symbol: &str) -> Result<ProxyQuote> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answers
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(TickerError::Format(format!("no answer for {}", symbol))))
        }
    }

    fn quote() -> ProxyQuote {
        let prices = ChartPrices {
            price: 175.34,
            previous_close: 174.11,
        };
        ProxyQuote::from_chart("AAPL", prices, Utc::now())
    }

    fn instant_retry(attempts: u32) -> RetryPolicy {
        RetryPolicy {
            attempts,
            unit: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    fn transient() -> TickerError {
        TickerError::Status {
            source_name: "scripted".to_string(),
            status: 503,
        }
    }

    #[test]
    fn backoff_grows_exponentially_and_is_capped() {
        let policy = RetryPolicy {
            attempts: 5,
            unit: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
        };
        assert_eq!(policy.backoff(0), Duration::ZERO);
        assert_eq!(policy.backoff(1), Duration::from_secs(4));
        assert_eq!(policy.backoff(2), Duration::from_secs(6));
        assert_eq!(policy.backoff(3), Duration::from_secs(10));
        assert_eq!(policy.backoff(4), Duration::from_secs(18));
        assert_eq!(policy.backoff(5), Duration::from_secs(30));
    }

    #[test]
    fn gate_reports_remaining_cooldown() {
        let gate = RateLimitGate::new(Duration::from_secs(300));
        let now = Instant::now();
        assert_eq!(gate.remaining(now), None);

        assert_eq!(gate.trip(now, Some(60)), Duration::from_secs(60));
        assert_eq!(gate.remaining(now), Some(Duration::from_secs(60)));
        assert_eq!(gate.remaining(now + Duration::from_secs(61)), None);

        assert_eq!(gate.trip(now, None), Duration::from_secs(300));
    }

    #[tokio::test]
    async fn retries_transient_failures() {
        let inner = ScriptedUpstream::new(vec![Err(transient()), Err(transient()), Ok(quote())]);
        let upstream = ResilientUpstream::new(inner, instant_retry(5), Duration::from_secs(300));

        let fetched = upstream.fetch_quote("AAPL").await.unwrap();
        assert_eq!(fetched.quote.price, "175.34");
        assert_eq!(upstream.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_all_attempts() {
        let inner = ScriptedUpstream::new(vec![Err(transient()), Err(transient())]);
        let upstream = ResilientUpstream::new(inner, instant_retry(2), Duration::from_secs(300));

        let err = upstream.fetch_quote("AAPL").await.unwrap_err();
        assert!(matches!(err, TickerError::Status { status: 503, .. }));
        assert_eq!(upstream.inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn malformed_answers_are_not_retried() {
        let inner = ScriptedUpstream::new(vec![Err(TickerError::malformed("AAPL", "empty"))]);
        let upstream = ResilientUpstream::new(inner, instant_retry(5), Duration::from_secs(300));

        assert!(upstream.fetch_quote("AAPL").await.is_err());
        assert_eq!(upstream.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn rate_limit_starts_cooldown_and_short_circuits() {
        let inner = ScriptedUpstream::new(vec![
            Err(TickerError::RateLimited {
                source_name: "scripted".to_string(),
                retry_after: Some(120),
            }),
            Ok(quote()),
        ]);
        let upstream = ResilientUpstream::new(inner, instant_retry(5), Duration::from_secs(300));

        assert!(upstream.fetch_quote("AAPL").await.unwrap_err().is_rate_limited());
        assert!(upstream.rate_limited_for().is_some());

        let err = upstream.fetch_quote("AAPL").await.unwrap_err();
        assert!(err.is_rate_limited());
        assert_eq!(upstream.inner.calls.load(Ordering::SeqCst), 1);
    }

    struct FlakyMarkets {
        failures_left: AtomicUsize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CoinMarkets for FlakyMarkets {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn fetch_markets(&self, ids: &[String]) -> Result<Vec<CoinRecord>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failures_left.load(Ordering::SeqCst) > 0 {
                self.failures_left.fetch_sub(1, Ordering::SeqCst);
                return Err(transient());
            }
            Ok(ids
                .iter()
                .map(|id| CoinRecord {
                    symbol: id.to_uppercase(),
                    coingecko_id: id.clone(),
                    name: id.clone(),
                    price: 1.0,
                    change_percent_24h: 0.0,
                    volume: 0.0,
                    market_cap: 0.0,
                    timestamp: Utc::now(),
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn market_fetches_share_the_retry_policy() {
        let inner = FlakyMarkets {
            failures_left: AtomicUsize::new(1),
            calls: AtomicUsize::new(0),
        };
        let markets = ResilientUpstream::new(inner, instant_retry(3), Duration::from_secs(300));

        let ids = vec!["bitcoin".to_string(), "solana".to_string()];
        let records = markets.fetch_markets(&ids).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(markets.inner.calls.load(Ordering::SeqCst), 2);
        assert_eq!(CoinMarkets::rate_limited_for(&markets), None);
    }
}
