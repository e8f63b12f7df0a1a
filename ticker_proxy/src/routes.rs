//! HTTP surface of the quote proxy.
//!
//! | Route | Answer |
//! |---|---|
//! | `GET /`, `GET /health` | service status |
//! | `GET /api/quotes?symbols=A,B` | array of quotes, all configured symbols when `symbols` is empty |
//! | `GET /api/quote/{symbol}` | one quote |
//! | `GET /api/crypto`, `GET /api/prices` | every tracked coin, largest market cap first |
//! | `GET /api/crypto/{symbol or coingecko id}` | one coin |
//! | anything else | 404 |
//!
//! Both caches sit behind a `std::sync::Mutex` that is only taken inside synchronous
//! helpers and never held across an `.await`. Full refreshes are serialized by an async
//! lock per cache so concurrent requests on a stale cache trigger a single upstream
//! sweep.
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::Json;
use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::{Method, Uri, header};
use axum::routing::get;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use ticker_common::symbols::{coingecko_id, coingecko_ids, display_symbol};
use tower_http::cors::{Any, CorsLayer};

use crate::config::ProxyConfig;
use crate::error::ProxyError;
use crate::model::cache::{CoinCache, QuoteCache};
use crate::model::coin::CoinRecord;
use crate::model::quote::ProxyQuote;
use crate::upstream::{CoinMarkets, Upstream};

const CORS_MAX_AGE: Duration = Duration::from_secs(86_400);

/// Shared state of all handlers.
pub struct AppState {
    config: ProxyConfig,
    cache: Mutex<QuoteCache>,
    upstream: Arc<dyn Upstream>,
    refresh_lock: tokio::sync::Mutex<()>,
    coins: Mutex<CoinCache>,
    markets: Arc<dyn CoinMarkets>,
    coin_refresh_lock: tokio::sync::Mutex<()>,
}

impl AppState {
    /// State with empty caches.
    pub fn new(
        config: ProxyConfig,
        upstream: Arc<dyn Upstream>,
        markets: Arc<dyn CoinMarkets>,
    ) -> Self {
        let cache = QuoteCache::new(config.cache_ttl());
        let coins = CoinCache::new(config.cache_ttl());
        AppState {
            config,
            cache: Mutex::new(cache),
            upstream,
            refresh_lock: tokio::sync::Mutex::new(()),
            coins: Mutex::new(coins),
            markets,
            coin_refresh_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    fn with_cache<T>(&self, f: impl FnOnce(&mut QuoteCache) -> T) -> Result<T, ProxyError> {
        let mut cache = self.cache.lock()?;
        Ok(f(&mut cache))
    }

    fn with_coins<T>(&self, f: impl FnOnce(&mut CoinCache) -> T) -> Result<T, ProxyError> {
        let mut coins = self.coins.lock()?;
        Ok(f(&mut coins))
    }
}

/// Fetches every configured symbol and merges the result into the cache.
///
/// Symbols are fetched one after another with the configured delay. A rate limit ends
/// the sweep early. The TTL restarts even when nothing could be fetched, so a failing
/// upstream is swept at most once per TTL. Returns the number of quotes refreshed.
pub async fn refresh_cache(state: &AppState) -> Result<usize, ProxyError> {
    let _guard = state.refresh_lock.lock().await;
    refresh_locked(state).await
}

async fn refresh_locked(state: &AppState) -> Result<usize, ProxyError> {
    let symbols = &state.config.symbols;
    info!("Refreshing {} symbols from {}", symbols.len(), state.upstream.name());

    let mut fresh = Vec::with_capacity(symbols.len());
    for (i, symbol) in symbols.iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(state.config.request_delay()).await;
        }
        match state.upstream.fetch_quote(symbol).await {
            Ok(quote) => fresh.push(quote),
            Err(e) if e.is_rate_limited() => {
                warn!("Rate limited during refresh, keeping cached values: {}", e);
                break;
            }
            Err(e) => warn!("Refresh of {} failed: {}", symbol, e),
        }
    }

    let count = fresh.len();
    let fresh: Vec<(String, ProxyQuote)> = fresh
        .into_iter()
        .map(|quote| (quote.symbol().to_string(), quote))
        .collect();
    state.with_cache(|cache| cache.complete_refresh(fresh, Instant::now()))?;
    info!("Refreshed {}/{} symbols", count, symbols.len());
    Ok(count)
}

async fn ensure_fresh(state: &AppState) -> Result<(), ProxyError> {
    if !state.with_cache(|cache| cache.is_stale(Instant::now()))? {
        return Ok(());
    }
    let _guard = state.refresh_lock.lock().await;
    // Another request may have refreshed while we waited.
    if state.with_cache(|cache| cache.is_stale(Instant::now()))? {
        refresh_locked(state).await?;
    }
    Ok(())
}

async fn cached_or_fetch(state: &AppState, symbol: &str) -> Result<ProxyQuote, ProxyError> {
    if let Some(quote) = state.with_cache(|cache| cache.get(symbol, Instant::now()).cloned())? {
        return Ok(quote);
    }
    debug!("{} not cached, fetching", symbol);
    let quote = state
        .upstream
        .fetch_quote(symbol)
        .await
        .map_err(|e| ProxyError::upstream(symbol, e))?;
    let key = quote.symbol().to_string();
    state.with_cache(|cache| cache.insert(key, quote.clone(), Instant::now()))?;
    Ok(quote)
}

/// Fetches every tracked coin in one batch and replaces the coin cache.
///
/// A failed fetch still restarts the TTL; records younger than the TTL stay served.
/// Returns the number of coins refreshed.
pub async fn refresh_coins(state: &AppState) -> Result<usize, ProxyError> {
    let _guard = state.coin_refresh_lock.lock().await;
    refresh_coins_locked(state).await
}

async fn refresh_coins_locked(state: &AppState) -> Result<usize, ProxyError> {
    let ids: Vec<String> = coingecko_ids().into_iter().map(String::from).collect();
    info!("Refreshing {} coins from {}", ids.len(), state.markets.name());

    let records = match state.markets.fetch_markets(&ids).await {
        Ok(records) => records,
        Err(e) => {
            warn!("Coin refresh failed, keeping cached values: {}", e);
            Vec::new()
        }
    };

    let count = records.len();
    let records: Vec<(String, CoinRecord)> = records
        .into_iter()
        .map(|record| (record.coingecko_id.clone(), record))
        .collect();
    state.with_coins(|coins| coins.complete_refresh(records, Instant::now()))?;
    info!("Refreshed {}/{} coins", count, ids.len());
    Ok(count)
}

async fn ensure_coins_fresh(state: &AppState) -> Result<(), ProxyError> {
    if !state.with_coins(|coins| coins.is_stale(Instant::now()))? {
        return Ok(());
    }
    let _guard = state.coin_refresh_lock.lock().await;
    if state.with_coins(|coins| coins.is_stale(Instant::now()))? {
        refresh_coins_locked(state).await?;
    }
    Ok(())
}

/// CoinGecko id for a symbol (`btc`) or an id (`Bitcoin`), case-insensitively.
fn resolve_coin(symbol_or_id: &str) -> Option<&'static str> {
    let lower = symbol_or_id.trim().to_ascii_lowercase();
    coingecko_id(&lower).or_else(|| coingecko_ids().into_iter().find(|id| *id == lower))
}

/// Body of the health endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Always `"up"` while the process serves requests.
    pub status: String,
    /// Human readable summary.
    pub message: String,
    /// Time of the answer.
    pub timestamp: DateTime<Utc>,
    /// Seconds since the last full refresh.
    pub cache_age_secs: Option<u64>,
    /// Remaining rate-limit cooldown of the quote upstream.
    pub rate_limited_for_secs: Option<u64>,
    /// Remaining rate-limit cooldown of the coin market upstream.
    pub crypto_rate_limited_for_secs: Option<u64>,
}

async fn health(State(state): State<Arc<AppState>>) -> Result<Json<HealthStatus>, ProxyError> {
    let age = state.with_cache(|cache| cache.age(Instant::now()))?;
    Ok(Json(HealthStatus {
        status: "up".to_string(),
        message: "Ticker quote proxy is running".to_string(),
        timestamp: Utc::now(),
        cache_age_secs: age.map(|a| a.as_secs()),
        rate_limited_for_secs: state.upstream.rate_limited_for().map(|d| d.as_secs()),
        crypto_rate_limited_for_secs: state.markets.rate_limited_for().map(|d| d.as_secs()),
    }))
}

/// Query of `/api/quotes`.
#[derive(Debug, Default, Deserialize)]
pub struct QuotesQuery {
    /// Comma separated symbols.
    pub symbols: Option<String>,
}

fn requested_symbols(query: &QuotesQuery, config: &ProxyConfig) -> Vec<String> {
    let mut symbols: Vec<String> = Vec::new();
    for symbol in query
        .symbols
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(display_symbol)
    {
        if !symbols.contains(&symbol) {
            symbols.push(symbol);
        }
    }
    if symbols.is_empty() {
        symbols = config.symbols.iter().map(|s| display_symbol(s)).collect();
    }
    symbols
}

async fn quotes(
    State(state): State<Arc<AppState>>,
    Query(query): Query<QuotesQuery>,
) -> Result<Json<Vec<ProxyQuote>>, ProxyError> {
    ensure_fresh(&state).await?;

    let symbols = requested_symbols(&query, &state.config);
    let mut answer = Vec::with_capacity(symbols.len());
    for symbol in &symbols {
        match cached_or_fetch(&state, symbol).await {
            Ok(quote) => answer.push(quote),
            Err(e) => warn!("Skipping {}: {}", symbol, e),
        }
    }

    if answer.is_empty() {
        if let Some(remaining) = state.upstream.rate_limited_for() {
            return Err(ProxyError::RateLimited {
                retry_after: remaining.as_secs().max(1),
            });
        }
    }
    debug!("Serving {}/{} quotes", answer.len(), symbols.len());
    Ok(Json(answer))
}

async fn quote(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> Result<Json<ProxyQuote>, ProxyError> {
    let symbol = display_symbol(symbol.trim());
    if symbol.is_empty() {
        return Err(ProxyError::NotFound("Symbol is required".to_string()));
    }
    ensure_fresh(&state).await?;
    cached_or_fetch(&state, &symbol).await.map(Json)
}

async fn crypto(State(state): State<Arc<AppState>>) -> Result<Json<Vec<CoinRecord>>, ProxyError> {
    ensure_coins_fresh(&state).await?;

    let mut records: Vec<CoinRecord> =
        state.with_coins(|coins| coins.values(Instant::now()).into_iter().cloned().collect())?;
    if records.is_empty() {
        if let Some(remaining) = state.markets.rate_limited_for() {
            return Err(ProxyError::RateLimited {
                retry_after: remaining.as_secs().max(1),
            });
        }
        return Err(ProxyError::Unavailable(
            "No cryptocurrency data available".to_string(),
        ));
    }
    records.sort_by(|a, b| b.market_cap.total_cmp(&a.market_cap));
    debug!("Serving {} coins", records.len());
    Ok(Json(records))
}

async fn crypto_one(
    State(state): State<Arc<AppState>>,
    Path(symbol_or_id): Path<String>,
) -> Result<Json<CoinRecord>, ProxyError> {
    let Some(id) = resolve_coin(&symbol_or_id) else {
        return Err(ProxyError::NotFound(format!(
            "Unknown cryptocurrency: {}",
            symbol_or_id
        )));
    };
    ensure_coins_fresh(&state).await?;

    state
        .with_coins(|coins| coins.get(id, Instant::now()).cloned())?
        .map(Json)
        .ok_or_else(|| ProxyError::NotFound(format!("No data available for {}", symbol_or_id)))
}

async fn not_found(uri: Uri) -> ProxyError {
    ProxyError::NotFound(format!("Endpoint not found: {}", uri.path()))
}

/// Router with every endpoint and the CORS layer.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(CORS_MAX_AGE);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/quotes", get(quotes))
        .route("/api/quote/:symbol", get(quote))
        .route("/api/crypto", get(crypto))
        .route("/api/prices", get(crypto))
        .route("/api/crypto/:symbol_or_id", get(crypto_one))
        .fallback(not_found)
        .layer(cors)
        .with_state(state)
}
