//! Time-to-live caches of proxy data.
//!
//! Two clocks run side by side. The cache as a whole is stale once `ttl` has passed
//! since the last full refresh, which makes the next request sweep every configured
//! key. Each entry also carries the instant it was stored and is only served while it
//! is at most `ttl` old, so keys fetched on demand outside the configured set expire
//! just like the swept ones. Expired entries are evicted on every full refresh.
//!
//! Time is passed in explicitly; the caches never read the clock themselves.
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::model::coin::CoinRecord;
use crate::model::quote::ProxyQuote;

/// Stock and crypto quotes keyed by display symbol.
pub type QuoteCache = TtlCache<ProxyQuote>;
/// CoinGecko market records keyed by CoinGecko id.
pub type CoinCache = TtlCache<CoinRecord>;

#[derive(Debug)]
struct Entry<T> {
    value: T,
    stored_at: Instant,
}

/// Values keyed by string, each served for at most `ttl`.
#[derive(Debug)]
pub struct TtlCache<T> {
    entries: HashMap<String, Entry<T>>,
    refreshed_at: Option<Instant>,
    ttl: Duration,
}

impl<T> TtlCache<T> {
    /// Empty cache, stale until the first refresh.
    pub fn new(ttl: Duration) -> Self {
        TtlCache {
            entries: HashMap::new(),
            refreshed_at: None,
            ttl,
        }
    }

    /// `true` before the first refresh and once `ttl` has passed since the last one.
    pub fn is_stale(&self, now: Instant) -> bool {
        match self.refreshed_at {
            Some(at) => now.saturating_duration_since(at) > self.ttl,
            None => true,
        }
    }

    /// Time since the last full refresh.
    pub fn age(&self, now: Instant) -> Option<Duration> {
        self.refreshed_at.map(|at| now.saturating_duration_since(at))
    }

    /// Value for `key` if it is still within its lifetime at `now`.
    pub fn get(&self, key: &str, now: Instant) -> Option<&T> {
        self.entries
            .get(key)
            .filter(|entry| !self.expired(entry, now))
            .map(|entry| &entry.value)
    }

    /// Inserts or replaces one value, stamped with `now`.
    pub fn insert(&mut self, key: impl Into<String>, value: T, now: Instant) {
        self.entries.insert(
            key.into(),
            Entry {
                value,
                stored_at: now,
            },
        );
    }

    /// Evicts expired entries, stores the result of a full refresh and restarts the
    /// cache-wide TTL.
    pub fn complete_refresh(&mut self, values: Vec<(String, T)>, now: Instant) {
        let ttl = self.ttl;
        self.entries
            .retain(|_, entry| now.saturating_duration_since(entry.stored_at) <= ttl);
        for (key, value) in values {
            self.insert(key, value, now);
        }
        self.refreshed_at = Some(now);
    }

    /// Every live value at `now`, in no particular order.
    pub fn values(&self, now: Instant) -> Vec<&T> {
        self.entries
            .values()
            .filter(|entry| !self.expired(entry, now))
            .map(|entry| &entry.value)
            .collect()
    }

    /// Number of stored entries, expired ones included until the next refresh.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn expired(&self, entry: &Entry<T>, now: Instant) -> bool {
        now.saturating_duration_since(entry.stored_at) > self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(300);

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn stale_until_first_refresh() {
        let now = Instant::now();
        let mut cache: TtlCache<u32> = TtlCache::new(TTL);
        assert!(cache.is_stale(now));
        assert_eq!(cache.age(now), None);

        cache.complete_refresh(vec![("AAPL".to_string(), 175)], now);
        assert!(!cache.is_stale(now));
        assert!(!cache.is_stale(now + secs(300)));
        assert!(cache.is_stale(now + secs(301)));
        assert_eq!(cache.age(now + secs(5)), Some(secs(5)));
    }

    #[test]
    fn entries_expire_individually() {
        let now = Instant::now();
        let mut cache: TtlCache<u32> = TtlCache::new(TTL);
        cache.complete_refresh(vec![("AAPL".to_string(), 175)], now);
        cache.insert("IBM", 101, now + secs(200));

        assert_eq!(cache.get("IBM", now + secs(300)), Some(&101));
        assert_eq!(cache.get("AAPL", now + secs(301)), None);
        assert_eq!(cache.get("IBM", now + secs(501)), None);
        assert_eq!(cache.values(now + secs(301)), vec![&101]);
    }

    #[test]
    fn refresh_within_ttl_keeps_entries_it_could_not_update() {
        let now = Instant::now();
        let mut cache: TtlCache<u32> = TtlCache::new(TTL);
        cache.complete_refresh(
            vec![("AAPL".to_string(), 175), ("BTC".to_string(), 60_000)],
            now,
        );
        cache.complete_refresh(vec![("AAPL".to_string(), 180)], now + secs(100));

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("AAPL", now + secs(100)), Some(&180));
        assert_eq!(cache.get("BTC", now + secs(100)), Some(&60_000));
    }

    #[test]
    fn refresh_evicts_expired_entries() {
        let now = Instant::now();
        let mut cache: TtlCache<u32> = TtlCache::new(TTL);
        cache.complete_refresh(vec![("AAPL".to_string(), 175)], now);
        cache.insert("IBM", 101, now);

        cache.complete_refresh(vec![("AAPL".to_string(), 180)], now + secs(400));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("IBM", now + secs(400)), None);
    }
}
