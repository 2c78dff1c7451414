//! Quote Store - Shared Latest-Value Price State
//!
//! Concurrent map from `QuoteKey` to the most recent `Quote`. Every
//! feed writes here and the renderer reads point-in-time snapshots.
//! Entries are never evicted; staleness is reported as an age.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::debug;

use super::quote::{is_valid_price, Quote, QuoteKey};

/// Elapsed time since a key was last written.
///
/// `Infinite` sorts after every finite age so a missing key always
/// looks older than any stored one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Age {
    Finite(Duration),
    Infinite,
}

impl Age {
    pub const fn is_infinite(&self) -> bool {
        matches!(self, Self::Infinite)
    }

    pub fn as_secs_f64(&self) -> f64 {
        match self {
            Self::Finite(d) => d.as_secs_f64(),
            Self::Infinite => f64::INFINITY,
        }
    }
}

/// Latest-value store shared by all feeds.
///
/// Writes are per-key atomic: a reader sees either the previous or
/// the new `(price, observed_at)` pair, never a mix. Ordering is by
/// arrival, so a late stale update overwrites a newer one.
#[derive(Debug, Default)]
pub struct QuoteStore {
    quotes: DashMap<QuoteKey, Quote>,
}

impl QuoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the entry for `key` with `(price, now)`.
    ///
    /// Returns false and leaves the entry untouched when the price is
    /// non-positive or not finite.
    pub fn update(&self, key: QuoteKey, price: f64, now: Instant) -> bool {
        if !is_valid_price(price) {
            debug!(key = %key, price, "Rejected invalid price");
            return false;
        }
        self.quotes.insert(
            key,
            Quote {
                price,
                observed_at: now,
            },
        );
        true
    }

    /// Overwrite the entry for `key` stamped with the current instant.
    pub fn record(&self, key: QuoteKey, price: f64) -> bool {
        self.update(key, price, Instant::now())
    }

    pub fn get(&self, key: &QuoteKey) -> Option<Quote> {
        self.quotes.get(key).map(|entry| *entry.value())
    }

    /// Age of `key` relative to `now`, or `Age::Infinite` if never written.
    pub fn age(&self, key: &QuoteKey, now: Instant) -> Age {
        self.get(key).map_or(Age::Infinite, |q| {
            Age::Finite(now.saturating_duration_since(q.observed_at))
        })
    }

    /// Copy every entry into an immutable snapshot.
    pub fn snapshot(&self) -> QuoteSnapshot {
        let quotes = self
            .quotes
            .iter()
            .map(|entry| (*entry.key(), *entry.value()))
            .collect();
        QuoteSnapshot {
            quotes,
            taken_at: Instant::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}

/// Immutable copy of the store taken at `taken_at`.
///
/// Each entry is individually consistent; entries written during the
/// copy may or may not be included.
#[derive(Debug, Clone)]
pub struct QuoteSnapshot {
    quotes: HashMap<QuoteKey, Quote>,
    taken_at: Instant,
}

impl QuoteSnapshot {
    /// Build a snapshot directly, mostly useful for tests and replays.
    pub fn from_quotes(quotes: HashMap<QuoteKey, Quote>, taken_at: Instant) -> Self {
        Self { quotes, taken_at }
    }

    pub fn get(&self, key: &QuoteKey) -> Option<Quote> {
        self.quotes.get(key).copied()
    }

    pub fn price(&self, key: &QuoteKey) -> Option<f64> {
        self.quotes.get(key).map(|q| q.price)
    }

    /// Age at the moment the snapshot was taken.
    pub fn age(&self, key: &QuoteKey) -> Age {
        self.get(key).map_or(Age::Infinite, |q| {
            Age::Finite(self.taken_at.saturating_duration_since(q.observed_at))
        })
    }

    /// Prices of the keys in `candidates` that are present, in candidate order.
    pub fn present_prices(&self, candidates: &[QuoteKey]) -> Vec<f64> {
        candidates.iter().filter_map(|k| self.price(k)).collect()
    }

    pub const fn taken_at(&self) -> Instant {
        self.taken_at
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::domain::quote::{Asset, QuoteCurrency, Source};

    const BN_BTC: QuoteKey = QuoteKey::new(Source::Binance, Asset::BTC, QuoteCurrency::USDT);
    const CL_BTC: QuoteKey = QuoteKey::new(Source::Chainlink, Asset::BTC, QuoteCurrency::USD);

    #[test]
    fn test_last_write_wins() {
        let store = QuoteStore::new();
        let t0 = Instant::now();
        store.update(BN_BTC, 65_000.0, t0);
        store.update(BN_BTC, 10.0, t0 + Duration::from_millis(5));
        store.update(BN_BTC, 64_000.0, t0 + Duration::from_millis(10));

        let quote = store.get(&BN_BTC).unwrap();
        assert_eq!(quote.price, 64_000.0);
        assert_eq!(quote.observed_at, t0 + Duration::from_millis(10));
    }

    #[test]
    fn test_late_older_update_still_overwrites() {
        let store = QuoteStore::new();
        let t0 = Instant::now();
        store.update(BN_BTC, 2.0, t0 + Duration::from_secs(2));
        store.update(BN_BTC, 1.0, t0);
        assert_eq!(store.get(&BN_BTC).unwrap().price, 1.0);
    }

    #[test]
    fn test_absent_key_is_infinite() {
        let store = QuoteStore::new();
        assert!(store.get(&CL_BTC).is_none());
        assert_eq!(store.age(&CL_BTC, Instant::now()), Age::Infinite);
        assert!(store.is_empty());
    }

    #[test]
    fn test_age_grows_then_resets() {
        let store = QuoteStore::new();
        let t0 = Instant::now();
        store.update(CL_BTC, 100.0, t0);

        let a1 = store.age(&CL_BTC, t0 + Duration::from_secs(1));
        let a2 = store.age(&CL_BTC, t0 + Duration::from_secs(4));
        assert!(a2 > a1);
        assert_eq!(a2, Age::Finite(Duration::from_secs(4)));

        let t1 = t0 + Duration::from_secs(5);
        store.update(CL_BTC, 101.0, t1);
        assert_eq!(store.age(&CL_BTC, t1), Age::Finite(Duration::ZERO));
    }

    #[test]
    fn test_rejects_non_positive_prices() {
        let store = QuoteStore::new();
        assert!(!store.record(BN_BTC, 0.0));
        assert!(!store.record(BN_BTC, -1.0));
        assert!(store.get(&BN_BTC).is_none());

        assert!(store.record(BN_BTC, 5.0));
        assert!(!store.record(BN_BTC, f64::NAN));
        assert_eq!(store.get(&BN_BTC).unwrap().price, 5.0);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let store = QuoteStore::new();
        store.record(BN_BTC, 1.0);
        let snap = store.snapshot();
        store.record(BN_BTC, 2.0);
        store.record(CL_BTC, 3.0);

        assert_eq!(snap.price(&BN_BTC), Some(1.0));
        assert_eq!(snap.price(&CL_BTC), None);
        assert_eq!(snap.len(), 1);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_concurrent_writers_do_not_lose_keys() {
        let store = Arc::new(QuoteStore::new());
        let handles: Vec<_> = QuoteKey::tracked(Asset::BTC)
            .into_iter()
            .chain(QuoteKey::tracked(Asset::ETH))
            .enumerate()
            .map(|(i, key)| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for n in 1..=1_000 {
                        store.record(key, (i * 10_000 + n) as f64);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(store.len(), 8);
        for (i, key) in QuoteKey::tracked(Asset::BTC)
            .into_iter()
            .chain(QuoteKey::tracked(Asset::ETH))
            .enumerate()
        {
            assert_eq!(store.get(&key).unwrap().price, (i * 10_000 + 1_000) as f64);
        }
    }
}
