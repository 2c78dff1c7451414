//! Cross-source aggregation over a store snapshot.
//!
//! Every function here is pure and total: missing inputs produce a
//! `Waiting`/`None` result, never an error. Nothing is cached; the
//! renderer recomputes on every frame.
//!
//! Two spread definitions coexist on purpose:
//! - pairwise spread is `|a - b|` for exactly two keys
//! - multi-source spread is `max - min` over whichever keys are present

use std::time::Duration;

use super::quote::QuoteKey;
use super::store::{Age, QuoteSnapshot};

/// Minimum present candidates before a grand average is shown.
pub const DEFAULT_GRAND_QUORUM: usize = 3;

/// Minimum present sources for the per-asset multi-source statistic.
pub const DEFAULT_MULTI_SOURCE_MIN: usize = 2;

/// Quotes younger than this are shown as live.
pub const DEFAULT_LIVE_AGE: Duration = Duration::from_secs(1);

/// Quotes at least this old are flagged stale.
pub const DEFAULT_STALE_AGE: Duration = Duration::from_secs(60);

/// Average and spread over a set of present prices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub average: f64,
    pub spread: f64,
    /// Number of prices that contributed.
    pub sources: usize,
}

/// Result of a statistic that needs several inputs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Aggregate {
    /// Not enough inputs are present yet.
    Waiting,
    Ready(Summary),
}

impl Aggregate {
    pub const fn summary(&self) -> Option<&Summary> {
        match self {
            Self::Waiting => None,
            Self::Ready(s) => Some(s),
        }
    }

    pub const fn is_waiting(&self) -> bool {
        matches!(self, Self::Waiting)
    }
}

/// Unweighted mean across a quorum of sources.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrandAverage {
    pub average: f64,
    pub sources: usize,
}

/// Average and `|a - b|` spread of two specific keys.
pub fn pair_stats(snapshot: &QuoteSnapshot, a: &QuoteKey, b: &QuoteKey) -> Aggregate {
    match (snapshot.price(a), snapshot.price(b)) {
        (Some(pa), Some(pb)) => Aggregate::Ready(Summary {
            average: (pa + pb) / 2.0,
            spread: (pa - pb).abs(),
            sources: 2,
        }),
        _ => Aggregate::Waiting,
    }
}

/// Mean of the present candidates, or `None` below `quorum`.
pub fn grand_average(
    snapshot: &QuoteSnapshot,
    candidates: &[QuoteKey],
    quorum: usize,
) -> Option<GrandAverage> {
    let prices = snapshot.present_prices(candidates);
    if prices.is_empty() || prices.len() < quorum {
        return None;
    }
    Some(GrandAverage {
        average: mean(&prices),
        sources: prices.len(),
    })
}

/// Mean and `max - min` spread of the present candidates.
///
/// Proceeds with whatever subset is present once `min_sources` is met.
pub fn multi_source_stats(
    snapshot: &QuoteSnapshot,
    candidates: &[QuoteKey],
    min_sources: usize,
) -> Aggregate {
    let prices = snapshot.present_prices(candidates);
    if prices.is_empty() || prices.len() < min_sources {
        return Aggregate::Waiting;
    }
    let (lo, hi) = prices
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &p| {
            (lo.min(p), hi.max(p))
        });
    Aggregate::Ready(Summary {
        average: mean(&prices),
        spread: hi - lo,
        sources: prices.len(),
    })
}

fn mean(prices: &[f64]) -> f64 {
    prices.iter().sum::<f64>() / prices.len() as f64
}

/// Display classification of a quote's age.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Never written.
    Waiting,
    /// Younger than the live threshold.
    Live,
    /// Older than live but not yet stale.
    Recent(Duration),
    Stale(Duration),
}

/// Age cut-offs used by `classify_age`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessThresholds {
    pub live: Duration,
    pub stale: Duration,
}

impl Default for FreshnessThresholds {
    fn default() -> Self {
        Self {
            live: DEFAULT_LIVE_AGE,
            stale: DEFAULT_STALE_AGE,
        }
    }
}

pub fn classify_age(age: Age, thresholds: &FreshnessThresholds) -> Freshness {
    match age {
        Age::Infinite => Freshness::Waiting,
        Age::Finite(d) if d < thresholds.live => Freshness::Live,
        Age::Finite(d) if d < thresholds.stale => Freshness::Recent(d),
        Age::Finite(d) => Freshness::Stale(d),
    }
}
