//! Core quote domain types.
//!
//! A quote is one observed price for a (source, asset, quote currency)
//! triple. The key space is a closed set of enums so every lookup is
//! checked at compile time.

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Upstream feed that produced a quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Source {
    /// Binance trade-tick WebSocket stream.
    Binance,
    /// Coinbase ticker WebSocket channel.
    Coinbase,
    /// Chainlink on-chain aggregator, polled over JSON-RPC.
    Chainlink,
}

impl Source {
    /// All sources in display order.
    pub const ALL: [Self; 3] = [Self::Binance, Self::Coinbase, Self::Chainlink];

    /// Lowercase label used for metrics and log fields.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Binance => "binance",
            Self::Coinbase => "coinbase",
            Self::Chainlink => "chainlink",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Binance => write!(f, "Binance"),
            Self::Coinbase => write!(f, "Coinbase"),
            Self::Chainlink => write!(f, "Chainlink"),
        }
    }
}

/// Tracked base assets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Asset {
    /// Bitcoin
    BTC,
    /// Ether
    ETH,
}

impl Asset {
    pub const ALL: [Self; 2] = [Self::BTC, Self::ETH];

    /// Parse an upper-case ticker such as `BTC`.
    pub fn from_ticker(ticker: &str) -> Option<Self> {
        match ticker {
            "BTC" => Some(Self::BTC),
            "ETH" => Some(Self::ETH),
            _ => None,
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BTC => write!(f, "BTC"),
            Self::ETH => write!(f, "ETH"),
        }
    }
}

/// Currency a price is denominated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QuoteCurrency {
    USD,
    USDT,
}

impl QuoteCurrency {
    pub fn from_ticker(ticker: &str) -> Option<Self> {
        match ticker {
            "USD" => Some(Self::USD),
            "USDT" => Some(Self::USDT),
            _ => None,
        }
    }
}

impl fmt::Display for QuoteCurrency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::USD => write!(f, "USD"),
            Self::USDT => write!(f, "USDT"),
        }
    }
}

/// Composite store key: one slot per (source, asset, quote currency).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QuoteKey {
    pub source: Source,
    pub asset: Asset,
    pub quote: QuoteCurrency,
}

impl QuoteKey {
    pub const fn new(source: Source, asset: Asset, quote: QuoteCurrency) -> Self {
        Self { source, asset, quote }
    }

    /// Every key the dashboard tracks for one asset, in display order.
    ///
    /// Binance only lists USDT pairs and Chainlink only reports USD, so
    /// each asset has four slots rather than six.
    pub const fn tracked(asset: Asset) -> [Self; 4] {
        [
            Self::new(Source::Binance, asset, QuoteCurrency::USDT),
            Self::new(Source::Coinbase, asset, QuoteCurrency::USD),
            Self::new(Source::Coinbase, asset, QuoteCurrency::USDT),
            Self::new(Source::Chainlink, asset, QuoteCurrency::USD),
        ]
    }

    /// Pair label such as `BTC/USDT`.
    pub fn pair(&self) -> String {
        format!("{}/{}", self.asset, self.quote)
    }
}

impl fmt::Display for QuoteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.source, self.asset, self.quote)
    }
}

/// Latest observation for a key.
///
/// `observed_at` is the local receipt time; upstream event times are
/// never used for staleness.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quote {
    pub price: f64,
    pub observed_at: Instant,
}

/// Returns true when `price` may be written to the store.
pub fn is_valid_price(price: f64) -> bool {
    price.is_finite() && price > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracked_keys_cover_each_source() {
        let keys = QuoteKey::tracked(Asset::BTC);
        for source in Source::ALL {
            assert!(keys.iter().any(|k| k.source == source));
        }
        assert!(keys.iter().all(|k| k.asset == Asset::BTC));
    }

    #[test]
    fn test_chainlink_is_usd_only() {
        let keys = QuoteKey::tracked(Asset::ETH);
        let chainlink: Vec<_> = keys.iter().filter(|k| k.source == Source::Chainlink).collect();
        assert_eq!(chainlink.len(), 1);
        assert_eq!(chainlink[0].quote, QuoteCurrency::USD);
    }

    #[test]
    fn test_pair_label() {
        let key = QuoteKey::new(Source::Coinbase, Asset::ETH, QuoteCurrency::USDT);
        assert_eq!(key.pair(), "ETH/USDT");
        assert_eq!(key.to_string(), "Coinbase ETH/USDT");
    }

    #[test]
    fn test_price_validity() {
        assert!(is_valid_price(0.01));
        assert!(!is_valid_price(0.0));
        assert!(!is_valid_price(-5.0));
        assert!(!is_valid_price(f64::NAN));
        assert!(!is_valid_price(f64::INFINITY));
    }
}
