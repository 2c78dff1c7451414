//! Coinbase WebSocket Feed - Ticker Channel with Mid-Price
//!
//! Subscribes to the `ticker` channel for every configured product in
//! a single request. Each ticker is priced at the top-of-book mid when
//! both sides are positive, falling back to the last trade price.
//! USD and USDT products of the same asset land in separate keys.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, instrument};

use super::error::{parse_price, FeedError};
use super::session::stream_text_frames;
use crate::adapters::metrics::FeedMetrics;
use crate::config::CoinbaseConfig;
use crate::domain::quote::{Asset, QuoteCurrency, QuoteKey, Source};
use crate::ports::price_feed::{PriceFeed, SessionStatus};
use crate::ports::quote_sink::QuoteSink;

/// Coinbase WebSocket subscribe message.
#[derive(Serialize)]
struct SubscribeMsg<'a> {
    #[serde(rename = "type")]
    msg_type: &'static str,
    channels: [ChannelSub<'a>; 1],
}

#[derive(Serialize)]
struct ChannelSub<'a> {
    name: &'static str,
    product_ids: &'a [String],
}

/// Coinbase WebSocket ticker message.
#[derive(Debug, Deserialize)]
struct TickerMsg {
    #[serde(rename = "type")]
    msg_type: String,
    product_id: Option<String>,
    price: Option<String>,
    best_bid: Option<String>,
    best_ask: Option<String>,
}

/// Coinbase real-time price feed via WebSocket.
pub struct CoinbaseFeed {
    config: CoinbaseConfig,
    /// Product ids in subscription order, e.g. `BTC-USD`, `BTC-USDT`.
    product_ids: Vec<String>,
    products: HashMap<String, QuoteKey>,
    sink: Arc<dyn QuoteSink>,
    metrics: Arc<FeedMetrics>,
}

impl CoinbaseFeed {
    pub fn new(
        config: CoinbaseConfig,
        assets: &[Asset],
        sink: Arc<dyn QuoteSink>,
        metrics: Arc<FeedMetrics>,
    ) -> Self {
        let mut product_ids = Vec::new();
        let mut products = HashMap::new();
        for &asset in assets {
            for quote in [QuoteCurrency::USD, QuoteCurrency::USDT] {
                let id = format!("{asset}-{quote}");
                products.insert(id.clone(), QuoteKey::new(Source::Coinbase, asset, quote));
                product_ids.push(id);
            }
        }

        Self {
            config,
            product_ids,
            products,
            sink,
            metrics,
        }
    }

    pub fn product_ids(&self) -> &[String] {
        &self.product_ids
    }

    /// JSON subscribe frame naming every product on the ticker channel.
    pub fn subscribe_message(&self) -> anyhow::Result<String> {
        let msg = SubscribeMsg {
            msg_type: "subscribe",
            channels: [ChannelSub {
                name: "ticker",
                product_ids: &self.product_ids,
            }],
        };
        Ok(serde_json::to_string(&msg)?)
    }

    fn handle_message(&self, text: &str) {
        match parse_ticker(text, &self.products) {
            Ok(Some((key, price))) => {
                if self.sink.record(key, price) {
                    self.metrics.quote_written(Source::Coinbase);
                }
            }
            Ok(None) => {}
            Err(e) => {
                debug!(error = %e, "Dropped Coinbase message");
                self.metrics.message_dropped(Source::Coinbase, e.reason());
            }
        }
    }
}

#[async_trait]
impl PriceFeed for CoinbaseFeed {
    fn name(&self) -> &'static str {
        "coinbase"
    }

    fn source(&self) -> Source {
        Source::Coinbase
    }

    #[instrument(skip(self, status, shutdown_rx), fields(products = self.product_ids.len()))]
    async fn run_session(
        &self,
        status: &dyn SessionStatus,
        shutdown_rx: &mut broadcast::Receiver<()>,
    ) -> anyhow::Result<()> {
        let subscribe = self.subscribe_message()?;
        stream_text_frames(
            self.name(),
            &self.config.ws_url,
            Some(subscribe),
            &self.config.timing,
            status,
            shutdown_rx,
            |text| self.handle_message(text),
        )
        .await
    }
}

/// Decode a ticker frame into a store write.
///
/// Non-ticker frames (subscriptions, heartbeats) and untracked
/// products yield `Ok(None)`.
fn parse_ticker(
    text: &str,
    products: &HashMap<String, QuoteKey>,
) -> Result<Option<(QuoteKey, f64)>, FeedError> {
    let msg: TickerMsg = serde_json::from_str(text)?;
    if msg.msg_type != "ticker" {
        return Ok(None);
    }
    let Some(key) = msg.product_id.as_ref().and_then(|id| products.get(id)) else {
        return Ok(None);
    };

    if let Some(mid) = mid_price(msg.best_bid.as_deref(), msg.best_ask.as_deref()) {
        return Ok(Some((*key, mid)));
    }

    let price = msg
        .price
        .as_deref()
        .ok_or_else(|| FeedError::Decode("ticker without bid/ask or price".into()))?;
    Ok(Some((*key, parse_price(price)?)))
}

/// `(bid + ask) / 2` when both sides parse and are strictly positive.
fn mid_price(bid: Option<&str>, ask: Option<&str>) -> Option<f64> {
    let bid: f64 = bid?.trim().parse().ok()?;
    let ask: f64 = ask?.trim().parse().ok()?;
    (bid > 0.0 && ask > 0.0).then(|| (bid + ask) / 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::store::QuoteStore;

    fn feed(store: Arc<QuoteStore>) -> CoinbaseFeed {
        CoinbaseFeed::new(
            CoinbaseConfig::default(),
            &[Asset::BTC],
            store,
            Arc::new(FeedMetrics::new().unwrap()),
        )
    }

    const USD: QuoteKey = QuoteKey::new(Source::Coinbase, Asset::BTC, QuoteCurrency::USD);
    const USDT: QuoteKey = QuoteKey::new(Source::Coinbase, Asset::BTC, QuoteCurrency::USDT);

    #[test]
    fn test_subscribe_names_all_products() {
        let store = Arc::new(QuoteStore::new());
        let feed = feed(store);
        let msg: serde_json::Value = serde_json::from_str(&feed.subscribe_message().unwrap()).unwrap();
        assert_eq!(msg["type"], "subscribe");
        assert_eq!(msg["channels"][0]["name"], "ticker");
        assert_eq!(
            msg["channels"][0]["product_ids"],
            serde_json::json!(["BTC-USD", "BTC-USDT"])
        );
    }

    #[test]
    fn test_mid_price_preferred() {
        let store = Arc::new(QuoteStore::new());
        let feed = feed(Arc::clone(&store));
        feed.handle_message(
            r#"{"type":"ticker","product_id":"BTC-USD","price":"65010.00","best_bid":"65000.00","best_ask":"65002.00"}"#,
        );
        assert_eq!(store.get(&USD).unwrap().price, 65_001.0);
        assert!(store.get(&USDT).is_none());
    }

    #[test]
    fn test_falls_back_to_last_price() {
        let store = Arc::new(QuoteStore::new());
        let feed = feed(Arc::clone(&store));
        feed.handle_message(
            r#"{"type":"ticker","product_id":"BTC-USDT","price":"64990.5","best_bid":"0","best_ask":"65000"}"#,
        );
        assert_eq!(store.get(&USDT).unwrap().price, 64_990.5);

        feed.handle_message(r#"{"type":"ticker","product_id":"BTC-USD","price":"64000"}"#);
        assert_eq!(store.get(&USD).unwrap().price, 64_000.0);
    }

    #[test]
    fn test_usd_and_usdt_are_distinct_keys() {
        let store = Arc::new(QuoteStore::new());
        let feed = feed(Arc::clone(&store));
        feed.handle_message(r#"{"type":"ticker","product_id":"BTC-USD","price":"100"}"#);
        feed.handle_message(r#"{"type":"ticker","product_id":"BTC-USDT","price":"101"}"#);
        assert_eq!(store.get(&USD).unwrap().price, 100.0);
        assert_eq!(store.get(&USDT).unwrap().price, 101.0);
    }

    #[test]
    fn test_non_ticker_and_unknown_products_skipped() {
        let store = Arc::new(QuoteStore::new());
        let feed = feed(Arc::clone(&store));
        feed.handle_message(r#"{"type":"subscriptions","channels":[]}"#);
        feed.handle_message(r#"{"type":"heartbeat","product_id":"BTC-USD"}"#);
        feed.handle_message(r#"{"type":"ticker","product_id":"ETH-USD","price":"3000"}"#);
        assert!(store.is_empty());
    }

    #[test]
    fn test_ticker_without_any_price_dropped() {
        let store = Arc::new(QuoteStore::new());
        let feed = feed(Arc::clone(&store));
        feed.handle_message(r#"{"type":"ticker","product_id":"BTC-USD"}"#);
        feed.handle_message(r#"{"type":"ticker","product_id":"BTC-USD","price":"-1"}"#);
        assert!(store.is_empty());
        assert_eq!(
            feed.metrics
                .messages_dropped
                .with_label_values(&["coinbase", "decode"])
                .get(),
            1
        );
    }

    #[test]
    fn test_mid_price_rules() {
        assert_eq!(mid_price(Some("10"), Some("20")), Some(15.0));
        assert_eq!(mid_price(Some("10"), None), None);
        assert_eq!(mid_price(Some("0"), Some("20")), None);
        assert_eq!(mid_price(Some("x"), Some("20")), None);
    }
}
