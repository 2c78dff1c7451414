//! Binance WebSocket Feed - Trade Tick Price Source
//!
//! Connects to Binance's raw trade streams. The subscription is
//! implied by the URL path (`/ws/btcusdt@trade/ethusdt@trade`), so no
//! frame is sent after connecting. Every trade carries one symbol and
//! its price as a decimal string.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::broadcast;
use tracing::{debug, instrument};

use super::error::{parse_price, FeedError};
use super::session::stream_text_frames;
use crate::adapters::metrics::FeedMetrics;
use crate::config::BinanceConfig;
use crate::domain::quote::{Asset, QuoteCurrency, QuoteKey, Source};
use crate::ports::price_feed::{PriceFeed, SessionStatus};
use crate::ports::quote_sink::QuoteSink;

/// Binance WebSocket trade message. Only the fields we read.
#[derive(Debug, Deserialize)]
struct TradeMsg {
    /// Symbol, e.g. `BTCUSDT`.
    #[serde(rename = "s")]
    symbol: String,
    /// Price as string.
    #[serde(rename = "p")]
    price: String,
}

/// Binance real-time price feed via WebSocket.
///
/// Writes one `(Binance, asset, USDT)` quote per trade.
pub struct BinanceFeed {
    config: BinanceConfig,
    /// Full stream URL including the per-symbol path segments.
    stream_url: String,
    /// Upper-case symbol to store key.
    symbols: HashMap<String, QuoteKey>,
    sink: Arc<dyn QuoteSink>,
    metrics: Arc<FeedMetrics>,
}

impl BinanceFeed {
    pub fn new(
        config: BinanceConfig,
        assets: &[Asset],
        sink: Arc<dyn QuoteSink>,
        metrics: Arc<FeedMetrics>,
    ) -> Self {
        let symbols: HashMap<String, QuoteKey> = assets
            .iter()
            .map(|&asset| {
                (
                    format!("{asset}{}", QuoteCurrency::USDT),
                    QuoteKey::new(Source::Binance, asset, QuoteCurrency::USDT),
                )
            })
            .collect();
        let stream_url = stream_url(&config.ws_url, assets);

        Self {
            config,
            stream_url,
            symbols,
            sink,
            metrics,
        }
    }

    pub fn stream_url(&self) -> &str {
        &self.stream_url
    }

    /// Parse one trade frame and write it to the sink.
    fn handle_message(&self, text: &str) {
        match parse_trade(text, &self.symbols) {
            Ok(Some((key, price))) => {
                if self.sink.record(key, price) {
                    self.metrics.quote_written(Source::Binance);
                }
            }
            Ok(None) => {}
            Err(e) => {
                debug!(error = %e, "Dropped Binance message");
                self.metrics.message_dropped(Source::Binance, e.reason());
            }
        }
    }
}

#[async_trait]
impl PriceFeed for BinanceFeed {
    fn name(&self) -> &'static str {
        "binance"
    }

    fn source(&self) -> Source {
        Source::Binance
    }

    #[instrument(skip(self, status, shutdown_rx), fields(url = %self.stream_url))]
    async fn run_session(
        &self,
        status: &dyn SessionStatus,
        shutdown_rx: &mut broadcast::Receiver<()>,
    ) -> anyhow::Result<()> {
        stream_text_frames(
            self.name(),
            &self.stream_url,
            None,
            &self.config.timing,
            status,
            shutdown_rx,
            |text| self.handle_message(text),
        )
        .await
    }
}

/// Build `<base>/<sym>@trade/<sym>@trade` for the configured assets.
pub fn stream_url(base: &str, assets: &[Asset]) -> String {
    let streams: Vec<String> = assets
        .iter()
        .map(|asset| format!("{asset}{}@trade", QuoteCurrency::USDT).to_lowercase())
        .collect();
    format!("{}/{}", base.trim_end_matches('/'), streams.join("/"))
}

/// Decode a trade frame into a store write.
///
/// `Ok(None)` means the symbol is not tracked and the frame is
/// dropped silently.
fn parse_trade(
    text: &str,
    symbols: &HashMap<String, QuoteKey>,
) -> Result<Option<(QuoteKey, f64)>, FeedError> {
    let msg: TradeMsg = serde_json::from_str(text)?;
    let Some(&key) = symbols.get(&msg.symbol) else {
        return Ok(None);
    };
    let price = parse_price(&msg.price)?;
    Ok(Some((key, price)))
}
