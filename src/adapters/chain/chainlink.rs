//! Chainlink Oracle Poller - Periodic `latestRoundData()` Reads
//!
//! Every cycle reads each configured aggregator in turn, decodes the
//! `answer` word as a signed fixed-point integer and writes positive
//! prices as `(Chainlink, asset, USD)`. One asset failing never aborts
//! the cycle; the cycle always sleeps the full interval afterwards.

use std::sync::Arc;
use std::time::{Duration, Instant};

use alloy::primitives::{hex, I256, U256};
use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use crate::adapters::feeds::error::FeedError;
use crate::adapters::metrics::FeedMetrics;
use crate::config::OracleFeedConfig;
use crate::domain::quote::{is_valid_price, QuoteCurrency, QuoteKey, Source};
use crate::ports::oracle_rpc::OracleRpc;
use crate::ports::price_feed::{PriceFeed, SessionStatus};
use crate::ports::quote_sink::QuoteSink;

/// Selector of `latestRoundData()`.
pub const LATEST_ROUND_DATA: [u8; 4] = [0xfe, 0xaf, 0x96, 0x8c];

/// `answer` is the second 32-byte word of the returned tuple
/// `(roundId, answer, startedAt, updatedAt, answeredInRound)`.
const ANSWER_WORD: std::ops::Range<usize> = 32..64;

/// Chainlink price poller over a read-only RPC transport.
pub struct ChainlinkPoller {
    rpc: Arc<dyn OracleRpc>,
    feeds: Vec<OracleFeedConfig>,
    poll_interval: Duration,
    sink: Arc<dyn QuoteSink>,
    metrics: Arc<FeedMetrics>,
}

impl ChainlinkPoller {
    pub fn new(
        rpc: Arc<dyn OracleRpc>,
        feeds: Vec<OracleFeedConfig>,
        poll_interval: Duration,
        sink: Arc<dyn QuoteSink>,
        metrics: Arc<FeedMetrics>,
    ) -> Self {
        Self {
            rpc,
            feeds,
            poll_interval,
            sink,
            metrics,
        }
    }

    /// Read every feed once, sequentially. Returns the number written.
    pub async fn poll_cycle(&self) -> usize {
        let mut written = 0;
        for feed in &self.feeds {
            let started = Instant::now();
            let result = self.read_price(feed).await;
            self.metrics
                .observe_oracle_latency(feed.asset, started.elapsed().as_secs_f64());

            match result {
                Ok(price) => {
                    let key = QuoteKey::new(Source::Chainlink, feed.asset, QuoteCurrency::USD);
                    if self.sink.record(key, price) {
                        self.metrics.quote_written(Source::Chainlink);
                        written += 1;
                    }
                }
                Err(FeedError::InvalidPrice(price)) => {
                    debug!(asset = %feed.asset, price, "Discarded non-positive oracle answer");
                    self.metrics.message_dropped(Source::Chainlink, "invalid_price");
                }
                Err(e) => {
                    warn!(asset = %feed.asset, address = %feed.address, error = %e, "Oracle read failed");
                    self.metrics.message_dropped(Source::Chainlink, e.reason());
                }
            }
        }
        written
    }

    async fn read_price(&self, feed: &OracleFeedConfig) -> Result<f64, FeedError> {
        let payload = self
            .rpc
            .eth_call(feed.address, &LATEST_ROUND_DATA)
            .await
            .map_err(|e| match e.downcast::<FeedError>() {
                Ok(feed_error) => feed_error,
                Err(other) => FeedError::Transport(format!("{other:#}")),
            })?;
        decode_answer(&payload, feed.decimals)
    }
}

#[async_trait]
impl PriceFeed for ChainlinkPoller {
    fn name(&self) -> &'static str {
        "chainlink"
    }

    fn source(&self) -> Source {
        Source::Chainlink
    }

    /// Poll forever. Per-asset errors are absorbed, so this only
    /// returns on shutdown. The poller counts as connected while its
    /// last cycle wrote at least one quote.
    #[instrument(skip(self, status, shutdown_rx), fields(endpoint = %self.rpc.endpoint()))]
    async fn run_session(
        &self,
        status: &dyn SessionStatus,
        shutdown_rx: &mut broadcast::Receiver<()>,
    ) -> anyhow::Result<()> {
        info!(
            feeds = self.feeds.len(),
            interval_ms = self.poll_interval.as_millis() as u64,
            "Chainlink poller started"
        );

        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => return Ok(()),
                written = self.poll_cycle() => status.set_connected(written > 0),
            }

            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => return Ok(()),
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }
}

/// Decode the `answer` of a `latestRoundData()` return payload.
///
/// `payload` is the `0x`-prefixed hex string from `eth_call`. The
/// answer word is read as a two's-complement `int256` and divided by
/// `10^decimals`. Zero or negative answers are `InvalidPrice`.
pub fn decode_answer(payload: &str, decimals: u8) -> Result<f64, FeedError> {
    let bytes = hex::decode(payload.trim())
        .map_err(|e| FeedError::Decode(format!("invalid hex payload: {e}")))?;
    let word = bytes.get(ANSWER_WORD).ok_or_else(|| {
        FeedError::Decode(format!("payload too short: {} bytes", bytes.len()))
    })?;

    let raw = U256::try_from_be_slice(word)
        .ok_or_else(|| FeedError::Decode("answer word does not fit 256 bits".into()))?;
    let answer = I256::from_raw(raw);

    let answer = i128::try_from(answer)
        .map_err(|_| FeedError::Decode(format!("answer {answer} out of range")))?;
    let price = answer as f64 / 10f64.powi(i32::from(decimals));

    if is_valid_price(price) {
        Ok(price)
    } else {
        Err(FeedError::InvalidPrice(price))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Five ABI words with `answer` in the second slot.
    fn payload(answer: I256) -> String {
        let round = U256::from(110_680_464_442_257_320_000u128);
        let words = [
            round,
            answer.into_raw(),
            U256::from(1_700_000_000u64),
            U256::from(1_700_000_000u64),
            round,
        ];
        let mut bytes = Vec::with_capacity(160);
        for w in words {
            bytes.extend_from_slice(&w.to_be_bytes::<32>());
        }
        hex::encode_prefixed(bytes)
    }

    #[test]
    fn test_decodes_positive_answer() {
        let p = payload(I256::try_from(6_500_000_000_000i64).unwrap());
        assert_eq!(p.len(), 2 + 320);
        let price = decode_answer(&p, 8).unwrap();
        assert!((price - 65_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_answer_is_hex_chars_66_to_130() {
        let p = payload(I256::try_from(6_500_000_000_000i64).unwrap());
        let answer_hex = &p[66..130];
        assert_eq!(
            i128::from_str_radix(answer_hex, 16).unwrap(),
            6_500_000_000_000
        );
    }

    #[test]
    fn test_negative_answer_is_invalid() {
        let p = payload(I256::try_from(-6_500_000_000_000i64).unwrap());
        assert!(matches!(
            decode_answer(&p, 8),
            Err(FeedError::InvalidPrice(v)) if v < 0.0
        ));
        assert!(matches!(
            decode_answer(&payload(I256::ZERO), 8),
            Err(FeedError::InvalidPrice(_))
        ));
    }

    #[test]
    fn test_malformed_payloads() {
        assert!(matches!(decode_answer("0xzz", 8), Err(FeedError::Decode(_))));
        assert!(matches!(decode_answer("0x", 8), Err(FeedError::Decode(_))));
        let short = hex::encode_prefixed([0u8; 40]);
        assert!(matches!(decode_answer(&short, 8), Err(FeedError::Decode(_))));
    }

    #[test]
    fn test_decimals_scale() {
        let p = payload(I256::try_from(3_000_000_000_000_000_000i64).unwrap());
        assert_eq!(decode_answer(&p, 18).unwrap(), 3.0);
    }
}
