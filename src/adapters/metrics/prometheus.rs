//! Prometheus Metrics Registry - Feed Observability
//!
//! Counters and gauges for every feed: quotes written, messages
//! dropped by reason, reconnects and connection state, plus oracle
//! request latency. Exposed on `/metrics` by the health server when
//! metrics are enabled; always collected otherwise.

use prometheus::{
    Encoder, GaugeVec, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

use crate::domain::quote::{Asset, Source};

/// Centralized Prometheus metrics for the price terminal.
///
/// All metrics follow the naming convention `price_terminal_*` and
/// carry a `source` label.
pub struct FeedMetrics {
    /// Prometheus registry.
    registry: Registry,
    /// Quotes accepted by the store.
    pub quotes_written: IntCounterVec,
    /// Messages or oracle reads discarded, by reason.
    pub messages_dropped: IntCounterVec,
    /// Sessions restarted by the supervisor.
    pub reconnects: IntCounterVec,
    /// Feed connection status (1 = connected, 0 = disconnected).
    pub feed_connected: GaugeVec,
    /// Oracle `eth_call` latency in seconds.
    pub oracle_latency: HistogramVec,
}

impl FeedMetrics {
    /// Create and register all Prometheus metrics.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let quotes_written = IntCounterVec::new(
            Opts::new(
                "price_terminal_quotes_written_total",
                "Quotes written to the store",
            ),
            &["source"],
        )?;

        let messages_dropped = IntCounterVec::new(
            Opts::new(
                "price_terminal_messages_dropped_total",
                "Feed messages discarded without a store write",
            ),
            &["source", "reason"],
        )?;

        let reconnects = IntCounterVec::new(
            Opts::new(
                "price_terminal_feed_reconnects_total",
                "Feed sessions restarted after a failure",
            ),
            &["source"],
        )?;

        let feed_connected = GaugeVec::new(
            Opts::new(
                "price_terminal_feed_connected",
                "Feed connection status (1=connected, 0=disconnected)",
            ),
            &["source"],
        )?;

        let oracle_latency = HistogramVec::new(
            HistogramOpts::new(
                "price_terminal_oracle_latency_seconds",
                "Latency of oracle eth_call requests",
            )
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
            &["asset"],
        )?;

        registry.register(Box::new(quotes_written.clone()))?;
        registry.register(Box::new(messages_dropped.clone()))?;
        registry.register(Box::new(reconnects.clone()))?;
        registry.register(Box::new(feed_connected.clone()))?;
        registry.register(Box::new(oracle_latency.clone()))?;

        Ok(Self {
            registry,
            quotes_written,
            messages_dropped,
            reconnects,
            feed_connected,
            oracle_latency,
        })
    }

    pub fn quote_written(&self, source: Source) {
        self.quotes_written.with_label_values(&[source.label()]).inc();
    }

    pub fn message_dropped(&self, source: Source, reason: &str) {
        self.messages_dropped
            .with_label_values(&[source.label(), reason])
            .inc();
    }

    pub fn reconnected(&self, source: Source) {
        self.reconnects.with_label_values(&[source.label()]).inc();
    }

    pub fn set_connected(&self, source: Source, connected: bool) {
        self.feed_connected
            .with_label_values(&[source.label()])
            .set(if connected { 1.0 } else { 0.0 });
    }

    pub fn observe_oracle_latency(&self, asset: Asset, seconds: f64) {
        let asset = asset.to_string();
        self.oracle_latency
            .with_label_values(&[asset.as_str()])
            .observe(seconds);
    }

    /// Render all metrics in the Prometheus text exposition format.
    pub fn encode(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_are_labelled_by_source() {
        let metrics = FeedMetrics::new().unwrap();
        metrics.quote_written(Source::Binance);
        metrics.quote_written(Source::Binance);
        metrics.message_dropped(Source::Coinbase, "decode");
        metrics.set_connected(Source::Chainlink, true);

        assert_eq!(
            metrics.quotes_written.with_label_values(&["binance"]).get(),
            2
        );
        assert_eq!(
            metrics
                .messages_dropped
                .with_label_values(&["coinbase", "decode"])
                .get(),
            1
        );

        let text = metrics.encode().unwrap();
        assert!(text.contains("price_terminal_quotes_written_total"));
        assert!(text.contains("price_terminal_feed_connected{source=\"chainlink\"} 1"));
    }
}
