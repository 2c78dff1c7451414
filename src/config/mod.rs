//! Configuration Module - TOML-based Terminal Configuration
//!
//! Loads and validates configuration from `config.toml`. Every
//! section is optional; missing keys fall back to the defaults below,
//! which match the public endpoints the terminal was built against.
//! Feed URLs, oracle addresses, delays and aggregation thresholds all
//! live here rather than inline in the adapters.

pub mod loader;

use std::time::Duration;

use alloy::primitives::{address, Address};
use serde::Deserialize;

use crate::domain::aggregate::{
  FreshnessThresholds, DEFAULT_GRAND_QUORUM, DEFAULT_LIVE_AGE, DEFAULT_MULTI_SOURCE_MIN,
  DEFAULT_STALE_AGE,
};
use crate::domain::quote::Asset;

/// Top-level terminal configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
  /// Display and logging settings.
  #[serde(default)]
  pub terminal: TerminalConfig,
  /// Binance trade stream.
  #[serde(default)]
  pub binance: BinanceConfig,
  /// Coinbase ticker channel.
  #[serde(default)]
  pub coinbase: CoinbaseConfig,
  /// Chainlink oracle poller.
  #[serde(default)]
  pub chainlink: ChainlinkConfig,
  /// Cross-source statistics.
  #[serde(default)]
  pub aggregation: AggregationConfig,
  /// Prometheus metrics and health probes.
  #[serde(default)]
  pub metrics: MetricsConfig,
}

/// Terminal display configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TerminalConfig {
  /// Title shown in the header.
  #[serde(default = "default_title")]
  pub title: String,
  /// Log level (trace, debug, info, warn, error). `RUST_LOG` overrides it.
  #[serde(default = "default_log_level")]
  pub log_level: String,
  /// Redraw interval in milliseconds.
  #[serde(default = "default_refresh_ms")]
  pub refresh_ms: u64,
  /// Assets shown and subscribed on every feed.
  #[serde(default = "default_assets")]
  pub assets: Vec<Asset>,
}

impl TerminalConfig {
  pub fn refresh_interval(&self) -> Duration {
    Duration::from_millis(self.refresh_ms)
  }
}

impl Default for TerminalConfig {
  fn default() -> Self {
    Self {
      title: default_title(),
      log_level: default_log_level(),
      refresh_ms: default_refresh_ms(),
      assets: default_assets(),
    }
  }
}

/// Binance trade stream configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BinanceConfig {
  /// `/ws` base URL; stream names are appended as path segments.
  #[serde(default = "default_binance_url")]
  pub ws_url: String,
  #[serde(flatten)]
  pub timing: StreamTiming,
}

impl Default for BinanceConfig {
  fn default() -> Self {
    Self {
      ws_url: default_binance_url(),
      timing: StreamTiming::default(),
    }
  }
}

/// Coinbase ticker channel configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CoinbaseConfig {
  #[serde(default = "default_coinbase_url")]
  pub ws_url: String,
  #[serde(flatten)]
  pub timing: StreamTiming,
}

impl Default for CoinbaseConfig {
  fn default() -> Self {
    Self {
      ws_url: default_coinbase_url(),
      timing: StreamTiming::default(),
    }
  }
}

/// Connection timing shared by both streaming adapters.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamTiming {
  /// Fixed delay before reconnecting after a dropped session.
  #[serde(default = "default_reconnect_delay_ms")]
  pub reconnect_delay_ms: u64,
  /// Client ping interval in seconds.
  #[serde(default = "default_ping_interval_secs")]
  pub ping_interval_secs: u64,
  /// A session with no inbound frame for this long is dropped.
  #[serde(default = "default_idle_timeout_secs")]
  pub idle_timeout_secs: u64,
}

impl StreamTiming {
  pub fn reconnect_delay(&self) -> Duration {
    Duration::from_millis(self.reconnect_delay_ms)
  }

  pub fn ping_interval(&self) -> Duration {
    Duration::from_secs(self.ping_interval_secs)
  }

  pub fn idle_timeout(&self) -> Duration {
    Duration::from_secs(self.idle_timeout_secs)
  }
}

impl Default for StreamTiming {
  fn default() -> Self {
    Self {
      reconnect_delay_ms: default_reconnect_delay_ms(),
      ping_interval_secs: default_ping_interval_secs(),
      idle_timeout_secs: default_idle_timeout_secs(),
    }
  }
}

/// Chainlink poller configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainlinkConfig {
  /// Ethereum JSON-RPC endpoint.
  #[serde(default = "default_rpc_url")]
  pub rpc_url: String,
  /// Sleep between poll cycles in milliseconds.
  #[serde(default = "default_poll_interval_ms")]
  pub poll_interval_ms: u64,
  /// Per-request timeout in milliseconds.
  #[serde(default = "default_request_timeout_ms")]
  pub request_timeout_ms: u64,
  /// Aggregator contracts, one per asset.
  #[serde(default = "default_oracle_feeds")]
  pub feeds: Vec<OracleFeedConfig>,
}

impl ChainlinkConfig {
  pub fn poll_interval(&self) -> Duration {
    Duration::from_millis(self.poll_interval_ms)
  }

  pub fn request_timeout(&self) -> Duration {
    Duration::from_millis(self.request_timeout_ms)
  }
}

impl Default for ChainlinkConfig {
  fn default() -> Self {
    Self {
      rpc_url: default_rpc_url(),
      poll_interval_ms: default_poll_interval_ms(),
      request_timeout_ms: default_request_timeout_ms(),
      feeds: default_oracle_feeds(),
    }
  }
}

/// A single Chainlink aggregator contract. Contract addresses are
/// always configuration, never inline in the poller.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OracleFeedConfig {
  pub asset: Asset,
  /// Aggregator proxy address (USD-denominated).
  pub address: Address,
  /// Fixed-point decimals of `answer`.
  #[serde(default = "default_oracle_decimals")]
  pub decimals: u8,
}

/// Thresholds for the cross-source statistics.
#[derive(Debug, Clone, Deserialize)]
pub struct AggregationConfig {
  /// Minimum present sources for the grand average.
  #[serde(default = "default_grand_quorum")]
  pub grand_quorum: usize,
  /// Minimum present sources for the per-asset multi-source line.
  #[serde(default = "default_multi_source_min")]
  pub multi_source_min: usize,
  /// Ages below this are shown as `<1s`.
  #[serde(default = "default_live_age_ms")]
  pub live_age_ms: u64,
  /// Ages at or above this are highlighted as stale.
  #[serde(default = "default_stale_age_secs")]
  pub stale_age_secs: u64,
}

impl AggregationConfig {
  pub fn freshness(&self) -> FreshnessThresholds {
    FreshnessThresholds {
      live: Duration::from_millis(self.live_age_ms),
      stale: Duration::from_secs(self.stale_age_secs),
    }
  }
}

impl Default for AggregationConfig {
  fn default() -> Self {
    Self {
      grand_quorum: default_grand_quorum(),
      multi_source_min: default_multi_source_min(),
      live_age_ms: default_live_age_ms(),
      stale_age_secs: default_stale_age_secs(),
    }
  }
}

/// Metrics and monitoring configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
  /// Serve `/live`, `/ready` and `/metrics`.
  #[serde(default)]
  pub enabled: bool,
  /// Metrics server bind address.
  #[serde(default = "default_metrics_addr")]
  pub bind_address: String,
}

impl Default for MetricsConfig {
  fn default() -> Self {
    Self {
      enabled: false,
      bind_address: default_metrics_addr(),
    }
  }
}

// Default value functions for serde

fn default_title() -> String {
  "PRICE TERMINAL".to_string()
}

fn default_log_level() -> String {
  "warn".to_string()
}

fn default_refresh_ms() -> u64 {
  500
}

fn default_assets() -> Vec<Asset> {
  vec![Asset::BTC]
}

fn default_binance_url() -> String {
  "wss://stream.binance.com:9443/ws".to_string()
}

fn default_coinbase_url() -> String {
  "wss://ws-feed.exchange.coinbase.com".to_string()
}

fn default_reconnect_delay_ms() -> u64 {
  3_000
}

fn default_ping_interval_secs() -> u64 {
  20
}

fn default_idle_timeout_secs() -> u64 {
  60
}

fn default_rpc_url() -> String {
  "https://eth.llamarpc.com".to_string()
}

fn default_poll_interval_ms() -> u64 {
  5_000
}

fn default_request_timeout_ms() -> u64 {
  10_000
}

fn default_oracle_decimals() -> u8 {
  8
}

fn default_oracle_feeds() -> Vec<OracleFeedConfig> {
  vec![
    OracleFeedConfig {
      asset: Asset::BTC,
      address: address!("F4030086522a5bEEa4988F8cA5B36dbC97BeE88c"),
      decimals: default_oracle_decimals(),
    },
    OracleFeedConfig {
      asset: Asset::ETH,
      address: address!("5f4eC3Df9cbd43714FE2740f5E3616155c5b8419"),
      decimals: default_oracle_decimals(),
    },
  ]
}

fn default_grand_quorum() -> usize {
  DEFAULT_GRAND_QUORUM
}

fn default_multi_source_min() -> usize {
  DEFAULT_MULTI_SOURCE_MIN
}

fn default_live_age_ms() -> u64 {
  DEFAULT_LIVE_AGE.as_millis() as u64
}

fn default_stale_age_secs() -> u64 {
  DEFAULT_STALE_AGE.as_secs()
}

fn default_metrics_addr() -> String {
  "127.0.0.1:9090".to_string()
}
