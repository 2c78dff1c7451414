//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, validating all parameters,
//! and providing clear error messages for misconfiguration.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::AppConfig;

/// Load and validate configuration from a TOML file.
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
  let path = Path::new(path);

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

  let config = parse_config(&content)
    .with_context(|| format!("Invalid config file: {}", path.display()))?;

  info!(
    assets = config.terminal.assets.len(),
    oracle_feeds = config.chainlink.feeds.len(),
    quorum = config.aggregation.grand_quorum,
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Load `path` if it exists, otherwise fall back to validated defaults.
pub fn load_or_default(path: &str) -> Result<AppConfig> {
  if Path::new(path).exists() {
    return load_config(path);
  }
  let config = AppConfig::default();
  validate_config(&config)?;
  Ok(config)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<AppConfig> {
  let config: AppConfig = toml::from_str(content).context("Failed to parse config.toml")?;
  validate_config(&config)?;
  Ok(config)
}

/// Validate all configuration parameters.
///
/// Checks for:
/// - Non-empty, duplicate-free asset list and endpoint URLs
/// - Non-zero intervals, delays and timeouts (a zero retry delay would spin)
/// - One oracle contract per asset at most
/// - Aggregation thresholds that can actually be met
fn validate_config(config: &AppConfig) -> Result<()> {
  // Terminal validation
  anyhow::ensure!(
    !config.terminal.assets.is_empty(),
    "At least one asset must be configured"
  );
  let mut assets = HashSet::new();
  for asset in &config.terminal.assets {
    anyhow::ensure!(assets.insert(*asset), "Duplicate terminal asset {asset}");
  }
  anyhow::ensure!(
    config.terminal.refresh_ms > 0,
    "refresh_ms must be positive"
  );

  // Stream validation
  for (name, url, timing) in [
    ("binance", &config.binance.ws_url, &config.binance.timing),
    ("coinbase", &config.coinbase.ws_url, &config.coinbase.timing),
  ] {
    anyhow::ensure!(
      url.starts_with("ws://") || url.starts_with("wss://"),
      "{name} ws_url must be a ws:// or wss:// URL, got {url:?}"
    );
    anyhow::ensure!(
      timing.reconnect_delay_ms > 0,
      "{name} reconnect_delay_ms must be positive"
    );
    anyhow::ensure!(
      timing.ping_interval_secs > 0,
      "{name} ping_interval_secs must be positive"
    );
    anyhow::ensure!(
      timing.idle_timeout_secs > 0,
      "{name} idle_timeout_secs must be positive"
    );
  }

  // Oracle validation
  let chainlink = &config.chainlink;
  anyhow::ensure!(
    chainlink.rpc_url.starts_with("http://") || chainlink.rpc_url.starts_with("https://"),
    "chainlink rpc_url must be an http(s) URL, got {:?}",
    chainlink.rpc_url
  );
  anyhow::ensure!(
    chainlink.poll_interval_ms > 0,
    "chainlink poll_interval_ms must be positive"
  );
  anyhow::ensure!(
    chainlink.request_timeout_ms > 0,
    "chainlink request_timeout_ms must be positive"
  );
  let mut seen = HashSet::new();
  for feed in &chainlink.feeds {
    anyhow::ensure!(
      seen.insert(feed.asset),
      "Duplicate chainlink feed for {}",
      feed.asset
    );
    anyhow::ensure!(
      feed.decimals <= 36,
      "chainlink feed {} has implausible decimals {}",
      feed.asset,
      feed.decimals
    );
  }

  // Aggregation validation
  let agg = &config.aggregation;
  anyhow::ensure!(
    agg.grand_quorum >= 1 && agg.grand_quorum <= 4,
    "grand_quorum must be in [1, 4], got {}",
    agg.grand_quorum
  );
  anyhow::ensure!(
    agg.multi_source_min >= 2 && agg.multi_source_min <= 4,
    "multi_source_min must be in [2, 4], got {}",
    agg.multi_source_min
  );
  anyhow::ensure!(
    agg.live_age_ms < agg.stale_age_secs.saturating_mul(1_000),
    "live_age_ms must be below stale_age_secs"
  );

  // Metrics validation
  if config.metrics.enabled {
    config
      .metrics
      .bind_address
      .parse::<std::net::SocketAddr>()
      .with_context(|| format!("Invalid metrics bind_address {:?}", config.metrics.bind_address))?;
  }

  Ok(())
}
