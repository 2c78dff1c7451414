//! Dashboard View - Renderer-facing Snapshot Contract
//!
//! Turns one `QuoteSnapshot` into everything the terminal prints:
//! a row per tracked key and, per asset, the two pairwise averages,
//! the multi-source average and the quorum-gated grand average.
//! Building a view never fails; missing data shows up as `None`,
//! `Aggregate::Waiting` or `Freshness::Waiting`.

use chrono::{DateTime, Local};

use crate::config::AppConfig;
use crate::domain::aggregate::{
  classify_age, grand_average, multi_source_stats, pair_stats, Aggregate, Freshness, GrandAverage,
};
use crate::domain::quote::{Asset, QuoteCurrency, QuoteKey, Source};
use crate::domain::store::QuoteSnapshot;

/// One line of the source table.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteRow {
  pub key: QuoteKey,
  /// Latest price, `None` until the first write.
  pub price: Option<f64>,
  pub freshness: Freshness,
}

/// Everything shown for one asset.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetPanel {
  pub asset: Asset,
  pub rows: Vec<QuoteRow>,
  /// Coinbase USD against Chainlink USD.
  pub usd_pair: Aggregate,
  /// Binance USDT against Coinbase USDT.
  pub usdt_pair: Aggregate,
  /// Mean and max-min range over every present source.
  pub multi_source: Aggregate,
  /// Omitted below quorum.
  pub grand: Option<GrandAverage>,
}

/// Complete frame handed to the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
  pub title: String,
  pub panels: Vec<AssetPanel>,
  pub updated_at: DateTime<Local>,
}

/// Keys compared by the USD average line.
pub const fn usd_pair(asset: Asset) -> (QuoteKey, QuoteKey) {
  (
    QuoteKey::new(Source::Coinbase, asset, QuoteCurrency::USD),
    QuoteKey::new(Source::Chainlink, asset, QuoteCurrency::USD),
  )
}

/// Keys compared by the USDT average line.
pub const fn usdt_pair(asset: Asset) -> (QuoteKey, QuoteKey) {
  (
    QuoteKey::new(Source::Binance, asset, QuoteCurrency::USDT),
    QuoteKey::new(Source::Coinbase, asset, QuoteCurrency::USDT),
  )
}

impl DashboardView {
  /// Build a frame from `snapshot` using the configured assets and thresholds.
  pub fn build(snapshot: &QuoteSnapshot, config: &AppConfig, updated_at: DateTime<Local>) -> Self {
    let thresholds = config.aggregation.freshness();

    let panels = config
      .terminal
      .assets
      .iter()
      .map(|&asset| {
        let candidates = QuoteKey::tracked(asset);

        let rows = candidates
          .iter()
          .map(|key| QuoteRow {
            key: *key,
            price: snapshot.price(key),
            freshness: classify_age(snapshot.age(key), &thresholds),
          })
          .collect();

        let (usd_a, usd_b) = usd_pair(asset);
        let (usdt_a, usdt_b) = usdt_pair(asset);

        AssetPanel {
          asset,
          rows,
          usd_pair: pair_stats(snapshot, &usd_a, &usd_b),
          usdt_pair: pair_stats(snapshot, &usdt_a, &usdt_b),
          multi_source: multi_source_stats(
            snapshot,
            &candidates,
            config.aggregation.multi_source_min,
          ),
          grand: grand_average(snapshot, &candidates, config.aggregation.grand_quorum),
        }
      })
      .collect();

    Self {
      title: config.terminal.title.clone(),
      panels,
      updated_at,
    }
  }
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap;
  use std::time::{Duration, Instant};

  use super::*;
  use crate::domain::quote::Quote;
  use crate::domain::store::QuoteStore;

  #[test]
  fn test_empty_store_is_all_waiting() {
    let store = QuoteStore::new();
    let view = DashboardView::build(&store.snapshot(), &AppConfig::default(), Local::now());

    assert_eq!(view.panels.len(), 1);
    let panel = &view.panels[0];
    assert_eq!(panel.rows.len(), 4);
    assert!(panel.rows.iter().all(|r| r.price.is_none() && r.freshness == Freshness::Waiting));
    assert!(panel.usd_pair.is_waiting());
    assert!(panel.usdt_pair.is_waiting());
    assert!(panel.multi_source.is_waiting());
    assert!(panel.grand.is_none());
  }

  #[test]
  fn test_full_panel() {
    let store = QuoteStore::new();
    let [bn, cb_usd, cb_usdt, cl] = QuoteKey::tracked(Asset::BTC);
    store.record(bn, 100.0);
    store.record(cb_usd, 102.0);
    store.record(cb_usdt, 98.0);
    store.record(cl, 100.0);

    let view = DashboardView::build(&store.snapshot(), &AppConfig::default(), Local::now());
    let panel = &view.panels[0];

    let usd = panel.usd_pair.summary().unwrap();
    assert_eq!(usd.average, 101.0);
    assert_eq!(usd.spread, 2.0);

    let usdt = panel.usdt_pair.summary().unwrap();
    assert_eq!(usdt.average, 99.0);
    assert_eq!(usdt.spread, 2.0);

    let multi = panel.multi_source.summary().unwrap();
    assert_eq!(multi.average, 100.0);
    assert_eq!(multi.spread, 4.0);

    assert_eq!(panel.grand.unwrap().sources, 4);
    assert!(panel.rows.iter().all(|r| r.freshness == Freshness::Live));
  }

  #[test]
  fn test_stale_rows_are_flagged() {
    let observed_at = Instant::now();
    let [bn, ..] = QuoteKey::tracked(Asset::BTC);
    let quotes = HashMap::from([(bn, Quote { price: 1.0, observed_at })]);
    let snapshot = QuoteSnapshot::from_quotes(quotes, observed_at + Duration::from_secs(90));

    let view = DashboardView::build(&snapshot, &AppConfig::default(), Local::now());
    let row = &view.panels[0].rows[0];
    assert_eq!(row.freshness, Freshness::Stale(Duration::from_secs(90)));
    assert_eq!(row.price, Some(1.0));
  }

  #[test]
  fn test_panels_follow_configured_assets() {
    let mut config = AppConfig::default();
    config.terminal.assets = vec![Asset::ETH, Asset::BTC];
    let view = DashboardView::build(&QuoteStore::new().snapshot(), &config, Local::now());
    let assets: Vec<_> = view.panels.iter().map(|p| p.asset).collect();
    assert_eq!(assets, vec![Asset::ETH, Asset::BTC]);
  }
}
