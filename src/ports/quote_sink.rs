//! Quote Sink Port - Write Side of the Quote Store
//!
//! Feeds only ever write, so they depend on this narrow trait rather
//! than on `QuoteStore` itself.

use crate::domain::quote::QuoteKey;
use crate::domain::store::QuoteStore;

/// Destination for normalized prices.
pub trait QuoteSink: Send + Sync + 'static {
  /// Store `price` for `key`, stamped with the local receipt time.
  ///
  /// Returns false when the price was rejected (non-positive or not finite).
  fn record(&self, key: QuoteKey, price: f64) -> bool;
}

impl QuoteSink for QuoteStore {
  fn record(&self, key: QuoteKey, price: f64) -> bool {
    QuoteStore::record(self, key, price)
  }
}
