//! Domain layer - quotes, the shared store and aggregation rules.
//!
//! Pure logic with no network or runtime dependencies. Adapters write
//! into `QuoteStore`; the dashboard reads `QuoteSnapshot`s and runs
//! the aggregate functions over them.

pub mod aggregate;
pub mod quote;
pub mod store;

pub use aggregate::{Aggregate, Freshness, FreshnessThresholds, GrandAverage, Summary};
pub use quote::{Asset, Quote, QuoteCurrency, QuoteKey, Source};
pub use store::{Age, QuoteSnapshot, QuoteStore};
