//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Traits the core depends on. Adapters implement them, tests mock them.
//!
//! Port categories:
//! - `QuoteSink`: where feeds write normalized prices
//! - `PriceFeed`: one supervised, restartable feed session
//! - `OracleRpc`: read-only contract calls for the oracle poller

pub mod oracle_rpc;
pub mod price_feed;
pub mod quote_sink;

pub use oracle_rpc::OracleRpc;
pub use price_feed::{PriceFeed, SessionStatus};
pub use quote_sink::QuoteSink;
