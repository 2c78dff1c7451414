//! Market Data Feed Adapters - Real-time Price Streaming
//!
//! Provides price feeds from:
//! - Binance: trade ticks over WebSocket (USDT pairs)
//! - Coinbase: ticker mid-prices over WebSocket (USD and USDT pairs)
//! - Task Supervisor: runs each feed with fixed-delay restarts
//!
//! The Chainlink poller lives under `adapters::chain` but is supervised
//! the same way.

pub mod binance;
pub mod coinbase;
pub mod error;
mod session;
pub mod task_supervisor;

pub use binance::BinanceFeed;
pub use coinbase::CoinbaseFeed;
pub use error::FeedError;
pub use task_supervisor::{FeedHealth, FeedSupervisor, RestartPolicy};
