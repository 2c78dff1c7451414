//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! external dependencies (WebSockets, Ethereum JSON-RPC, stdout).
//! Each sub-module groups adapters by infrastructure concern.
//!
//! Adapter categories:
//! - `chain`: Chainlink aggregator reads over JSON-RPC
//! - `feeds`: Real-time exchange data (Binance, Coinbase WebSockets) and supervision
//! - `metrics`: Prometheus metrics export and health checks
//! - `terminal`: ANSI dashboard rendering

pub mod chain;
pub mod feeds;
pub mod metrics;
pub mod terminal;
