//! Metrics and Monitoring Adapters
//!
//! Prometheus counters for every feed plus an optional axum server
//! with /live, /ready and /metrics. Collection is always on; serving
//! is controlled by `[metrics] enabled`.

pub mod health;
pub mod prometheus;

pub use health::{HealthServer, HealthState};
pub use prometheus::FeedMetrics;
