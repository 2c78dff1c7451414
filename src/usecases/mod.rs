//! Use Cases Layer - Application Logic
//!
//! Combines domain statistics into what the terminal shows. Pure
//! functions over store snapshots; timing and I/O live in adapters.
//!
//! Use cases:
//! - `DashboardView`: per-asset rows, pairwise averages and grand average

pub mod dashboard;

pub use dashboard::{AssetPanel, DashboardView, QuoteRow};
