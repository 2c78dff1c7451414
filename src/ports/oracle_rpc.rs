//! Oracle RPC Port - Read-only Contract Calls
//!
//! The oracle poller only needs `eth_call` against a fixed block tag.
//! Keeping it behind a trait lets the decode path be tested without
//! a node.

use alloy::primitives::Address;
use async_trait::async_trait;

/// Read-only call transport for on-chain price oracles.
#[async_trait]
pub trait OracleRpc: Send + Sync + 'static {
  /// Execute `eth_call` against `to` with raw calldata at block `latest`.
  ///
  /// Returns the `0x`-prefixed hex result exactly as the node sent it.
  async fn eth_call(&self, to: Address, calldata: &[u8]) -> anyhow::Result<String>;

  /// Endpoint label for logging (never includes credentials).
  fn endpoint(&self) -> &str;
}
