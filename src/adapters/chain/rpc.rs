//! Ethereum JSON-RPC Client - Read-only `eth_call` over HTTP
//!
//! Wraps reqwest with a per-request timeout. Implements the
//! `OracleRpc` port. No retries here: the poller retries on its next
//! cycle, which keeps one slow node from stretching a cycle.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use alloy::primitives::{hex, Address};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::adapters::feeds::error::FeedError;
use crate::ports::oracle_rpc::OracleRpc;

/// JSON-RPC response envelope.
#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<String>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// HTTP JSON-RPC client for a single Ethereum node.
pub struct JsonRpcClient {
    /// Underlying HTTP client.
    http: Client,
    /// Node URL (for diagnostics, never logged with secrets).
    url: String,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    /// Create a new client with a hard per-request timeout.
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(2)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            url: url.to_string(),
            next_id: AtomicU64::new(1),
        })
    }
}

#[async_trait]
impl OracleRpc for JsonRpcClient {
    async fn eth_call(&self, to: Address, calldata: &[u8]) -> Result<String> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "eth_call",
            "params": [
                { "to": to.to_string(), "data": hex::encode_prefixed(calldata) },
                "latest",
            ],
        });

        let response = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| FeedError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Transport(format!("HTTP {status}")).into());
        }

        let envelope: RpcResponse = response
            .json()
            .await
            .map_err(|e| FeedError::Decode(format!("invalid JSON-RPC body: {e}")))?;

        debug!(id, to = %to, "eth_call completed");
        envelope_result(envelope).map_err(Into::into)
    }

    fn endpoint(&self) -> &str {
        &self.url
    }
}

fn envelope_result(envelope: RpcResponse) -> Result<String, FeedError> {
    if let Some(err) = envelope.error {
        return Err(FeedError::Rpc {
            code: err.code,
            message: err.message,
        });
    }
    envelope
        .result
        .ok_or_else(|| FeedError::Decode("JSON-RPC response without result".into()))
}
