//! Chain Adapters - On-chain Oracle Reads
//!
//! Provides read-only access to Ethereum for:
//! - JSON-RPC `eth_call` transport over reqwest
//! - Chainlink aggregator polling and `answer` decoding

pub mod chainlink;
pub mod rpc;

pub use chainlink::ChainlinkPoller;
pub use rpc::JsonRpcClient;
