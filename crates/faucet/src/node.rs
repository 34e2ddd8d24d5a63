//! Remote node access
//!
//! The faucet consumes the chain node as an external capability: query the
//! account nonce, submit a signed transaction, fetch a receipt by hash. The
//! capability is a trait so the funding core can be exercised against an
//! in-process node in tests; `HttpNodeClient` is the production
//! implementation speaking Ethereum JSON-RPC over HTTP.

use async_trait::async_trait;
use obx_common::types::{Address, Hash};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Node-level failures, classified by the caller into per-phase faucet errors
#[derive(Error, Debug)]
pub enum NodeError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("node returned error: {0}")]
    Rpc(String),
}

pub type NodeResult<T> = Result<T, NodeError>;

/// Transaction receipt as reported by the node
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    /// Transaction hash
    pub transaction_hash: Hash,
    /// Block number the transaction was included in
    pub block_number: String,
    /// Gas used by the transaction
    pub gas_used: String,
    /// Execution status (1 for success, 0 for failure)
    pub status: String,
}

impl TransactionReceipt {
    pub fn is_success(&self) -> bool {
        self.status == "0x1"
    }
}

/// Chain node capability consumed by the faucet
#[async_trait]
pub trait NodeClient: Send + Sync {
    /// Number of transactions already sent from `address` (the account's
    /// current on-chain nonce).
    async fn transaction_count(&self, address: &Address) -> NodeResult<u64>;

    /// Submit a signed, RLP-encoded transaction. Returns its hash.
    async fn send_raw_transaction(&self, raw: &[u8]) -> NodeResult<Hash>;

    /// Receipt for a submitted transaction. `Ok(None)` means the receipt is
    /// not available yet, which is expected during confirmation latency and
    /// distinct from a hard error.
    async fn transaction_receipt(&self, hash: &Hash) -> NodeResult<Option<TransactionReceipt>>;

    /// The chain identifier the node is running.
    async fn chain_id(&self) -> NodeResult<u64>;
}

/// JSON-RPC client for the chain node
pub struct HttpNodeClient {
    node_url: String,
    client: reqwest::Client,
}

impl HttpNodeClient {
    pub fn new(node_url: String) -> Self {
        Self {
            node_url,
            client: reqwest::Client::new(),
        }
    }

    async fn call(&self, method: &str, params: Value) -> NodeResult<Value> {
        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        let response = self
            .client
            .post(&self.node_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NodeError::Transport(e.to_string()))?;

        let json: Value = response
            .json()
            .await
            .map_err(|e| NodeError::InvalidResponse(e.to_string()))?;

        if let Some(error) = json.get("error") {
            return Err(NodeError::Rpc(error.to_string()));
        }

        Ok(json.get("result").cloned().unwrap_or(Value::Null))
    }
}

#[async_trait]
impl NodeClient for HttpNodeClient {
    async fn transaction_count(&self, address: &Address) -> NodeResult<u64> {
        let result = self
            .call(
                "eth_getTransactionCount",
                serde_json::json!([address, "latest"]),
            )
            .await?;
        parse_quantity(&result)
    }

    async fn send_raw_transaction(&self, raw: &[u8]) -> NodeResult<Hash> {
        let result = self
            .call(
                "eth_sendRawTransaction",
                serde_json::json!([format!("0x{}", hex::encode(raw))]),
            )
            .await?;

        let text = result
            .as_str()
            .ok_or_else(|| NodeError::InvalidResponse(format!("expected hash, got {result}")))?;
        Hash::from_hex(text).map_err(|e| NodeError::InvalidResponse(e.to_string()))
    }

    async fn transaction_receipt(&self, hash: &Hash) -> NodeResult<Option<TransactionReceipt>> {
        let result = self
            .call("eth_getTransactionReceipt", serde_json::json!([hash]))
            .await?;

        // A null result is the node saying "not mined yet", not a failure.
        if result.is_null() {
            return Ok(None);
        }

        serde_json::from_value(result)
            .map(Some)
            .map_err(|e| NodeError::InvalidResponse(e.to_string()))
    }

    async fn chain_id(&self) -> NodeResult<u64> {
        let result = self.call("eth_chainId", serde_json::json!([])).await?;
        parse_quantity(&result)
    }
}

/// Decode a JSON-RPC hex quantity ("0x5" style). A malformed quantity is an
/// error, never silently zero: a fabricated nonce of 0 would wreck the
/// account's sequence.
fn parse_quantity(value: &Value) -> NodeResult<u64> {
    let text = value
        .as_str()
        .ok_or_else(|| NodeError::InvalidResponse(format!("expected hex quantity, got {value}")))?;
    u64::from_str_radix(text.trim_start_matches("0x"), 16)
        .map_err(|e| NodeError::InvalidResponse(format!("bad hex quantity {text:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity(&serde_json::json!("0x0")).unwrap(), 0);
        assert_eq!(parse_quantity(&serde_json::json!("0x2a")).unwrap(), 42);
        assert!(parse_quantity(&serde_json::json!("spam")).is_err());
        assert!(parse_quantity(&serde_json::json!(7)).is_err());
        assert!(parse_quantity(&Value::Null).is_err());
    }

    #[test]
    fn test_receipt_deserializes_from_node_json() {
        let raw = serde_json::json!({
            "transactionHash": format!("0x{}", "11".repeat(32)),
            "blockNumber": "0x1f",
            "gasUsed": "0x5208",
            "status": "0x1",
            "logsBloom": format!("0x{}", "00".repeat(256))
        });

        let receipt: TransactionReceipt = serde_json::from_value(raw).unwrap();
        assert_eq!(receipt.block_number, "0x1f");
        assert!(receipt.is_success());
    }

    #[test]
    fn test_receipt_status_other_than_one_is_failure() {
        let receipt = TransactionReceipt {
            transaction_hash: Hash::default(),
            block_number: "0x1".to_string(),
            gas_used: "0x5208".to_string(),
            status: "0x0".to_string(),
        };
        assert!(!receipt.is_success());
    }
}
