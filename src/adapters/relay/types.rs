//! Relay Wire Types
//!
//! Request bodies for each provider plus the shared JSON-RPC envelope.

use serde::{Deserialize, Serialize};

/// Options object sent alongside a base64 transaction
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_preflight: Option<bool>,
    pub encoding: String,
}

impl SendOptions {
    pub fn base64() -> Self {
        Self {
            skip_preflight: None,
            encoding: "base64".to_string(),
        }
    }

    pub fn skip_preflight(mut self) -> Self {
        self.skip_preflight = Some(true);
        self
    }
}

/// `sendTransaction` JSON-RPC request
#[derive(Debug, Clone, Serialize)]
pub struct SendTransactionRequest {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    pub params: (String, SendOptions),
}

impl SendTransactionRequest {
    pub fn new(transaction: String, options: SendOptions) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: 1,
            method: "sendTransaction".to_string(),
            params: (transaction, options),
        }
    }
}

/// JSON-RPC response wrapper
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse<T> {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    pub result: Option<T>,
    pub error: Option<JsonRpcError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    pub data: Option<serde_json::Value>,
}

/// BlockRazor `sendTransaction` body
#[derive(Debug, Clone, Serialize)]
pub struct BlockRazorRequest {
    pub transaction: String,
    pub mode: String,
}

impl BlockRazorRequest {
    pub fn fast(transaction: String) -> Self {
        Self {
            transaction,
            mode: "fast".to_string(),
        }
    }
}

/// Axiom batched send body
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AxiomBatchRequest {
    pub mev_protection: bool,
    pub enhanced_mev_protection: bool,
    pub wallets: Vec<AxiomWallet>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AxiomWallet {
    pub transactions: Vec<AxiomTransaction>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AxiomTransaction {
    #[serde(rename = "base64Tx")]
    pub base64_tx: String,
    pub provider: String,
}

impl AxiomBatchRequest {
    /// One transaction routed through Axiom's ZeroSlot provider
    pub fn single(transaction: String) -> Self {
        Self {
            mev_protection: false,
            enhanced_mev_protection: false,
            wallets: vec![AxiomWallet {
                transactions: vec![AxiomTransaction {
                    base64_tx: transaction,
                    provider: "0xslot".to_string(),
                }],
            }],
        }
    }
}
