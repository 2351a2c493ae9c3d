use async_trait::async_trait;
use solana_client::rpc_client::RpcClient;
use solana_client::rpc_config::{RpcSimulateTransactionConfig, RpcTransactionConfig};
use solana_sdk::{
    commitment_config::CommitmentConfig,
    hash::Hash,
    pubkey::Pubkey,
    signature::Signature,
    transaction::VersionedTransaction,
};
use solana_transaction_status::UiTransactionEncoding;
use spl_token::solana_program::program_pack::Pack;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

use crate::adapters::relay::{SignatureState, SignatureStatusSource};

#[derive(Debug, Error)]
pub enum SolanaClientError {
    #[error("RPC request failed: {0}")]
    RpcError(String),
    #[error("Transaction failed: {0}")]
    TransactionError(String),
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),
    #[error("Invalid account data: {0}")]
    InvalidAccountData(String),
}

/// Wrapper around Solana RPC client with async-compatible methods
#[derive(Clone)]
pub struct SolanaClient {
    client: Arc<RpcClient>,
}

impl SolanaClient {
    /// Create a new Solana RPC client
    pub fn new(rpc_url: String) -> Self {
        let client = Arc::new(RpcClient::new_with_commitment(rpc_url, CommitmentConfig::confirmed()));
        Self { client }
    }

    pub fn url(&self) -> String {
        self.client.url()
    }

    /// Run a sync RPC call on the blocking pool
    async fn blocking<T, F>(&self, call: F) -> Result<T, SolanaClientError>
    where
        F: FnOnce(&RpcClient) -> Result<T, SolanaClientError> + Send + 'static,
        T: Send + 'static,
    {
        let client = Arc::clone(&self.client);
        tokio::task::spawn_blocking(move || call(&client))
            .await
            .map_err(|e| SolanaClientError::RpcError(format!("Task join error: {}", e)))?
    }

    /// Get SOL balance for a public key
    pub async fn get_balance(&self, pubkey: &Pubkey) -> Result<u64, SolanaClientError> {
        let pubkey = *pubkey;
        self.blocking(move |client| {
            client
                .get_balance(&pubkey)
                .map_err(|e| SolanaClientError::RpcError(e.to_string()))
        })
        .await
    }

    /// Raw amount held by an SPL token account, `None` if the account is gone
    pub async fn token_account_amount(
        &self,
        token_account: &Pubkey,
    ) -> Result<Option<u64>, SolanaClientError> {
        let token_account = *token_account;
        self.blocking(move |client| {
            let account = client
                .get_account_with_commitment(&token_account, CommitmentConfig::confirmed())
                .map_err(|e| SolanaClientError::RpcError(e.to_string()))?
                .value;

            let Some(account) = account else {
                return Ok(None);
            };
            let state = spl_token::state::Account::unpack(&account.data)
                .map_err(|e| SolanaClientError::InvalidAccountData(e.to_string()))?;
            Ok(Some(state.amount))
        })
        .await
    }

    /// Get recent blockhash (needed for transaction building)
    pub async fn get_latest_blockhash(&self) -> Result<Hash, SolanaClientError> {
        self.blocking(|client| {
            client
                .get_latest_blockhash()
                .map_err(|e| SolanaClientError::RpcError(e.to_string()))
        })
        .await
    }

    /// Broadcast without preflight
    pub async fn send_versioned(
        &self,
        transaction: &VersionedTransaction,
    ) -> Result<String, SolanaClientError> {
        let tx = transaction.clone();
        self.blocking(move |client| {
            client
                .send_transaction(&tx)
                .map(|sig| sig.to_string())
                .map_err(|e| SolanaClientError::TransactionError(e.to_string()))
        })
        .await
    }

    /// Simulate against the latest bank. Returns the simulation error, if any.
    pub async fn simulate_versioned(
        &self,
        transaction: &VersionedTransaction,
    ) -> Result<Option<String>, SolanaClientError> {
        let tx = transaction.clone();
        self.blocking(move |client| {
            let config = RpcSimulateTransactionConfig {
                replace_recent_blockhash: true,
                commitment: Some(CommitmentConfig::processed()),
                ..Default::default()
            };
            client
                .simulate_transaction_with_config(&tx, config)
                .map(|response| response.value.err.map(|e| e.to_string()))
                .map_err(|e| SolanaClientError::RpcError(e.to_string()))
        })
        .await
    }

    /// Lamport change of the fee payer (account 0) across a landed transaction
    pub async fn fee_payer_balance_change(
        &self,
        signature_str: &str,
    ) -> Result<Option<i64>, SolanaClientError> {
        let signature = Signature::from_str(signature_str)
            .map_err(|e| SolanaClientError::InvalidSignature(e.to_string()))?;

        self.blocking(move |client| {
            let config = RpcTransactionConfig {
                encoding: Some(UiTransactionEncoding::Base64),
                commitment: Some(CommitmentConfig::confirmed()),
                max_supported_transaction_version: Some(0),
            };
            let tx = client
                .get_transaction_with_config(&signature, config)
                .map_err(|e| SolanaClientError::RpcError(e.to_string()))?;

            Ok(tx
                .transaction
                .meta
                .and_then(|meta| fee_payer_delta(&meta.pre_balances, &meta.post_balances)))
        })
        .await
    }
}

/// Post minus pre balance of account 0, when both are present
pub fn fee_payer_delta(pre_balances: &[u64], post_balances: &[u64]) -> Option<i64> {
    let pre = *pre_balances.first()?;
    let post = *post_balances.first()?;
    Some(post as i64 - pre as i64)
}

#[async_trait]
impl SignatureStatusSource for SolanaClient {
    async fn signature_state(&self, signature: &str) -> Result<Option<SignatureState>, String> {
        let signature = Signature::from_str(signature).map_err(|e| e.to_string())?;

        self.blocking(move |client| {
            let response = client
                .get_signature_statuses_with_history(&[signature])
                .map_err(|e| SolanaClientError::RpcError(e.to_string()))?;

            Ok(response
                .value
                .into_iter()
                .next()
                .flatten()
                .map(|status| SignatureState {
                    confirmation_status: status.confirmation_status,
                    err: status.err.map(|e| e.to_string()),
                }))
        })
        .await
        .map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_client_creation() {
        let client = SolanaClient::new("https://api.devnet.solana.com".to_string());
        assert_eq!(client.url(), "https://api.devnet.solana.com");
    }

    #[tokio::test]
    async fn test_invalid_signature_rejected() {
        let client = SolanaClient::new("http://127.0.0.1:1".to_string());
        let err = client.fee_payer_balance_change("not-a-signature").await.unwrap_err();
        assert!(matches!(err, SolanaClientError::InvalidSignature(_)));

        assert!(client.signature_state("also bad").await.is_err());
    }

    #[test]
    fn test_fee_payer_delta() {
        assert_eq!(fee_payer_delta(&[1_000, 5], &[61_000, 5]), Some(60_000));
        assert_eq!(fee_payer_delta(&[10_000], &[4_000]), Some(-6_000));
        assert_eq!(fee_payer_delta(&[], &[4_000]), None);
        assert_eq!(fee_payer_delta(&[4_000], &[]), None);
    }

    #[test]
    fn test_error_display() {
        let err = SolanaClientError::RpcError("test".to_string());
        assert!(err.to_string().contains("RPC request failed"));

        let err = SolanaClientError::InvalidAccountData("short".to_string());
        assert!(err.to_string().contains("short"));
    }
}
