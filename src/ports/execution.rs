use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{LaunchEvent, Position};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExecutionError {
    #[error("Failed to build transaction: {0}")]
    Build(String),
    #[error("Submission failed: {0}")]
    Submission(String),
    #[error("Transaction {signature} failed on-chain: {reason}")]
    OnChain { signature: String, reason: String },
    #[error("Transaction {signature} not confirmed within retry budget")]
    NotConfirmed { signature: String },
    #[error("Ledger query failed: {0}")]
    Ledger(String),
}

impl ExecutionError {
    /// On-chain rejection: retrying the same transaction cannot help
    pub fn is_on_chain(&self) -> bool {
        matches!(self, ExecutionError::OnChain { .. })
    }

    /// Signature of the submitted transaction, when one was sent
    pub fn signature(&self) -> Option<&str> {
        match self {
            ExecutionError::OnChain { signature, .. }
            | ExecutionError::NotConfirmed { signature } => Some(signature),
            _ => None,
        }
    }
}

/// Fixed buy sizing handed to the executor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BuyOrder {
    pub sol_amount: f64,
    pub slippage_pct: f64,
}

/// Sell sizing: share of the holding and worst-case tolerance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SellOrder {
    pub percentage: f64,
    pub slippage_pct: f64,
}

/// Confirmed sale facts
#[derive(Debug, Clone, PartialEq)]
pub struct SellFill {
    pub signature: String,
    /// Raw token amount sold
    pub sold_amount: u64,
    /// SOL received net of the account-close refund
    pub realized_sol: f64,
    pub sell_time_ms: i64,
    /// True when the sell transaction also closed the token account
    pub account_closed: bool,
}

/// Builds, signs, submits and confirms venue trades
#[async_trait]
pub trait ExecutionPort: Send + Sync {
    /// Buy into a fresh launch. Returns the position only once confirmed.
    async fn buy(&self, launch: &LaunchEvent, order: BuyOrder) -> Result<Position, ExecutionError>;

    /// Sell part or all of a position and wait for confirmation
    async fn sell(&self, position: &Position, order: SellOrder) -> Result<SellFill, ExecutionError>;

    /// Burn any residual and close the wallet's token account for `mint`.
    /// `Ok(None)` when there is no account left to close.
    async fn close_token_account(&self, mint: &str) -> Result<Option<String>, ExecutionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_on_chain_is_definitive() {
        let err = ExecutionError::OnChain {
            signature: "sig".to_string(),
            reason: "custom program error: 0x1771".to_string(),
        };
        assert!(err.is_on_chain());
        assert_eq!(err.signature(), Some("sig"));
        assert!(err.to_string().contains("0x1771"));
    }

    #[test]
    fn test_not_confirmed_carries_signature() {
        let err = ExecutionError::NotConfirmed {
            signature: "sig2".to_string(),
        };
        assert!(!err.is_on_chain());
        assert_eq!(err.signature(), Some("sig2"));
        assert_eq!(ExecutionError::Submission("x".into()).signature(), None);
    }
}
