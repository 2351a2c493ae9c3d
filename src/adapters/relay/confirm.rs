//! Signature confirmation polling

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use solana_transaction_status::TransactionConfirmationStatus;

use crate::ports::ExecutionError;

/// Commitment a caller waits for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfirmationLevel {
    /// Confirmed or finalized
    #[default]
    Confirmed,
    Finalized,
}

impl ConfirmationLevel {
    pub fn accepts(&self, seen: &TransactionConfirmationStatus) -> bool {
        match self {
            ConfirmationLevel::Confirmed => matches!(
                seen,
                TransactionConfirmationStatus::Confirmed | TransactionConfirmationStatus::Finalized
            ),
            ConfirmationLevel::Finalized => {
                matches!(seen, TransactionConfirmationStatus::Finalized)
            }
        }
    }
}

/// What the cluster reports for one signature
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureState {
    pub confirmation_status: Option<TransactionConfirmationStatus>,
    pub err: Option<String>,
}

/// Anything able to look up a signature status
#[async_trait]
pub trait SignatureStatusSource: Send + Sync {
    /// `Ok(None)` while the signature is unknown to the cluster
    async fn signature_state(&self, signature: &str) -> Result<Option<SignatureState>, String>;
}

#[derive(Debug, Clone, Copy)]
pub struct ConfirmationPolicy {
    pub retries: u32,
    pub delay: Duration,
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self {
            retries: 20,
            delay: Duration::from_millis(1000),
        }
    }
}

/// Poll until `signature` reaches `level`.
///
/// An on-chain error ends polling at once. Lookup failures count as a
/// spent attempt.
pub async fn await_confirmation<S>(
    source: &S,
    signature: &str,
    level: ConfirmationLevel,
    policy: ConfirmationPolicy,
) -> Result<(), ExecutionError>
where
    S: SignatureStatusSource + ?Sized,
{
    for attempt in 0..policy.retries {
        match source.signature_state(signature).await {
            Ok(Some(state)) => {
                if let Some(reason) = state.err {
                    return Err(ExecutionError::OnChain {
                        signature: signature.to_string(),
                        reason,
                    });
                }
                if state
                    .confirmation_status
                    .as_ref()
                    .is_some_and(|seen| level.accepts(seen))
                {
                    return Ok(());
                }
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Status lookup for {} failed: {}", signature, e),
        }

        if attempt + 1 < policy.retries {
            tokio::time::sleep(policy.delay).await;
        }
    }

    Err(ExecutionError::NotConfirmed {
        signature: signature.to_string(),
    })
}
