//! Submission Router
//!
//! Sends signed transactions through a low-latency relay (BlockRazor,
//! ZeroSlot, Axiom, Jito) or straight to RPC, and polls for confirmation.

mod client;
mod config;
mod confirm;
mod error;
mod types;

pub use client::RelayClient;
pub use config::{endpoints, fee_accounts, RelayConfig, SendMode};
pub use confirm::{
    await_confirmation, ConfirmationLevel, ConfirmationPolicy, SignatureState,
    SignatureStatusSource,
};
pub use error::RelayError;
pub use types::{AxiomBatchRequest, BlockRazorRequest, SendOptions, SendTransactionRequest};
