//! Adapters Layer - External System Implementations
//!
//! This module contains implementations of the port traits:
//! - pump_fun: venue instructions, executor, launch decoder and portal feed
//! - geyser: Yellowstone gRPC launch stream
//! - relay: low-latency submission router and confirmation polling
//! - auth: session cookies for the Axiom relay
//! - solana: RPC client, blockhash cache and wallet
//! - history: JSON closed-trade log
//! - cli: command-line interface definitions

pub mod auth;
pub mod cli;
pub mod geyser;
pub mod history;
pub mod pump_fun;
pub mod relay;
pub mod solana;

pub use cli::CliApp;
pub use geyser::GeyserListener;
pub use history::JsonHistoryLog;
pub use pump_fun::{PortalFeed, PumpFunExecutor};
pub use relay::RelayClient;
pub use solana::{BlockhashCache, SolanaClient, WalletManager};
