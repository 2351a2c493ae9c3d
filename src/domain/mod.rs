//! Domain Layer - Core types and math for the launch sniper
//!
//! Pure types and logic with no I/O. Everything that touches the network
//! goes through the ports layer.
//!
//! - `launch`: canonical launch event and venue constants
//! - `curve`: constant-product sizing and slippage bounds
//! - `filter`: admission band and single-shot latch
//! - `position`: open holdings and closed-trade history records
//! - `position_manager`: bounded registry and acquisition gate

pub mod launch;
pub mod curve;
pub mod filter;
pub mod position;
pub mod position_manager;

pub use launch::{now_ms, LaunchEvent, LAMPORTS_PER_SOL, TOKEN_DECIMALS, TOTAL_SUPPLY_TOKENS, VIRTUAL_SOL_RESERVE};
pub use curve::{BuyQuote, CurveError};
pub use filter::{AdmissionBand, AdmissionFilter, AdmissionMode};
pub use position::{HistoryRecord, Position, PositionStatus};
pub use position_manager::{AcquisitionGuard, PositionManager, PositionManagerError};
