//! Ports Layer - Trait definitions for external dependencies
//!
//! This module defines the interfaces (ports) that adapters must implement.
//! Following hexagonal architecture, these traits abstract:
//! - Trade execution (venue buys, sells, account close-out)
//! - The per-mint trade feed the monitor listens on
//! - The closed-trade history sink
//!
//! It also owns the typed event channel that connects the pipeline stages.

pub mod events;
pub mod execution;
pub mod trade_feed;
pub mod history;
#[cfg(any(test, feature = "test-util"))]
pub mod mocks;

pub use events::{BotEvent, EventBus, ExitReason};
pub use execution::{BuyOrder, ExecutionError, ExecutionPort, SellFill, SellOrder};
pub use trade_feed::{FeedError, TradeFeedPort, TradeSide, TradeUpdate};
pub use history::{HistoryError, HistoryPort};
