//! Typed pipeline events
//!
//! Every producer/consumer relationship in the pipeline goes through
//! [`BotEvent`]. Producers hold a cloneable [`EventBus`]; the orchestrator
//! owns the single receiver.

use std::fmt;

use tokio::sync::mpsc;

use crate::domain::{HistoryRecord, LaunchEvent, Position};

use super::trade_feed::TradeUpdate;

/// Why the monitor released a position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    TakeProfit,
    StopLoss,
    /// Held past the time-to-live
    MaxHold,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ExitReason::TakeProfit => "take profit",
            ExitReason::StopLoss => "stop loss",
            ExitReason::MaxHold => "max hold",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone)]
pub enum BotEvent {
    /// Decoded from either feed
    LaunchDetected(LaunchEvent),
    /// Passed admission
    LaunchApproved(LaunchEvent),
    PositionOpened(Position),
    TradeUpdate(TradeUpdate),
    PositionExit {
        position: Position,
        reason: ExitReason,
    },
    PositionClosed(HistoryRecord),
    /// Every sell attempt failed; the position stays registered as stuck
    PositionAbandoned {
        position: Position,
        attempts: u32,
    },
}

impl BotEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            BotEvent::LaunchDetected(_) => "launch.detected",
            BotEvent::LaunchApproved(_) => "launch.approved",
            BotEvent::PositionOpened(_) => "position.opened",
            BotEvent::TradeUpdate(_) => "trade.update",
            BotEvent::PositionExit { .. } => "position.exit",
            BotEvent::PositionClosed(_) => "position.closed",
            BotEvent::PositionAbandoned { .. } => "position.abandoned",
        }
    }
}

/// Sending half of the pipeline channel
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: mpsc::UnboundedSender<BotEvent>,
}

impl EventBus {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<BotEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Returns false once the receiver is gone
    pub fn emit(&self, event: BotEvent) -> bool {
        let kind = event.kind();
        match self.tx.send(event) {
            Ok(()) => true,
            Err(_) => {
                tracing::debug!("Dropped {} event: pipeline stopped", kind);
                false
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
