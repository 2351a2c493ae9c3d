//! Exit Monitor
//!
//! Watches open positions on the trade feed. A position leaves the watch
//! map exactly once, on take profit, stop loss or max hold, and the exit is
//! announced on the bus for the seller.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::Position;
use crate::ports::{BotEvent, EventBus, ExitReason, TradeFeedPort, TradeUpdate};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitThresholds {
    /// Net SOL inflow that triggers a take-profit exit
    pub take_profit_sol: f64,
    /// Net SOL flow (negative) that triggers a stop-loss exit
    pub stop_loss_sol: f64,
    pub max_hold_ms: i64,
}

impl Default for ExitThresholds {
    fn default() -> Self {
        Self {
            take_profit_sol: 1.5,
            stop_loss_sol: -1.5,
            max_hold_ms: 15_000,
        }
    }
}

impl ExitThresholds {
    pub fn check_flow(&self, accumulated_sol: f64) -> Option<ExitReason> {
        if accumulated_sol >= self.take_profit_sol {
            Some(ExitReason::TakeProfit)
        } else if accumulated_sol <= self.stop_loss_sol {
            Some(ExitReason::StopLoss)
        } else {
            None
        }
    }
}

pub struct ExitMonitor {
    feed: Arc<dyn TradeFeedPort>,
    bus: EventBus,
    thresholds: ExitThresholds,
    watching: HashMap<String, Position>,
}

impl ExitMonitor {
    pub fn new(feed: Arc<dyn TradeFeedPort>, bus: EventBus, thresholds: ExitThresholds) -> Self {
        Self {
            feed,
            bus,
            thresholds,
            watching: HashMap::new(),
        }
    }

    pub fn is_watching(&self, mint: &str) -> bool {
        self.watching.contains_key(mint)
    }

    pub fn watching_count(&self) -> usize {
        self.watching.len()
    }

    pub async fn on_position_opened(&mut self, mut position: Position) {
        let mint = position.mint.clone();
        position.accumulated_sol = 0.0;
        self.watching.insert(mint.clone(), position);

        if let Err(e) = self.feed.subscribe(&mint).await {
            warn!(mint = %mint, "Trade subscription failed, max hold still applies: {}", e);
        }
        debug!(mint = %mint, "Watching position");
    }

    /// Fold a trade into its position. Returns the exit it triggered, if any.
    pub async fn on_trade(&mut self, update: &TradeUpdate) -> Option<ExitReason> {
        let position = self.watching.get_mut(&update.mint)?;
        let accumulated = position.apply_trade(update.signed_sol());
        debug!(
            mint = %update.mint,
            "Trade {:+.4} SOL, net {:.4} SOL",
            update.signed_sol(),
            accumulated
        );

        let reason = self.thresholds.check_flow(accumulated)?;
        self.exit(&update.mint, reason).await.then_some(reason)
    }

    /// Release every position held for at least the max hold
    pub async fn tick(&mut self, now_ms: i64) -> Vec<String> {
        let expired: Vec<String> = self
            .watching
            .values()
            .filter(|p| p.held_ms(now_ms) >= self.thresholds.max_hold_ms)
            .map(|p| p.mint.clone())
            .collect();

        let mut exited = Vec::with_capacity(expired.len());
        for mint in expired {
            if self.exit(&mint, ExitReason::MaxHold).await {
                exited.push(mint);
            }
        }
        exited
    }

    /// False if the mint was not being watched
    async fn exit(&mut self, mint: &str, reason: ExitReason) -> bool {
        let Some(position) = self.watching.remove(mint) else {
            return false;
        };

        if let Err(e) = self.feed.unsubscribe(mint).await {
            warn!(mint, "Trade unsubscribe failed: {}", e);
        }

        info!(
            mint,
            name = %position.name,
            "Exit on {}: net flow {:.4} SOL after {} ms",
            reason,
            position.accumulated_sol,
            position.held_ms(crate::domain::now_ms())
        );
        self.bus.emit(BotEvent::PositionExit { position, reason });
        true
    }
}
