//! Buyer
//!
//! Turns approved launches into registered positions. Only one buy may be
//! in flight at a time; a launch that arrives while the gate is held or the
//! book is full is dropped, not queued.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::domain::{LaunchEvent, Position, PositionManager};
use crate::ports::{BotEvent, BuyOrder, EventBus, ExecutionPort};

pub struct Buyer {
    executor: Arc<dyn ExecutionPort>,
    positions: Arc<PositionManager>,
    bus: EventBus,
    order: BuyOrder,
}

impl Buyer {
    pub fn new(
        executor: Arc<dyn ExecutionPort>,
        positions: Arc<PositionManager>,
        bus: EventBus,
        order: BuyOrder,
    ) -> Self {
        Self {
            executor,
            positions,
            bus,
            order,
        }
    }

    /// Buy into `launch` if the gates allow it. Returns the opened position.
    pub async fn on_launch_approved(&self, launch: LaunchEvent) -> Option<Position> {
        let Some(_gate) = self.positions.try_begin_acquisition() else {
            debug!(mint = %launch.mint, "Buy already in flight, skipping launch");
            return None;
        };
        if !self.positions.can_open() {
            debug!(
                mint = %launch.mint,
                "Max positions ({}) open, skipping launch",
                self.positions.max_positions()
            );
            return None;
        }

        let position = match self.executor.buy(&launch, self.order).await {
            Ok(position) => position,
            Err(e) => {
                warn!(
                    mint = %launch.mint,
                    name = %launch.name,
                    signature = e.signature().unwrap_or("-"),
                    "Buy failed: {}",
                    e
                );
                return None;
            }
        };

        if let Err(e) = self.positions.try_add(position.clone()) {
            error!(
                mint = %position.mint,
                signature = %position.buy_signature,
                "Bought but could not register position: {}",
                e
            );
            return None;
        }

        info!(
            mint = %position.mint,
            name = %position.name,
            signature = %position.buy_signature,
            "Buy confirmed: {:.0} tokens for {} SOL ({} ms latency)",
            position.ui_amount(),
            position.buy_sol_amount,
            position.buy_latency_ms
        );
        self.bus.emit(BotEvent::PositionOpened(position.clone()));
        Some(position)
    }
}
