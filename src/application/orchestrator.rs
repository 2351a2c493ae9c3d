//! Sniper Orchestrator
//!
//! Owns the event receiver and routes each `BotEvent` to its handler:
//!
//! - `LaunchDetected` -> admission filter -> `LaunchApproved`
//! - `LaunchApproved` -> Buyer (spawned)
//! - `PositionOpened` / `TradeUpdate` -> Monitor
//! - `PositionExit` -> Seller (spawned)
//! - `PositionClosed` / `PositionAbandoned` -> log only
//!
//! The monitor's max-hold tick runs on its own interval inside the same loop.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, Notify};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info};

use crate::domain::{now_ms, AdmissionFilter, PositionManager};
use crate::ports::{
    BotEvent, BuyOrder, EventBus, ExecutionPort, HistoryPort, TradeFeedPort,
};

use super::buyer::Buyer;
use super::monitor::{ExitMonitor, ExitThresholds};
use super::seller::{Seller, SellerConfig};

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Event channel closed")]
    ChannelClosed,
}

#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    pub buy: BuyOrder,
    pub seller: SellerConfig,
    pub exit: ExitThresholds,
    pub poll_interval: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            buy: BuyOrder {
                sol_amount: 0.1,
                slippage_pct: 5.0,
            },
            seller: SellerConfig::default(),
            exit: ExitThresholds::default(),
            poll_interval: Duration::from_millis(1000),
        }
    }
}

/// Status snapshot of the pipeline
#[derive(Debug, Clone)]
pub struct OrchestratorStatus {
    pub open_positions: usize,
    pub stuck_positions: usize,
    pub watching: usize,
    pub in_flight_tasks: usize,
    pub buy_in_flight: bool,
}

/// Stops a running orchestrator from another task
#[derive(Debug, Clone)]
pub struct StopHandle(Arc<Notify>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.notify_one();
    }
}

pub struct SniperOrchestrator {
    filter: AdmissionFilter,
    positions: Arc<PositionManager>,
    buyer: Arc<Buyer>,
    seller: Arc<Seller>,
    monitor: ExitMonitor,
    bus: EventBus,
    events: mpsc::UnboundedReceiver<BotEvent>,
    tasks: JoinSet<()>,
    poll_interval: Duration,
    stop: Arc<Notify>,
}

impl SniperOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: PipelineConfig,
        filter: AdmissionFilter,
        positions: Arc<PositionManager>,
        executor: Arc<dyn ExecutionPort>,
        feed: Arc<dyn TradeFeedPort>,
        history: Arc<dyn HistoryPort>,
        bus: EventBus,
        events: mpsc::UnboundedReceiver<BotEvent>,
    ) -> Self {
        let buyer = Buyer::new(executor.clone(), positions.clone(), bus.clone(), config.buy);
        let seller = Seller::new(executor, positions.clone(), history, bus.clone(), config.seller);
        let monitor = ExitMonitor::new(feed, bus.clone(), config.exit);

        Self {
            filter,
            positions,
            buyer: Arc::new(buyer),
            seller: Arc::new(seller),
            monitor,
            bus,
            events,
            tasks: JoinSet::new(),
            poll_interval: config.poll_interval,
            stop: Arc::new(Notify::new()),
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(Arc::clone(&self.stop))
    }

    pub fn status(&self) -> OrchestratorStatus {
        OrchestratorStatus {
            open_positions: self.positions.count(),
            stuck_positions: self.positions.stuck_count(),
            watching: self.monitor.watching_count(),
            in_flight_tasks: self.tasks.len(),
            buy_in_flight: self.positions.is_processing(),
        }
    }

    /// Dispatch events until stopped
    pub async fn run(&mut self) -> Result<(), OrchestratorError> {
        info!(
            "Pipeline running: filter {:?} {:?}, max {} positions, exit tick {:?}",
            self.filter.mode(),
            self.filter.band(),
            self.positions.max_positions(),
            self.poll_interval
        );

        let mut tick = tokio::time::interval(self.poll_interval);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let stop = Arc::clone(&self.stop);

        let result = loop {
            tokio::select! {
                _ = stop.notified() => break Ok(()),
                event = self.events.recv() => match event {
                    Some(event) => self.dispatch(event).await,
                    None => break Err(OrchestratorError::ChannelClosed),
                },
                _ = tick.tick() => self.tick().await,
                Some(joined) = self.tasks.join_next(), if !self.tasks.is_empty() => reap(joined),
            }
        };

        info!("Pipeline stopped with {} open positions", self.positions.count());
        result
    }

    /// Route one event to its handler
    pub async fn dispatch(&mut self, event: BotEvent) {
        debug!("Dispatch {}", event.kind());
        match event {
            BotEvent::LaunchDetected(launch) => {
                if self.filter.admit(&launch) {
                    info!(
                        mint = %launch.mint,
                        name = %launch.name,
                        "Launch approved: initial buy {:.4} SOL",
                        launch.initial_sol_buy
                    );
                    self.bus.emit(BotEvent::LaunchApproved(launch));
                } else {
                    debug!(mint = %launch.mint, "Launch rejected: initial buy {:.4} SOL", launch.initial_sol_buy);
                }
            }
            BotEvent::LaunchApproved(launch) => {
                let buyer = Arc::clone(&self.buyer);
                self.tasks.spawn(async move {
                    buyer.on_launch_approved(launch).await;
                });
            }
            BotEvent::PositionOpened(position) => self.monitor.on_position_opened(position).await,
            BotEvent::TradeUpdate(update) => {
                self.monitor.on_trade(&update).await;
            }
            BotEvent::PositionExit { position, reason } => {
                let seller = Arc::clone(&self.seller);
                self.tasks.spawn(async move {
                    seller.on_position_exit(position, reason).await;
                });
            }
            BotEvent::PositionClosed(record) => {
                debug!(mint = %record.mint, "Closed with {:+.2}% gain", record.gain);
            }
            BotEvent::PositionAbandoned { position, attempts } => {
                error!(
                    mint = %position.mint,
                    name = %position.name,
                    signature = %position.buy_signature,
                    attempts,
                    "Position stuck, manual follow-up required"
                );
            }
        }
    }

    /// One max-hold sweep of the monitor
    pub async fn tick(&mut self) {
        self.monitor.tick(now_ms()).await;
    }

    /// Drain queued events and spawned handlers until nothing is pending
    pub async fn run_until_idle(&mut self) {
        loop {
            while let Ok(event) = self.events.try_recv() {
                self.dispatch(event).await;
            }
            match self.tasks.join_next().await {
                Some(joined) => reap(joined),
                None if self.events.is_empty() => break,
                None => {}
            }
        }
    }
}

fn reap(joined: Result<(), JoinError>) {
    if let Err(e) = joined {
        error!("Handler task failed: {}", e);
    }
}
