//! Seller
//!
//! Liquidates exited positions with a bounded retry budget. A confirmed sale
//! is closed out (token account, registry, history) and announced; a position
//! whose attempts all fail is frozen as stuck and announced as abandoned.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::domain::{HistoryRecord, Position, PositionManager};
use crate::ports::{
    BotEvent, EventBus, ExecutionPort, ExitReason, HistoryPort, SellFill, SellOrder,
};

#[derive(Debug, Clone, Copy)]
pub struct SellerConfig {
    pub order: SellOrder,
    pub attempts: u32,
    pub retry_delay: Duration,
}

impl Default for SellerConfig {
    fn default() -> Self {
        Self {
            order: SellOrder {
                percentage: 100.0,
                slippage_pct: 50.0,
            },
            attempts: 3,
            retry_delay: Duration::from_secs(2),
        }
    }
}

pub struct Seller {
    executor: Arc<dyn ExecutionPort>,
    positions: Arc<PositionManager>,
    history: Arc<dyn HistoryPort>,
    bus: EventBus,
    config: SellerConfig,
}

impl Seller {
    pub fn new(
        executor: Arc<dyn ExecutionPort>,
        positions: Arc<PositionManager>,
        history: Arc<dyn HistoryPort>,
        bus: EventBus,
        config: SellerConfig,
    ) -> Self {
        Self {
            executor,
            positions,
            history,
            bus,
            config,
        }
    }

    /// Sell and close out `position`. Returns the history record on success.
    pub async fn on_position_exit(&self, position: Position, reason: ExitReason) -> Option<HistoryRecord> {
        if !self.positions.begin_liquidation(&position.mint) {
            warn!(mint = %position.mint, "Position not open for liquidation, ignoring {} exit", reason);
            return None;
        }

        match self.sell_with_retry(&position).await {
            Some(fill) => Some(self.close_out(&position, fill).await),
            None => {
                self.abandon(position);
                None
            }
        }
    }

    async fn sell_with_retry(&self, position: &Position) -> Option<SellFill> {
        for attempt in 1..=self.config.attempts {
            match self.executor.sell(position, self.config.order).await {
                Ok(fill) => {
                    info!(
                        mint = %position.mint,
                        name = %position.name,
                        signature = %fill.signature,
                        attempt,
                        "Sell confirmed for {:.6} SOL",
                        fill.realized_sol
                    );
                    return Some(fill);
                }
                Err(e) => warn!(
                    mint = %position.mint,
                    name = %position.name,
                    signature = e.signature().unwrap_or("-"),
                    attempt,
                    "Sell attempt failed: {}",
                    e
                ),
            }

            if attempt < self.config.attempts {
                tokio::time::sleep(self.config.retry_delay).await;
            }
        }
        None
    }

    async fn close_out(&self, position: &Position, fill: SellFill) -> HistoryRecord {
        match self.executor.close_token_account(&position.mint).await {
            Ok(Some(signature)) => info!(mint = %position.mint, signature = %signature, "Token account closed"),
            Ok(None) => {}
            Err(e) => warn!(mint = %position.mint, "Token account close failed: {}", e),
        }

        self.positions.remove(&position.mint);

        let record = HistoryRecord::from_sale(
            position,
            fill.signature,
            fill.sold_amount,
            fill.realized_sol,
            fill.sell_time_ms,
        );
        if let Err(e) = self.history.append(&record).await {
            error!(
                mint = %record.mint,
                signature = %record.sell_signature,
                "History append failed: {}",
                e
            );
        }

        info!(
            mint = %record.mint,
            name = %record.name,
            "Position closed: {:+.2}% ({} -> {:.6} SOL)",
            record.gain,
            record.buy_sol_amount,
            record.sell_sol_amount
        );
        self.bus.emit(BotEvent::PositionClosed(record.clone()));
        record
    }

    fn abandon(&self, position: Position) {
        self.positions.mark_stuck(&position.mint);
        error!(
            mint = %position.mint,
            name = %position.name,
            signature = %position.buy_signature,
            attempts = self.config.attempts,
            "All sell attempts failed, position abandoned"
        );
        self.bus.emit(BotEvent::PositionAbandoned {
            position,
            attempts: self.config.attempts,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PositionStatus;
    use crate::ports::mocks::{MemoryHistory, MockExecutor};

    fn position(mint: &str) -> Position {
        Position {
            mint: mint.to_string(),
            name: "Frog".to_string(),
            symbol: "FRG".to_string(),
            creator: "Creator".to_string(),
            bonding_curve: "Curve".to_string(),
            curve_vault: "Vault".to_string(),
            buy_signature: "buy".to_string(),
            buy_price: 0.000000033,
            amount: 3_026_315_000_000,
            buy_sol_amount: 0.1,
            buy_time_ms: 1_000,
            buy_latency_ms: 5,
            accumulated_sol: 0.0,
            decimals: 6,
            status: PositionStatus::Open,
        }
    }

    fn config() -> SellerConfig {
        SellerConfig {
            retry_delay: Duration::from_millis(1),
            ..SellerConfig::default()
        }
    }

    fn seller(
        executor: MockExecutor,
    ) -> (
        Seller,
        Arc<MockExecutor>,
        Arc<PositionManager>,
        Arc<MemoryHistory>,
        tokio::sync::mpsc::UnboundedReceiver<BotEvent>,
    ) {
        let (bus, rx) = EventBus::channel();
        let executor = Arc::new(executor);
        let positions = Arc::new(PositionManager::new(2));
        let history = Arc::new(MemoryHistory::new());
        positions.try_add(position("A")).unwrap();
        let seller = Seller::new(executor.clone(), positions.clone(), history.clone(), bus, config());
        (seller, executor, positions, history, rx)
    }

    #[tokio::test]
    async fn test_sale_closes_out() {
        let (seller, executor, positions, history, mut rx) =
            seller(MockExecutor::new().with_realized_sol(0.12));

        let record = seller
            .on_position_exit(position("A"), ExitReason::TakeProfit)
            .await
            .unwrap();

        assert!((record.gain - 20.0).abs() < 1e-9);
        assert!(!positions.contains("A"));
        assert_eq!(executor.close_calls(), vec!["A".to_string()]);
        assert_eq!(history.records(), vec![record.clone()]);
        assert!(matches!(rx.try_recv(), Ok(BotEvent::PositionClosed(r)) if r == record));
    }

    #[tokio::test]
    async fn test_retry_then_success() {
        let (seller, executor, _positions, history, _rx) =
            seller(MockExecutor::new().with_failing_sells(2));

        let record = seller
            .on_position_exit(position("A"), ExitReason::MaxHold)
            .await
            .unwrap();

        assert_eq!(executor.sell_calls().len(), 3);
        assert_eq!(record.sell_signature, "sell-A-3");
        assert_eq!(history.records().len(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_attempts_abandon() {
        let (seller, executor, positions, history, mut rx) =
            seller(MockExecutor::new().with_failing_sells(3));

        assert!(seller
            .on_position_exit(position("A"), ExitReason::StopLoss)
            .await
            .is_none());

        assert_eq!(executor.sell_calls().len(), 3);
        assert!(executor.close_calls().is_empty());
        assert!(history.records().is_empty());
        assert_eq!(positions.get("A").unwrap().status, PositionStatus::Stuck);
        assert_eq!(positions.count(), 1);
        assert!(matches!(
            rx.try_recv(),
            Ok(BotEvent::PositionAbandoned { attempts: 3, .. })
        ));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_second_exit_for_same_mint_is_ignored() {
        let (seller, executor, positions, _history, _rx) = seller(MockExecutor::new());
        assert!(positions.begin_liquidation("A"));

        assert!(seller
            .on_position_exit(position("A"), ExitReason::MaxHold)
            .await
            .is_none());
        assert!(executor.sell_calls().is_empty());
    }
}
