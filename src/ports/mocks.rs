//! In-memory port implementations for tests
//!
//! Each mock records its calls and lets a test script the outcome.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::domain::curve::{quote_buy, sell_amount};
use crate::domain::{HistoryRecord, LaunchEvent, Position};

use super::execution::{BuyOrder, ExecutionError, ExecutionPort, SellFill, SellOrder};
use super::history::{HistoryError, HistoryPort};
use super::trade_feed::{FeedError, TradeFeedPort};

/// Mock executor with scripted buy and sell outcomes
#[derive(Debug, Default)]
pub struct MockExecutor {
    buy_outcomes: Mutex<VecDeque<Result<(), ExecutionError>>>,
    sell_failures_remaining: Mutex<u32>,
    realized_sol: Mutex<Option<f64>>,
    buy_delay: Mutex<Option<Duration>>,
    buys: Arc<Mutex<Vec<String>>>,
    sells: Arc<Mutex<Vec<String>>>,
    closes: Arc<Mutex<Vec<String>>>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the outcome of the next buy; unqueued buys succeed
    pub fn with_buy_outcome(self, outcome: Result<(), ExecutionError>) -> Self {
        self.buy_outcomes.lock().push_back(outcome);
        self
    }

    /// Fail the next `count` sells with `NotConfirmed`
    pub fn with_failing_sells(self, count: u32) -> Self {
        *self.sell_failures_remaining.lock() = count;
        self
    }

    /// SOL returned by every successful sell
    pub fn with_realized_sol(self, sol: f64) -> Self {
        *self.realized_sol.lock() = Some(sol);
        self
    }

    /// Hold each buy open for `delay` before it resolves
    pub fn with_buy_delay(self, delay: Duration) -> Self {
        *self.buy_delay.lock() = Some(delay);
        self
    }

    pub fn buy_calls(&self) -> Vec<String> {
        self.buys.lock().clone()
    }

    pub fn sell_calls(&self) -> Vec<String> {
        self.sells.lock().clone()
    }

    pub fn close_calls(&self) -> Vec<String> {
        self.closes.lock().clone()
    }
}

#[async_trait]
impl ExecutionPort for MockExecutor {
    async fn buy(&self, launch: &LaunchEvent, order: BuyOrder) -> Result<Position, ExecutionError> {
        self.buys.lock().push(launch.mint.clone());

        let delay = *self.buy_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let outcome = self.buy_outcomes.lock().pop_front().unwrap_or(Ok(()));
        outcome?;

        let quote = quote_buy(
            launch.tokens_in_curve,
            launch.sol_in_curve,
            order.sol_amount,
            order.slippage_pct,
            launch.decimals,
        )
        .map_err(|e| ExecutionError::Build(e.to_string()))?;

        Ok(Position::from_fill(
            launch,
            format!("buy-{}", launch.mint),
            &quote,
            order.sol_amount,
            launch.detected_at_ms + 5,
        ))
    }

    async fn sell(&self, position: &Position, order: SellOrder) -> Result<SellFill, ExecutionError> {
        let attempt = {
            let mut sells = self.sells.lock();
            sells.push(position.mint.clone());
            sells.iter().filter(|m| *m == &position.mint).count()
        };
        let signature = format!("sell-{}-{}", position.mint, attempt);

        {
            let mut remaining = self.sell_failures_remaining.lock();
            if *remaining > 0 {
                *remaining -= 1;
                return Err(ExecutionError::NotConfirmed { signature });
            }
        }

        let scripted = *self.realized_sol.lock();
        let realized_sol = scripted.unwrap_or(position.buy_sol_amount);
        Ok(SellFill {
            signature,
            sold_amount: sell_amount(position.amount, order.percentage),
            realized_sol,
            sell_time_ms: position.buy_time_ms + 1_000,
            account_closed: order.percentage >= 100.0,
        })
    }

    async fn close_token_account(&self, mint: &str) -> Result<Option<String>, ExecutionError> {
        self.closes.lock().push(mint.to_string());
        Ok(None)
    }
}

/// Mock trade feed that tracks live subscriptions
#[derive(Debug, Default)]
pub struct MockTradeFeed {
    subscribed: Mutex<HashSet<String>>,
    log: Mutex<Vec<(String, String)>>,
}

impl MockTradeFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_subscribed(&self, mint: &str) -> bool {
        self.subscribed.lock().contains(mint)
    }

    /// (operation, mint) pairs in call order
    pub fn calls(&self) -> Vec<(String, String)> {
        self.log.lock().clone()
    }
}

#[async_trait]
impl TradeFeedPort for MockTradeFeed {
    async fn subscribe(&self, mint: &str) -> Result<(), FeedError> {
        self.subscribed.lock().insert(mint.to_string());
        self.log.lock().push(("subscribe".to_string(), mint.to_string()));
        Ok(())
    }

    async fn unsubscribe(&self, mint: &str) -> Result<(), FeedError> {
        self.subscribed.lock().remove(mint);
        self.log.lock().push(("unsubscribe".to_string(), mint.to_string()));
        Ok(())
    }
}

/// History sink kept in memory
#[derive(Debug, Default)]
pub struct MemoryHistory {
    records: Mutex<Vec<HistoryRecord>>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<HistoryRecord> {
        self.records.lock().clone()
    }
}

#[async_trait]
impl HistoryPort for MemoryHistory {
    async fn append(&self, record: &HistoryRecord) -> Result<(), HistoryError> {
        self.records.lock().push(record.clone());
        Ok(())
    }

    async fn load(&self) -> Result<Vec<HistoryRecord>, HistoryError> {
        Ok(self.records.lock().clone())
    }
}
