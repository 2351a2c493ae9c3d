use serde::{Deserialize, Serialize};

use super::curve::{gain_pct, BuyQuote};
use super::launch::LaunchEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionStatus {
    /// Held and watched for exit conditions
    Open,
    /// A sell is in flight
    Liquidating,
    /// Every sell attempt failed; capacity stays consumed
    Stuck,
}

/// An open holding, keyed by mint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub mint: String,
    pub name: String,
    pub symbol: String,
    pub creator: String,
    pub bonding_curve: String,
    pub curve_vault: String,
    pub buy_signature: String,
    /// SOL per whole token from the launch reserves
    pub buy_price: f64,
    /// Raw token amount held (base units)
    pub amount: u64,
    /// SOL committed at buy
    pub buy_sol_amount: f64,
    /// Unix millis when the buy was sent
    pub buy_time_ms: i64,
    /// Decode-to-submit delta in millis
    pub buy_latency_ms: i64,
    /// Net SOL flow seen on the trade feed since subscription
    pub accumulated_sol: f64,
    pub decimals: u8,
    pub status: PositionStatus,
}

impl Position {
    /// Build the position for a confirmed buy
    pub fn from_fill(
        launch: &LaunchEvent,
        buy_signature: String,
        quote: &BuyQuote,
        sol_amount: f64,
        buy_time_ms: i64,
    ) -> Self {
        Self {
            mint: launch.mint.clone(),
            name: launch.name.clone(),
            symbol: launch.symbol.clone(),
            creator: launch.creator.clone(),
            bonding_curve: launch.bonding_curve.clone(),
            curve_vault: launch.curve_vault.clone(),
            buy_signature,
            buy_price: quote.buy_price,
            amount: quote.token_amount,
            buy_sol_amount: sol_amount,
            buy_time_ms,
            buy_latency_ms: buy_time_ms - launch.detected_at_ms,
            accumulated_sol: 0.0,
            decimals: launch.decimals,
            status: PositionStatus::Open,
        }
    }

    /// Fold one trade-feed delta into the running sum, returning the new total
    pub fn apply_trade(&mut self, signed_sol: f64) -> f64 {
        self.accumulated_sol += signed_sol;
        self.accumulated_sol
    }

    /// Held amount in whole tokens
    pub fn ui_amount(&self) -> f64 {
        self.amount as f64 / 10f64.powi(self.decimals as i32)
    }

    /// Millis held as of `now_ms`
    pub fn held_ms(&self, now_ms: i64) -> i64 {
        (now_ms - self.buy_time_ms).max(0)
    }

    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.mint)
    }
}

/// Closed trade written once to the history log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub mint: String,
    pub buy_signature: String,
    pub sell_signature: String,
    pub name: String,
    pub symbol: String,
    pub buy_price: f64,
    pub buy_sol_amount: f64,
    pub buy_time: i64,
    pub amount: u64,
    pub sell_price: f64,
    pub sell_sol_amount: f64,
    pub sell_time: i64,
    pub gain: f64,
    pub decimals: u8,
    pub buy_latency: i64,
}

impl HistoryRecord {
    /// Combine the buy facts of `position` with a confirmed sale
    pub fn from_sale(
        position: &Position,
        sell_signature: String,
        sold_amount: u64,
        realized_sol: f64,
        sell_time_ms: i64,
    ) -> Self {
        let sold_tokens = sold_amount as f64 / 10f64.powi(position.decimals as i32);
        let sell_price = if sold_tokens > 0.0 {
            realized_sol / sold_tokens
        } else {
            0.0
        };

        Self {
            mint: position.mint.clone(),
            buy_signature: position.buy_signature.clone(),
            sell_signature,
            name: position.name.clone(),
            symbol: position.symbol.clone(),
            buy_price: position.buy_price,
            buy_sol_amount: position.buy_sol_amount,
            buy_time: position.buy_time_ms,
            amount: position.amount,
            sell_price,
            sell_sol_amount: realized_sol,
            sell_time: sell_time_ms,
            gain: gain_pct(realized_sol, position.buy_sol_amount),
            decimals: position.decimals,
            buy_latency: position.buy_latency_ms,
        }
    }

    pub fn is_win(&self) -> bool {
        self.gain > 0.0
    }
}
