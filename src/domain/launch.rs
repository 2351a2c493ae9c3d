//! Launch Events
//!
//! Canonical snapshot of a freshly created bonding-curve token. Both launch
//! feeds (the gRPC transaction stream and the portal WebSocket) decode into
//! this one shape so everything downstream is feed-agnostic.

use serde::{Deserialize, Serialize};

/// Lamports per whole SOL
pub const LAMPORTS_PER_SOL: f64 = 1_000_000_000.0;

/// Virtual SOL reserve the venue seeds into every new curve
pub const VIRTUAL_SOL_RESERVE: f64 = 30.0;

/// Fixed per-mint issuance in whole tokens
pub const TOTAL_SUPPLY_TOKENS: f64 = 1_073_000_000.0;

/// Decimal precision of every venue mint
pub const TOKEN_DECIMALS: u8 = 6;

/// A newly created tradable token, produced once per mint and never mutated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaunchEvent {
    /// Token mint address
    pub mint: String,
    /// Display name from the create instruction
    pub name: String,
    /// Ticker symbol
    pub symbol: String,
    /// Creator wallet
    pub creator: String,
    /// Bonding curve account
    pub bonding_curve: String,
    /// Token vault owned by the bonding curve
    pub curve_vault: String,
    /// Metadata URI
    pub uri: String,
    /// SOL the creator put in at launch (whole SOL)
    pub initial_sol_buy: f64,
    /// Virtual token reserve (whole tokens)
    pub tokens_in_curve: f64,
    /// Virtual SOL reserve (whole SOL)
    pub sol_in_curve: f64,
    /// Mint decimal precision
    pub decimals: u8,
    /// Wall clock at decode time, unix millis
    pub detected_at_ms: i64,
}

impl LaunchEvent {
    /// Spot price implied by the launch reserves, in SOL per whole token
    pub fn spot_price(&self) -> f64 {
        if self.tokens_in_curve <= 0.0 {
            return 0.0;
        }
        self.sol_in_curve / self.tokens_in_curve
    }

    /// Milliseconds elapsed since the launch was decoded
    pub fn age_ms(&self, now_ms: i64) -> i64 {
        (now_ms - self.detected_at_ms).max(0)
    }

    /// Short label used in log lines
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.mint)
    }
}

/// Current wall clock in unix millis
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
