//! Portal Wire Types
//!
//! Inbound and outbound JSON for the pumpportal WebSocket.

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;

use crate::domain::{LaunchEvent, TOKEN_DECIMALS};
use crate::ports::{TradeSide, TradeUpdate};

use super::program::curve_vault;

/// New-token payload
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTokenMessage {
    pub mint: String,
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub uri: String,
    pub trader_public_key: String,
    /// Creator's initial buy, whole SOL
    pub sol_amount: f64,
    pub v_tokens_in_bonding_curve: f64,
    pub v_sol_in_bonding_curve: f64,
    pub bonding_curve_key: String,
}

impl NewTokenMessage {
    /// `None` if the curve or mint is not a valid address
    pub fn into_launch(self, detected_at_ms: i64) -> Option<LaunchEvent> {
        let curve = Pubkey::from_str(&self.bonding_curve_key).ok()?;
        let mint = Pubkey::from_str(&self.mint).ok()?;

        Some(LaunchEvent {
            curve_vault: curve_vault(&curve, &mint).to_string(),
            mint: self.mint,
            name: self.name,
            symbol: self.symbol,
            creator: self.trader_public_key,
            bonding_curve: self.bonding_curve_key,
            uri: self.uri,
            initial_sol_buy: self.sol_amount,
            tokens_in_curve: self.v_tokens_in_bonding_curve,
            sol_in_curve: self.v_sol_in_bonding_curve,
            decimals: TOKEN_DECIMALS,
            detected_at_ms,
        })
    }
}

/// Trade payload on a subscribed mint
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeMessage {
    pub mint: String,
    /// Whole SOL
    pub sol_amount: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "txType", rename_all = "lowercase")]
pub enum PortalEvent {
    Create(NewTokenMessage),
    Buy(TradeMessage),
    Sell(TradeMessage),
}

/// Anything the portal sends
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PortalMessage {
    Event(PortalEvent),
    /// Subscription acknowledgement
    Ack { message: String },
}

impl PortalMessage {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

impl PortalEvent {
    /// Trade view, if this is a buy or sell
    pub fn as_trade(&self) -> Option<TradeUpdate> {
        let (msg, side) = match self {
            PortalEvent::Buy(msg) => (msg, TradeSide::Buy),
            PortalEvent::Sell(msg) => (msg, TradeSide::Sell),
            PortalEvent::Create(_) => return None,
        };
        Some(TradeUpdate {
            mint: msg.mint.clone(),
            sol_amount: msg.sol_amount,
            side,
        })
    }
}

/// Outbound control message
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SubscribeMessage {
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keys: Option<Vec<String>>,
}

impl SubscribeMessage {
    pub fn new_tokens() -> Self {
        Self {
            method: "subscribeNewToken".to_string(),
            keys: None,
        }
    }

    pub fn token_trades(mints: Vec<String>) -> Self {
        Self {
            method: "subscribeTokenTrade".to_string(),
            keys: Some(mints),
        }
    }

    pub fn unsubscribe_token_trades(mints: Vec<String>) -> Self {
        Self {
            method: "unsubscribeTokenTrade".to_string(),
            keys: Some(mints),
        }
    }
}
