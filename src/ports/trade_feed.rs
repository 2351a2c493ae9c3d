use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FeedError {
    #[error("Feed command channel closed")]
    ChannelClosed,
    #[error("Feed error: {0}")]
    Other(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

/// One trade observed on a watched mint
#[derive(Debug, Clone, PartialEq)]
pub struct TradeUpdate {
    pub mint: String,
    /// Unsigned SOL size of the trade
    pub sol_amount: f64,
    pub side: TradeSide,
}

impl TradeUpdate {
    /// SOL flowing into the curve is positive, out of it negative
    pub fn signed_sol(&self) -> f64 {
        match self.side {
            TradeSide::Buy => self.sol_amount,
            TradeSide::Sell => -self.sol_amount,
        }
    }
}

/// Per-mint trade subscription on the secondary feed
#[async_trait]
pub trait TradeFeedPort: Send + Sync {
    async fn subscribe(&self, mint: &str) -> Result<(), FeedError>;
    async fn unsubscribe(&self, mint: &str) -> Result<(), FeedError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_sol() {
        let buy = TradeUpdate {
            mint: "m".to_string(),
            sol_amount: 0.4,
            side: TradeSide::Buy,
        };
        let sell = TradeUpdate {
            side: TradeSide::Sell,
            ..buy.clone()
        };
        assert_eq!(buy.signed_sol(), 0.4);
        assert_eq!(sell.signed_sol(), -0.4);
    }

    #[test]
    fn test_side_wire_format() {
        let side: TradeSide = serde_json::from_str("\"sell\"").unwrap();
        assert_eq!(side, TradeSide::Sell);
        assert_eq!(serde_json::to_string(&TradeSide::Buy).unwrap(), "\"buy\"");
    }
}
