//! Pump.fun Adapter
//!
//! Everything venue-specific about the bonding-curve program:
//!
//! - `program`: program ids, discriminators and derived addresses
//! - `decoder`: create-transaction decoding into `LaunchEvent`
//! - `instructions`: buy and sell instruction builders
//! - `executor`: signed swap submission behind `ExecutionPort`
//! - `portal`: pumpportal WebSocket feed for launches and per-mint trades
//!
//! # WebSocket Protocol
//!
//! The portal at `wss://pumpportal.fun/api/data` accepts JSON control
//! messages with a `method` and an optional `keys` array:
//!
//! - `subscribeNewToken` - every new token creation
//! - `subscribeTokenTrade` / `unsubscribeTokenTrade` - trades on listed mints

pub mod decoder;
pub mod executor;
pub mod instructions;
pub mod portal;
pub mod program;
mod types;

pub use decoder::{
    decode_launch, try_decode_launch, DecodeError, RawInstruction, RawTokenBalance, RawTransaction,
};
pub use executor::{ExecutorConfig, PumpFunExecutor};
pub use portal::{PortalConfig, PortalError, PortalFeed, DEFAULT_WS_URL};
pub use types::{NewTokenMessage, PortalEvent, PortalMessage, SubscribeMessage, TradeMessage};
