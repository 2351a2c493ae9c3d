//! curve-sniper - pump.fun Launch Sniper Library
//!
//! Detects new bonding-curve launches, admits those whose creator buy falls
//! inside a configured band, buys them, and sells each position on net trade
//! flow or after a fixed hold.
//!
//! # Modules
//!
//! - `domain`: Core types and math (LaunchEvent, Position, curve sizing, admission, registry)
//! - `ports`: Trait abstractions (ExecutionPort, TradeFeedPort, HistoryPort) and the event bus
//! - `adapters`: External implementations (venue, gRPC, portal, relays, Solana, history, CLI)
//! - `config`: Configuration loading and validation
//! - `application`: Buyer, Monitor, Seller and the orchestrator that wires them

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod config;
pub mod application;
