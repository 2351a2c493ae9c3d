//! Application Layer - Pipeline handlers and the orchestrator that wires them

pub mod buyer;
pub mod monitor;
pub mod orchestrator;
pub mod seller;

pub use buyer::Buyer;
pub use monitor::{ExitMonitor, ExitThresholds};
pub use orchestrator::{
    OrchestratorError, OrchestratorStatus, PipelineConfig, SniperOrchestrator, StopHandle,
};
pub use seller::{Seller, SellerConfig};
