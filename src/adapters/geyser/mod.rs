//! Geyser Adapter
//!
//! Primary launch feed over a Yellowstone gRPC stream.

mod listener;

pub use listener::{
    convert_transaction, launch_subscription, GeyserConfig, GeyserError, GeyserListener,
};
