//! History Adapter
//!
//! File-backed closed-trade log.

mod json_log;

pub use json_log::{JsonHistoryLog, DEFAULT_HISTORY_FILE};
