//! CLI Adapter
//!
//! Command-line interface for the curve-sniper binary.
//! Uses clap derive macros for argument parsing.

mod commands;

pub use commands::{
    format_record, log_directive, recent, CliApp, Command, HistoryCmd, HistorySummary, RunCmd,
    StatusCmd,
};

/// Parse the process arguments
pub fn init() -> CliApp {
    use clap::Parser;
    CliApp::parse()
}
