//! CLI Commands
//!
//! Argument definitions for the curve-sniper binary plus the small pieces of
//! command logic that do not need a network connection.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::config::LaunchSource;
use crate::domain::HistoryRecord;

/// curve-sniper - pump.fun launch sniper
#[derive(Parser, Debug)]
#[command(
    name = "curve-sniper",
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    about = "Launch sniper for pump.fun bonding curves",
    long_about = "curve-sniper watches for new pump.fun launches, buys the ones whose creator \
                  buy falls inside the admission band, and sells each position on net trade \
                  flow or after a fixed hold."
)]
pub struct CliApp {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the sniper pipeline until Ctrl+C
    Run(RunCmd),

    /// Show wallet balance and history size
    Status(StatusCmd),

    /// Show recent closed trades
    History(HistoryCmd),
}

impl Command {
    pub fn config_path(&self) -> &Path {
        match self {
            Command::Run(cmd) => &cmd.config,
            Command::Status(cmd) => &cmd.config,
            Command::History(cmd) => &cmd.config,
        }
    }
}

/// Start the pipeline
#[derive(Parser, Debug)]
pub struct RunCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config/mainnet.toml")]
    pub config: PathBuf,

    /// Override the launch source (geyser or portal)
    #[arg(long, value_name = "SOURCE")]
    pub source: Option<LaunchSource>,

    /// Buy only the first admitted launch
    #[arg(long)]
    pub single_shot: bool,
}

/// Show wallet status
#[derive(Parser, Debug)]
pub struct StatusCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config/mainnet.toml")]
    pub config: PathBuf,
}

/// Show closed trades
#[derive(Parser, Debug)]
pub struct HistoryCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config/mainnet.toml")]
    pub config: PathBuf,

    /// Number of most recent trades to print
    #[arg(short, long, value_name = "N", default_value = "20")]
    pub limit: usize,
}

/// Filter directive for the log subscriber. `--debug` beats `--verbose`,
/// which beats the configured level.
pub fn log_directive(verbose: bool, debug: bool, configured: &str) -> String {
    if debug {
        "debug".to_string()
    } else if verbose {
        "info".to_string()
    } else if configured.trim().is_empty() {
        "info".to_string()
    } else {
        configured.trim().to_string()
    }
}

/// Aggregate over the closed-trade log
#[derive(Debug, Clone, PartialEq)]
pub struct HistorySummary {
    pub trades: usize,
    pub wins: usize,
    pub invested_sol: f64,
    pub realized_sol: f64,
}

impl HistorySummary {
    pub fn from_records(records: &[HistoryRecord]) -> Self {
        Self {
            trades: records.len(),
            wins: records.iter().filter(|r| r.is_win()).count(),
            invested_sol: records.iter().map(|r| r.buy_sol_amount).sum(),
            realized_sol: records.iter().map(|r| r.sell_sol_amount).sum(),
        }
    }

    /// Realized minus invested
    pub fn net_sol(&self) -> f64 {
        self.realized_sol - self.invested_sol
    }

    /// Net result as a percentage of the SOL invested
    pub fn gain_pct(&self) -> f64 {
        if self.invested_sol > 0.0 {
            self.net_sol() / self.invested_sol * 100.0
        } else {
            0.0
        }
    }

    pub fn win_rate(&self) -> f64 {
        if self.trades > 0 {
            self.wins as f64 / self.trades as f64 * 100.0
        } else {
            0.0
        }
    }
}

/// The last `limit` records, most recent first
pub fn recent(records: &[HistoryRecord], limit: usize) -> Vec<&HistoryRecord> {
    let mut sorted: Vec<&HistoryRecord> = records.iter().collect();
    sorted.sort_by(|a, b| b.sell_time.cmp(&a.sell_time));
    sorted.truncate(limit);
    sorted
}

/// One line per closed trade
pub fn format_record(record: &HistoryRecord) -> String {
    format!(
        "{}  {:<10} {:>10.4} -> {:>10.4} SOL  {:+7.2}%  {}",
        format_timestamp(record.sell_time),
        truncate(&record.symbol, 10),
        record.buy_sol_amount,
        record.sell_sol_amount,
        record.gain,
        record.mint
    )
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

fn format_timestamp(ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ms.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(mint: &str, buy: f64, sell: f64, sell_time: i64) -> HistoryRecord {
        HistoryRecord {
            mint: mint.to_string(),
            buy_signature: "buy".to_string(),
            sell_signature: "sell".to_string(),
            name: "Frog".to_string(),
            symbol: "FRG".to_string(),
            buy_price: 0.000000033,
            buy_sol_amount: buy,
            buy_time: sell_time - 10_000,
            amount: 1_000_000,
            sell_price: 0.00000004,
            sell_sol_amount: sell,
            sell_time,
            gain: (sell - buy) / buy * 100.0,
            decimals: 6,
            buy_latency: 5,
        }
    }

    #[test]
    fn test_cli_app_parse_run() {
        let args = vec!["curve-sniper", "run", "--config", "test.toml"];
        let app = CliApp::try_parse_from(args).unwrap();

        match app.command {
            Command::Run(cmd) => {
                assert_eq!(cmd.config, PathBuf::from("test.toml"));
                assert_eq!(cmd.source, None);
                assert!(!cmd.single_shot);
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_cli_app_parse_run_overrides() {
        let args = vec!["curve-sniper", "run", "--source", "portal", "--single-shot"];
        let app = CliApp::try_parse_from(args).unwrap();

        match app.command {
            Command::Run(cmd) => {
                assert_eq!(cmd.source, Some(LaunchSource::Portal));
                assert!(cmd.single_shot);
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_cli_app_rejects_unknown_source() {
        let args = vec!["curve-sniper", "run", "--source", "carrier-pigeon"];
        assert!(CliApp::try_parse_from(args).is_err());
    }

    #[test]
    fn test_cli_app_parse_status() {
        let app = CliApp::try_parse_from(vec!["curve-sniper", "status", "-c", "s.toml"]).unwrap();
        assert_eq!(app.command.config_path(), Path::new("s.toml"));
    }

    #[test]
    fn test_cli_app_parse_history_limit() {
        let app = CliApp::try_parse_from(vec!["curve-sniper", "history", "--limit", "5"]).unwrap();
        match app.command {
            Command::History(cmd) => {
                assert_eq!(cmd.limit, 5);
                assert_eq!(cmd.config, PathBuf::from("config/mainnet.toml"));
            }
            _ => panic!("Expected History command"),
        }
    }

    #[test]
    fn test_global_flags() {
        let app = CliApp::try_parse_from(vec!["curve-sniper", "status", "--verbose", "--debug"]).unwrap();
        assert!(app.verbose);
        assert!(app.debug);
    }

    #[test]
    fn test_log_directive_precedence() {
        assert_eq!(log_directive(true, true, "warn"), "debug");
        assert_eq!(log_directive(true, false, "warn"), "info");
        assert_eq!(log_directive(false, false, "warn"), "warn");
        assert_eq!(log_directive(false, false, " "), "info");
    }

    #[test]
    fn test_history_summary() {
        let records = vec![record("A", 0.1, 0.12, 2_000), record("B", 0.1, 0.05, 1_000)];
        let summary = HistorySummary::from_records(&records);

        assert_eq!(summary.trades, 2);
        assert_eq!(summary.wins, 1);
        assert!((summary.net_sol() - -0.03).abs() < 1e-9);
        assert!((summary.gain_pct() - -15.0).abs() < 1e-9);
        assert!((summary.win_rate() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_history_summary() {
        let summary = HistorySummary::from_records(&[]);
        assert_eq!(summary.trades, 0);
        assert_eq!(summary.gain_pct(), 0.0);
        assert_eq!(summary.win_rate(), 0.0);
    }

    #[test]
    fn test_recent_is_newest_first_and_limited() {
        let records = vec![
            record("A", 0.1, 0.1, 1_000),
            record("B", 0.1, 0.1, 3_000),
            record("C", 0.1, 0.1, 2_000),
        ];
        let mints: Vec<&str> = recent(&records, 2).iter().map(|r| r.mint.as_str()).collect();
        assert_eq!(mints, vec!["B", "C"]);
    }

    #[test]
    fn test_format_record_contains_mint_and_gain() {
        let line = format_record(&record("MintA", 0.1, 0.12, 1_700_000_000_000));
        assert!(line.contains("MintA"));
        assert!(line.contains("+20.00%"));
        assert!(line.starts_with("2023-11-14"));
    }
}
