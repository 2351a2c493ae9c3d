//! Configuration Loader
//!
//! Loads and validates configuration from TOML files matching config.toml structure.
//! Every section except `[solana]` has defaults, so a minimal file only names
//! the RPC endpoint and keypair. Secrets come from the environment.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::adapters::pump_fun::{ExecutorConfig, DEFAULT_WS_URL};
use crate::adapters::relay::{
    endpoints, ConfirmationLevel, ConfirmationPolicy, RelayConfig, SendMode,
};
use crate::application::{ExitThresholds, PipelineConfig, SellerConfig};
use crate::domain::{AdmissionBand, AdmissionFilter, AdmissionMode};
use crate::ports::{BuyOrder, SellOrder};

/// Main configuration structure matching config.toml
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub solana: SolanaSection,
    #[serde(default)]
    pub feeds: FeedsSection,
    #[serde(default)]
    pub admission: AdmissionSection,
    #[serde(default)]
    pub trading: TradingSection,
    #[serde(default)]
    pub exit: ExitSection,
    #[serde(default)]
    pub submission: SubmissionSection,
    #[serde(default)]
    pub connection: ConnectionSection,
    #[serde(default)]
    pub history: HistorySection,
    #[serde(default)]
    pub logging: LoggingSection,
}

/// Solana RPC configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct SolanaSection {
    /// RPC endpoint (use private RPC for production)
    pub rpc_url: String,
    /// Wallet keypair path (NEVER commit this file!)
    pub keypair_path: String,
}

impl SolanaSection {
    /// Get RPC URL with environment variable override
    /// Checks SOLANA_RPC_URL env var first, falls back to config value
    pub fn get_rpc_url(&self) -> String {
        std::env::var("SOLANA_RPC_URL").unwrap_or_else(|_| self.rpc_url.clone())
    }

    /// Keypair path with `SOLANA_KEYPAIR_PATH` override and `~` expanded
    pub fn get_keypair_path(&self) -> PathBuf {
        let raw = std::env::var("SOLANA_KEYPAIR_PATH").unwrap_or_else(|_| self.keypair_path.clone());
        PathBuf::from(shellexpand::tilde(&raw).into_owned())
    }

    /// Base58 secret from `PRIVATE_KEY`; takes precedence over the keypair file
    pub fn private_key(&self) -> Option<String> {
        std::env::var("PRIVATE_KEY").ok().filter(|k| !k.trim().is_empty())
    }
}

/// Where launches come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaunchSource {
    /// Yellowstone gRPC transaction stream
    #[default]
    Geyser,
    /// pumpportal new-token notifications
    Portal,
}

impl std::str::FromStr for LaunchSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "geyser" | "grpc" => Ok(LaunchSource::Geyser),
            "portal" => Ok(LaunchSource::Portal),
            other => Err(format!("unknown launch source '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedsSection {
    pub launch_source: LaunchSource,
    pub grpc_url: Option<String>,
    pub grpc_token: Option<String>,
    pub portal_ws_url: String,
    pub reconnect_delay_ms: u64,
}

impl Default for FeedsSection {
    fn default() -> Self {
        Self {
            launch_source: LaunchSource::Geyser,
            grpc_url: None,
            grpc_token: None,
            portal_ws_url: DEFAULT_WS_URL.to_string(),
            reconnect_delay_ms: 1000,
        }
    }
}

impl FeedsSection {
    /// `GRPC_URL` env var first, then the config value
    pub fn get_grpc_url(&self) -> Option<String> {
        std::env::var("GRPC_URL").ok().or_else(|| self.grpc_url.clone())
    }

    /// `GRPC_API_KEY` env var first, then the config value
    pub fn get_grpc_token(&self) -> Option<String> {
        std::env::var("GRPC_API_KEY").ok().or_else(|| self.grpc_token.clone())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AdmissionSection {
    pub min_initial_buy_sol: f64,
    pub max_initial_buy_sol: f64,
    pub mode: AdmissionMode,
}

impl Default for AdmissionSection {
    fn default() -> Self {
        let band = AdmissionBand::default();
        Self {
            min_initial_buy_sol: band.min_initial_buy_sol,
            max_initial_buy_sol: band.max_initial_buy_sol,
            mode: AdmissionMode::Continuous,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TradingSection {
    pub buy_amount_sol: f64,
    pub buy_slippage_pct: f64,
    /// Share of the holding sold on exit
    pub sell_percentage: f64,
    pub sell_slippage_pct: f64,
    pub max_positions: usize,
    pub sell_attempts: u32,
    pub sell_retry_delay_ms: u64,
}

impl Default for TradingSection {
    fn default() -> Self {
        Self {
            buy_amount_sol: 0.1,
            buy_slippage_pct: 5.0,
            sell_percentage: 100.0,
            sell_slippage_pct: 50.0,
            max_positions: 2,
            sell_attempts: 3,
            sell_retry_delay_ms: 2000,
        }
    }
}

impl TradingSection {
    /// `MAX_POSITIONS` env var first, then the config value
    pub fn get_max_positions(&self) -> usize {
        std::env::var("MAX_POSITIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(self.max_positions)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExitSection {
    pub take_profit_sol: f64,
    pub stop_loss_sol: f64,
    pub max_hold_ms: i64,
    pub poll_interval_ms: u64,
}

impl Default for ExitSection {
    fn default() -> Self {
        let thresholds = ExitThresholds::default();
        Self {
            take_profit_sol: thresholds.take_profit_sol,
            stop_loss_sol: thresholds.stop_loss_sol,
            max_hold_ms: thresholds.max_hold_ms,
            poll_interval_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SubmissionSection {
    pub mode: SendMode,
    pub buy_provider_fee_sol: f64,
    pub sell_provider_fee_sol: f64,
    pub priority_fee_sol: f64,
    pub compute_unit_limit: u32,
    pub sell_priority_fee: bool,
    pub confirm_retries: u32,
    pub confirm_delay_ms: u64,
    pub sell_confirmation: ConfirmationLevel,
    pub block_razor_url: String,
    pub axiom_url: String,
    pub jito_url: String,
    pub timeout_ms: u64,
}

impl Default for SubmissionSection {
    fn default() -> Self {
        let executor = ExecutorConfig::default();
        Self {
            mode: SendMode::ZeroSlot,
            buy_provider_fee_sol: executor.buy_provider_fee_sol,
            sell_provider_fee_sol: executor.sell_provider_fee_sol,
            priority_fee_sol: executor.priority_fee_sol,
            compute_unit_limit: executor.compute_unit_limit,
            sell_priority_fee: false,
            confirm_retries: 20,
            confirm_delay_ms: 1000,
            sell_confirmation: ConfirmationLevel::Finalized,
            block_razor_url: endpoints::BLOCK_RAZOR.to_string(),
            axiom_url: endpoints::AXIOM.to_string(),
            jito_url: endpoints::JITO.to_string(),
            timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConnectionSection {
    pub blockhash_refresh_ms: u64,
    pub relay_warm_interval_ms: u64,
    pub auth_refresh_ms: u64,
}

impl Default for ConnectionSection {
    fn default() -> Self {
        Self {
            blockhash_refresh_ms: 5000,
            relay_warm_interval_ms: 15_000,
            auth_refresh_ms: 60_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HistorySection {
    pub path: String,
}

impl Default for HistorySection {
    fn default() -> Self {
        Self {
            path: crate::adapters::history::DEFAULT_HISTORY_FILE.to_string(),
        }
    }
}

impl HistorySection {
    pub fn get_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.path).into_owned())
    }
}

/// Logging configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

fn invalid(msg: String) -> ConfigError {
    ConfigError::ValidationError(msg)
}

impl Config {
    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.solana.rpc_url.trim().is_empty() {
            return Err(invalid("solana.rpc_url must not be empty".to_string()));
        }

        let adm = &self.admission;
        if adm.min_initial_buy_sol < 0.0 || adm.min_initial_buy_sol > adm.max_initial_buy_sol {
            return Err(invalid(format!(
                "admission band must satisfy 0 <= min <= max, got [{}, {}]",
                adm.min_initial_buy_sol, adm.max_initial_buy_sol
            )));
        }

        let t = &self.trading;
        if t.buy_amount_sol <= 0.0 {
            return Err(invalid(format!("buy_amount_sol must be > 0, got {}", t.buy_amount_sol)));
        }
        if t.buy_slippage_pct < 0.0 {
            return Err(invalid(format!(
                "buy_slippage_pct must be >= 0, got {}",
                t.buy_slippage_pct
            )));
        }
        if t.sell_percentage <= 0.0 || t.sell_percentage > 100.0 {
            return Err(invalid(format!(
                "sell_percentage must be 0-100, got {}",
                t.sell_percentage
            )));
        }
        if t.sell_slippage_pct < 0.0 || t.sell_slippage_pct > 100.0 {
            return Err(invalid(format!(
                "sell_slippage_pct must be 0-100, got {}",
                t.sell_slippage_pct
            )));
        }
        if t.max_positions == 0 {
            return Err(invalid("max_positions must be > 0".to_string()));
        }
        if t.sell_attempts == 0 {
            return Err(invalid("sell_attempts must be > 0".to_string()));
        }

        let e = &self.exit;
        if e.take_profit_sol <= 0.0 {
            return Err(invalid(format!("take_profit_sol must be > 0, got {}", e.take_profit_sol)));
        }
        if e.stop_loss_sol >= 0.0 {
            return Err(invalid(format!("stop_loss_sol must be < 0, got {}", e.stop_loss_sol)));
        }
        if e.max_hold_ms <= 0 || e.poll_interval_ms == 0 {
            return Err(invalid("max_hold_ms and poll_interval_ms must be > 0".to_string()));
        }

        let s = &self.submission;
        if s.compute_unit_limit == 0 {
            return Err(invalid("compute_unit_limit must be > 0".to_string()));
        }
        if s.priority_fee_sol < 0.0 || s.buy_provider_fee_sol < 0.0 || s.sell_provider_fee_sol < 0.0 {
            return Err(invalid("submission fees must be >= 0".to_string()));
        }
        if s.confirm_retries == 0 {
            return Err(invalid("confirm_retries must be > 0".to_string()));
        }

        let c = &self.connection;
        if c.blockhash_refresh_ms == 0 || c.relay_warm_interval_ms == 0 || c.auth_refresh_ms == 0 {
            return Err(invalid("connection intervals must be > 0".to_string()));
        }

        Ok(())
    }

    pub fn admission_filter(&self) -> AdmissionFilter {
        AdmissionFilter::new(
            AdmissionBand::new(
                self.admission.min_initial_buy_sol,
                self.admission.max_initial_buy_sol,
            ),
            self.admission.mode,
        )
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            buy: BuyOrder {
                sol_amount: self.trading.buy_amount_sol,
                slippage_pct: self.trading.buy_slippage_pct,
            },
            seller: SellerConfig {
                order: SellOrder {
                    percentage: self.trading.sell_percentage,
                    slippage_pct: self.trading.sell_slippage_pct,
                },
                attempts: self.trading.sell_attempts,
                retry_delay: Duration::from_millis(self.trading.sell_retry_delay_ms),
            },
            exit: ExitThresholds {
                take_profit_sol: self.exit.take_profit_sol,
                stop_loss_sol: self.exit.stop_loss_sol,
                max_hold_ms: self.exit.max_hold_ms,
            },
            poll_interval: Duration::from_millis(self.exit.poll_interval_ms),
        }
    }

    pub fn executor_config(&self) -> ExecutorConfig {
        let s = &self.submission;
        ExecutorConfig {
            buy_provider_fee_sol: s.buy_provider_fee_sol,
            sell_provider_fee_sol: s.sell_provider_fee_sol,
            priority_fee_sol: s.priority_fee_sol,
            compute_unit_limit: s.compute_unit_limit,
            sell_priority_fee: s.sell_priority_fee,
            buy_confirmation: ConfirmationLevel::Confirmed,
            sell_confirmation: s.sell_confirmation,
            confirmation: ConfirmationPolicy {
                retries: s.confirm_retries,
                delay: Duration::from_millis(s.confirm_delay_ms),
            },
        }
    }

    /// Relay router settings with credentials read from the environment
    pub fn relay_config(&self) -> Result<RelayConfig, ConfigError> {
        self.relay_config_with(|name| std::env::var(name).ok())
    }

    /// Relay router settings with credentials from `env`.
    /// Fails when the selected provider's credentials are missing.
    pub fn relay_config_with<F>(&self, env: F) -> Result<RelayConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let s = &self.submission;
        let config = RelayConfig {
            mode: s.mode,
            rpc_url: self.solana.get_rpc_url(),
            block_razor_url: s.block_razor_url.clone(),
            block_razor_api_key: env("BLOCK_RAZOR_AUTHTOKEN"),
            zero_slot_url: env("ZEROSLOT_RPC_URL"),
            zero_slot_api_key: env("ZEROSLOT_RPC_API_KEY"),
            axiom_url: s.axiom_url.clone(),
            jito_url: s.jito_url.clone(),
            timeout: Duration::from_millis(s.timeout_ms),
        };

        match s.mode {
            SendMode::BlockRazor if config.block_razor_api_key.is_none() => {
                Err(invalid("BLOCK_RAZOR_AUTHTOKEN is required for block_razor mode".to_string()))
            }
            SendMode::ZeroSlot
                if config.zero_slot_url.is_none() || config.zero_slot_api_key.is_none() =>
            {
                Err(invalid(
                    "ZEROSLOT_RPC_URL and ZEROSLOT_RPC_API_KEY are required for zero_slot mode"
                        .to_string(),
                ))
            }
            SendMode::Axiom if env("AXIOM_REFRESH_TOKEN").is_none() => {
                Err(invalid("AXIOM_REFRESH_TOKEN is required for axiom mode".to_string()))
            }
            _ => Ok(config),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn minimal_config() -> String {
        r#"
[solana]
rpc_url = "https://api.mainnet-beta.solana.com"
keypair_path = "~/.config/solana/id.json"
"#
        .to_string()
    }

    fn write(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let file = write(&minimal_config());
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.feeds.launch_source, LaunchSource::Geyser);
        assert_eq!(config.feeds.portal_ws_url, DEFAULT_WS_URL);
        assert_eq!(config.admission.min_initial_buy_sol, 0.05);
        assert_eq!(config.admission.max_initial_buy_sol, 0.75);
        assert_eq!(config.admission.mode, AdmissionMode::Continuous);
        assert_eq!(config.trading.max_positions, 2);
        assert_eq!(config.trading.sell_attempts, 3);
        assert_eq!(config.exit.take_profit_sol, 1.5);
        assert_eq!(config.exit.stop_loss_sol, -1.5);
        assert_eq!(config.exit.max_hold_ms, 15_000);
        assert_eq!(config.submission.mode, SendMode::ZeroSlot);
        assert_eq!(config.submission.sell_confirmation, ConfirmationLevel::Finalized);
        assert_eq!(config.connection.blockhash_refresh_ms, 5000);
        assert_eq!(config.history.path, "token-history.json");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_full_sections_parse() {
        let content = format!(
            "{}{}",
            minimal_config(),
            r#"
[feeds]
launch_source = "portal"
reconnect_delay_ms = 250

[admission]
min_initial_buy_sol = 0.25
max_initial_buy_sol = 1.1
mode = "single_shot"

[trading]
buy_amount_sol = 0.2
sell_percentage = 50.0

[submission]
mode = "jito"
sell_priority_fee = true
sell_confirmation = "confirmed"
"#
        );
        let file = write(&content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.feeds.launch_source, LaunchSource::Portal);
        assert_eq!(config.feeds.reconnect_delay_ms, 250);
        assert_eq!(config.admission.mode, AdmissionMode::SingleShot);
        assert_eq!(config.submission.mode, SendMode::Jito);

        let pipeline = config.pipeline_config();
        assert_eq!(pipeline.buy.sol_amount, 0.2);
        assert_eq!(pipeline.seller.order.percentage, 50.0);
        assert_eq!(pipeline.seller.retry_delay, Duration::from_millis(2000));

        let executor = config.executor_config();
        assert!(executor.sell_priority_fee);
        assert_eq!(executor.sell_confirmation, ConfirmationLevel::Confirmed);
        assert_eq!(executor.confirmation.retries, 20);
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_config("/nonexistent/config.toml");
        assert!(matches!(result, Err(ConfigError::IoError(_))));
    }

    #[test]
    fn test_missing_solana_section() {
        let file = write("[trading]\nbuy_amount_sol = 0.1\n");
        assert!(matches!(load_config(file.path()), Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_inverted_band_rejected() {
        let content = format!(
            "{}\n[admission]\nmin_initial_buy_sol = 1.0\nmax_initial_buy_sol = 0.5\n",
            minimal_config()
        );
        let file = write(&content);
        assert!(matches!(
            load_config(file.path()),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_positive_stop_loss_rejected() {
        let content = format!("{}\n[exit]\nstop_loss_sol = 0.5\n", minimal_config());
        let file = write(&content);
        assert!(matches!(
            load_config(file.path()),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_relay_credentials_required() {
        let file = write(&minimal_config());
        let config = load_config(file.path()).unwrap();

        assert!(config.relay_config_with(env(&[])).is_err());

        let relay = config
            .relay_config_with(env(&[
                ("ZEROSLOT_RPC_URL", "https://ams.0slot.trade"),
                ("ZEROSLOT_RPC_API_KEY", "k"),
            ]))
            .unwrap();
        assert_eq!(
            relay.zero_slot_submit_url().as_deref(),
            Some("https://ams.0slot.trade?api-key=k")
        );
    }

    #[test]
    fn test_block_razor_and_axiom_credentials() {
        let content = format!("{}\n[submission]\nmode = \"block_razor\"\n", minimal_config());
        let config: Config = toml::from_str(&content).unwrap();
        assert!(config.relay_config_with(env(&[])).is_err());
        let relay = config
            .relay_config_with(env(&[("BLOCK_RAZOR_AUTHTOKEN", "t")]))
            .unwrap();
        assert_eq!(relay.block_razor_api_key.as_deref(), Some("t"));

        let content = format!("{}\n[submission]\nmode = \"axiom\"\n", minimal_config());
        let config: Config = toml::from_str(&content).unwrap();
        assert!(config.relay_config_with(env(&[])).is_err());
        assert!(config
            .relay_config_with(env(&[("AXIOM_REFRESH_TOKEN", "r")]))
            .is_ok());
    }

    #[test]
    fn test_direct_needs_no_credentials() {
        let content = format!("{}\n[submission]\nmode = \"direct\"\n", minimal_config());
        let config: Config = toml::from_str(&content).unwrap();
        assert!(config.relay_config_with(env(&[])).is_ok());
    }

    #[test]
    fn test_launch_source_from_str() {
        assert_eq!("Portal".parse::<LaunchSource>(), Ok(LaunchSource::Portal));
        assert_eq!("grpc".parse::<LaunchSource>(), Ok(LaunchSource::Geyser));
        assert!("ws".parse::<LaunchSource>().is_err());
    }

    #[test]
    fn test_shipped_config_is_valid() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/mainnet.toml");
        let config = load_config(path).unwrap();
        assert_eq!(config.feeds.launch_source, LaunchSource::Geyser);
        assert_eq!(config.submission.sell_confirmation, ConfirmationLevel::Finalized);
        assert_eq!(config.admission.mode, AdmissionMode::Continuous);
    }
}
