//! curve-sniper - pump.fun Launch Sniper
//!
//! Wires the launch feed, admission filter, venue executor and exit monitor
//! into one pipeline and runs it until Ctrl+C.

use anyhow::{bail, Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{fmt, EnvFilter};

use curve_sniper::adapters::auth::AuthSession;
use curve_sniper::adapters::cli::{
    self, format_record, log_directive, recent, Command, HistoryCmd, HistorySummary, RunCmd,
    StatusCmd,
};
use curve_sniper::adapters::geyser::{GeyserConfig, GeyserListener};
use curve_sniper::adapters::history::JsonHistoryLog;
use curve_sniper::adapters::pump_fun::{PortalConfig, PortalFeed, PumpFunExecutor};
use curve_sniper::adapters::relay::{RelayClient, SendMode};
use curve_sniper::adapters::solana::{BlockhashCache, SolanaClient, WalletError, WalletManager};
use curve_sniper::application::SniperOrchestrator;
use curve_sniper::config::{load_config, Config, LaunchSource};
use curve_sniper::domain::{AdmissionFilter, AdmissionMode, PositionManager, LAMPORTS_PER_SOL};
use curve_sniper::ports::{EventBus, HistoryPort};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (secrets go here, not in the config file)
    dotenvy::dotenv().ok();

    let app = cli::init();

    let config_path = app.command.config_path().to_path_buf();
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path.display()))?;

    init_logging(app.verbose, app.debug, &config.logging.level)?;

    match app.command {
        Command::Run(cmd) => run_command(cmd, config).await,
        Command::Status(cmd) => status_command(cmd, config).await,
        Command::History(cmd) => history_command(cmd, config).await,
    }
}

/// `RUST_LOG` wins when set; otherwise the CLI flags, then `[logging].level`
fn init_logging(verbose: bool, debug: bool, configured: &str) -> Result<()> {
    let filter = match std::env::var("RUST_LOG") {
        Ok(directive) if !directive.trim().is_empty() => EnvFilter::try_new(directive)
            .context("Invalid RUST_LOG directive")?,
        _ => EnvFilter::try_new(log_directive(verbose, debug, configured))
            .context("Invalid logging.level")?,
    };

    fmt().with_env_filter(filter).with_target(false).init();
    Ok(())
}

async fn run_command(cmd: RunCmd, config: Config) -> Result<()> {
    tracing::info!("Starting curve-sniper...");

    let source = cmd.source.unwrap_or(config.feeds.launch_source);
    let wallet = Arc::new(load_wallet(&config)?);
    tracing::info!("Wallet: {}", wallet.public_key());

    // Submission stack
    let rpc = SolanaClient::new(config.solana.get_rpc_url());
    let relay_config = config
        .relay_config()
        .context("Relay credentials missing for the selected submission mode")?;
    let mode = relay_config.mode;
    let mut relay = RelayClient::new(relay_config).context("Failed to create relay client")?;

    let mut background = Vec::new();

    if mode.needs_auth_session() {
        let token = std::env::var("AXIOM_REFRESH_TOKEN")
            .context("AXIOM_REFRESH_TOKEN is required for axiom mode")?;
        let session = Arc::new(AuthSession::new(token));
        if let Err(e) = session.refresh().await {
            tracing::warn!("Initial Axiom session refresh failed: {}", e);
        }
        background.push(session.start(Duration::from_millis(config.connection.auth_refresh_ms)));
        relay = relay.with_auth(session);
    }

    let mut cache = BlockhashCache::new(
        rpc.clone(),
        Duration::from_millis(config.connection.blockhash_refresh_ms),
    );
    if mode == SendMode::ZeroSlot {
        cache = cache.with_relay_warmup(
            relay.clone(),
            Duration::from_millis(config.connection.relay_warm_interval_ms),
        );
    }
    let blockhash = Arc::new(cache);
    blockhash
        .refresh()
        .await
        .context("Failed to fetch an initial blockhash")?;
    background.push(blockhash.start());

    // Feeds
    let (bus, events) = EventBus::channel();

    let portal = Arc::new(PortalFeed::new(
        PortalConfig {
            ws_url: config.feeds.portal_ws_url.clone(),
            forward_launches: source == LaunchSource::Portal,
        },
        bus.clone(),
    ));
    background.push(portal.start());

    let geyser = match source {
        LaunchSource::Geyser => {
            let endpoint = match config.feeds.get_grpc_url() {
                Some(url) => url,
                None => bail!(
                    "The geyser launch source needs a gRPC endpoint.\n\n\
                     Set GRPC_URL in your environment or 'grpc_url' under [feeds],\n\
                     or run with --source portal."
                ),
            };
            let listener = Arc::new(GeyserListener::new(
                GeyserConfig {
                    endpoint,
                    x_token: config.feeds.get_grpc_token(),
                    reconnect_delay: Duration::from_millis(config.feeds.reconnect_delay_ms),
                },
                bus.clone(),
            ));
            background.push(listener.start());
            Some(listener)
        }
        LaunchSource::Portal => None,
    };

    // Pipeline
    let history = Arc::new(JsonHistoryLog::new(config.history.get_path()));
    let positions = Arc::new(PositionManager::new(config.trading.get_max_positions()));
    let executor = Arc::new(PumpFunExecutor::new(
        wallet,
        rpc,
        relay,
        blockhash,
        config.executor_config(),
    ));

    let filter = if cmd.single_shot {
        AdmissionFilter::new(config.admission_filter().band(), AdmissionMode::SingleShot)
    } else {
        config.admission_filter()
    };

    tracing::info!(
        "Launch source {:?}, submission {}, history {}",
        source,
        mode,
        history.path().display()
    );

    let mut orchestrator = SniperOrchestrator::new(
        config.pipeline_config(),
        filter,
        positions,
        executor,
        portal.clone(),
        history,
        bus,
        events,
    );

    // Setup Ctrl+C handler
    let stop = orchestrator.stop_handle();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Shutdown signal received");
        stop.stop();
    });

    let result = orchestrator.run().await;

    if let Some(listener) = geyser {
        listener.shutdown();
    }
    portal.shutdown();
    for handle in background {
        handle.abort();
    }

    let status = orchestrator.status();
    if status.open_positions > 0 {
        tracing::warn!(
            "Stopped with {} open positions ({} stuck); they were not sold",
            status.open_positions,
            status.stuck_positions
        );
    }

    result.context("Pipeline stopped unexpectedly")?;
    tracing::info!("curve-sniper stopped");
    Ok(())
}

async fn status_command(_cmd: StatusCmd, config: Config) -> Result<()> {
    let wallet = load_wallet(&config)?;
    let solana = SolanaClient::new(config.solana.get_rpc_url());

    let balance = solana
        .get_balance(&wallet.pubkey())
        .await
        .context("Failed to get balance")?;

    let history = JsonHistoryLog::new(config.history.get_path());
    let records = history.load().await.context("Failed to read trade history")?;

    println!("Wallet: {}", wallet.public_key());
    println!(
        "Balance: {} lamports ({:.4} SOL)",
        balance,
        balance as f64 / LAMPORTS_PER_SOL
    );
    println!("History: {} closed trades in {}", records.len(), history.path().display());

    Ok(())
}

async fn history_command(cmd: HistoryCmd, config: Config) -> Result<()> {
    let history = JsonHistoryLog::new(config.history.get_path());
    let records = history.load().await.context("Failed to read trade history")?;

    if records.is_empty() {
        println!("No closed trades in {}", history.path().display());
        return Ok(());
    }

    for record in recent(&records, cmd.limit) {
        println!("{}", format_record(record));
    }

    let summary = HistorySummary::from_records(&records);
    println!();
    println!(
        "{} trades, {} wins ({:.1}%)",
        summary.trades,
        summary.wins,
        summary.win_rate()
    );
    println!(
        "Invested {:.4} SOL, realized {:.4} SOL, net {:+.4} SOL ({:+.2}%)",
        summary.invested_sol,
        summary.realized_sol,
        summary.net_sol(),
        summary.gain_pct()
    );

    Ok(())
}

/// `PRIVATE_KEY` first, then the keypair file, with helpful error messages
fn load_wallet(config: &Config) -> Result<WalletManager> {
    let private_key = config.solana.private_key();
    let keypair_path = config.solana.get_keypair_path();

    WalletManager::load(private_key.as_deref(), &keypair_path).map_err(|e| match e {
        WalletError::NotFound(path) => anyhow::anyhow!(
            "Wallet file not found: {}\n\n\
             To create a new wallet, run:\n  \
             solana-keygen new --outfile {}\n\n\
             Or set PRIVATE_KEY, or update 'keypair_path' in your config file",
            path.display(),
            path.display()
        ),
        WalletError::Read { path, source } => anyhow::anyhow!(
            "Cannot access wallet file '{}': {}\n\n\
             Check file permissions and ensure the path is correct.",
            path.display(),
            source
        ),
        WalletError::InvalidBase58(reason) => anyhow::anyhow!(
            "PRIVATE_KEY is set but is not valid base58: {}\n\n\
             Expected the 64-byte secret key exported by your wallet, base58 encoded.",
            reason
        ),
        other => anyhow::anyhow!(
            "Failed to load wallet: {}\n\n\
             Expected a JSON array of 64 bytes (e.g., [1,2,3,...]) in '{}', \
             or a base58 secret key in PRIVATE_KEY.",
            other,
            keypair_path.display()
        ),
    })
}
