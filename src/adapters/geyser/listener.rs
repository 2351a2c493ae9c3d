//! gRPC launch listener
//!
//! Subscribes to processed, non-vote, non-failed transactions that touch the
//! venue program and forwards decoded launches onto the event bus.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use std::collections::HashMap;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use yellowstone_grpc_client::{ClientTlsConfig, GeyserGrpcClient};
use yellowstone_grpc_proto::prelude::{
    subscribe_update::UpdateOneof, CommitmentLevel, SubscribeRequest,
    SubscribeRequestFilterTransactions, SubscribeRequestPing, SubscribeUpdateTransactionInfo,
};

use crate::adapters::pump_fun::program::PROGRAM_ID;
use crate::adapters::pump_fun::{decode_launch, RawInstruction, RawTokenBalance, RawTransaction};
use crate::ports::{BotEvent, EventBus};

#[derive(Debug, Error)]
pub enum GeyserError {
    #[error("gRPC connect failed: {0}")]
    Connect(String),
    #[error("gRPC subscribe failed: {0}")]
    Subscribe(String),
    #[error("gRPC stream error: {0}")]
    Stream(String),
}

#[derive(Debug, Clone)]
pub struct GeyserConfig {
    pub endpoint: String,
    pub x_token: Option<String>,
    pub reconnect_delay: Duration,
}

pub struct GeyserListener {
    config: GeyserConfig,
    bus: EventBus,
    shutdown: AtomicBool,
    reconnect_count: AtomicU32,
}

impl GeyserListener {
    pub fn new(config: GeyserConfig, bus: EventBus) -> Self {
        Self {
            config,
            bus,
            shutdown: AtomicBool::new(false),
            reconnect_count: AtomicU32::new(0),
        }
    }

    pub fn reconnect_count(&self) -> u32 {
        self.reconnect_count.load(Ordering::Relaxed)
    }

    pub fn start(self: &Arc<Self>) -> JoinHandle<()> {
        let listener = Arc::clone(self);
        tokio::spawn(async move { listener.run().await })
    }

    /// Stop after the current stream ends. Aborting the task stops it at once.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    pub async fn run(&self) {
        info!("Geyser listener connecting to {}", self.config.endpoint);

        while !self.shutdown.load(Ordering::Relaxed) {
            match self.stream_once().await {
                Ok(()) => warn!("Geyser stream ended"),
                Err(e) => error!("Geyser stream error: {}", e),
            }
            if self.shutdown.load(Ordering::Relaxed) {
                break;
            }

            let attempt = self.reconnect_count.fetch_add(1, Ordering::Relaxed) + 1;
            warn!(
                attempt,
                "Reconnecting to geyser in {}ms",
                self.config.reconnect_delay.as_millis()
            );
            tokio::time::sleep(self.config.reconnect_delay).await;
        }

        info!("Geyser listener stopped");
    }

    async fn stream_once(&self) -> Result<(), GeyserError> {
        let mut client = GeyserGrpcClient::build_from_shared(self.config.endpoint.clone())
            .map_err(|e| GeyserError::Connect(e.to_string()))?
            .x_token(self.config.x_token.clone())
            .map_err(|e| GeyserError::Connect(e.to_string()))?
            .tls_config(ClientTlsConfig::new().with_native_roots())
            .map_err(|e| GeyserError::Connect(e.to_string()))?
            .connect()
            .await
            .map_err(|e| GeyserError::Connect(e.to_string()))?;

        let (mut sink, mut stream) = client
            .subscribe_with_request(Some(launch_subscription()))
            .await
            .map_err(|e| GeyserError::Subscribe(e.to_string()))?;

        info!("Geyser subscription active");
        self.reconnect_count.store(0, Ordering::Relaxed);

        while let Some(update) = stream.next().await {
            if self.shutdown.load(Ordering::Relaxed) {
                return Ok(());
            }
            let update = update.map_err(|e| GeyserError::Stream(e.to_string()))?;

            match update.update_oneof {
                Some(UpdateOneof::Transaction(tx)) => {
                    let Some(raw) = tx.transaction.and_then(convert_transaction) else {
                        continue;
                    };
                    if let Some(launch) = decode_launch(&raw) {
                        debug!(mint = %launch.mint, signature = %raw.signature, "Launch decoded");
                        self.bus.emit(BotEvent::LaunchDetected(launch));
                    }
                }
                Some(UpdateOneof::Ping(_)) => {
                    sink.send(SubscribeRequest {
                        ping: Some(SubscribeRequestPing { id: 1 }),
                        ..Default::default()
                    })
                    .await
                    .map_err(|e| GeyserError::Stream(e.to_string()))?;
                }
                _ => {}
            }
        }

        Ok(())
    }
}

/// Processed transactions touching the venue program, votes and failures excluded
pub fn launch_subscription() -> SubscribeRequest {
    let mut transactions = HashMap::new();
    transactions.insert(
        "pump".to_string(),
        SubscribeRequestFilterTransactions {
            vote: Some(false),
            failed: Some(false),
            account_include: vec![PROGRAM_ID.to_string()],
            ..Default::default()
        },
    );

    SubscribeRequest {
        transactions,
        commitment: Some(CommitmentLevel::Processed as i32),
        ..Default::default()
    }
}

/// Flatten a gRPC transaction update into the decoder's input.
/// `None` when the message or meta is missing.
pub fn convert_transaction(info: SubscribeUpdateTransactionInfo) -> Option<RawTransaction> {
    let message = info.transaction?.message?;
    let meta = info.meta?;

    let account_keys = message
        .account_keys
        .iter()
        .chain(meta.loaded_writable_addresses.iter())
        .chain(meta.loaded_readonly_addresses.iter())
        .map(|key| bs58::encode(key).into_string())
        .collect();

    let instructions = message
        .instructions
        .into_iter()
        .map(|ix| RawInstruction {
            program_id_index: ix.program_id_index,
            accounts: ix.accounts,
            data: ix.data,
        })
        .collect();

    let post_token_balances = meta
        .post_token_balances
        .into_iter()
        .map(|balance| RawTokenBalance {
            account_index: balance.account_index,
            mint: balance.mint,
            owner: balance.owner,
            ui_amount: balance.ui_token_amount.map(|a| a.ui_amount).unwrap_or(0.0),
        })
        .collect();

    Some(RawTransaction {
        signature: bs58::encode(&info.signature).into_string(),
        account_keys,
        instructions,
        log_messages: meta.log_messages,
        post_balances: meta.post_balances,
        post_token_balances,
    })
}
