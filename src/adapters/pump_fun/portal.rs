//! Portal WebSocket Feed
//!
//! Duplex connection to `wss://pumpportal.fun/api/data`. Carries per-mint
//! trade updates for the exit monitor and, when selected as the launch
//! source, new-token notifications. Subscriptions are tracked locally and
//! replayed after every reconnect.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{Sink, SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use crate::domain::now_ms;
use crate::ports::{BotEvent, EventBus, FeedError, TradeFeedPort};

use super::types::{PortalEvent, PortalMessage, SubscribeMessage};

/// Default WebSocket URL for the portal
pub const DEFAULT_WS_URL: &str = "wss://pumpportal.fun/api/data";

/// Reconnection delay base (exponential backoff)
const RECONNECT_BASE_DELAY_MS: u64 = 1000;
/// Maximum reconnection delay
const MAX_RECONNECT_DELAY_MS: u64 = 30000;
/// Maximum message size in bytes
const MAX_MESSAGE_SIZE: usize = 1_048_576;

#[derive(Debug, Error)]
pub enum PortalError {
    #[error("WebSocket connection failed: {0}")]
    ConnectionFailed(String),

    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    #[error("Feed already running")]
    AlreadyRunning,
}

#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub ws_url: String,
    /// Subscribe to new tokens and forward them as launches
    pub forward_launches: bool,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            ws_url: DEFAULT_WS_URL.to_string(),
            forward_launches: false,
        }
    }
}

#[derive(Debug, Default)]
struct SubscriptionState {
    new_tokens: bool,
    token_trades: HashSet<String>,
}

enum PortalCommand {
    Send(SubscribeMessage),
    Shutdown,
}

pub struct PortalFeed {
    config: PortalConfig,
    bus: EventBus,
    command_tx: mpsc::UnboundedSender<PortalCommand>,
    command_rx: Mutex<Option<mpsc::UnboundedReceiver<PortalCommand>>>,
    subscriptions: RwLock<SubscriptionState>,
    reconnect_count: AtomicU32,
}

impl PortalFeed {
    pub fn new(config: PortalConfig, bus: EventBus) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let subscriptions = SubscriptionState {
            new_tokens: config.forward_launches,
            token_trades: HashSet::new(),
        };

        Self {
            config,
            bus,
            command_tx,
            command_rx: Mutex::new(Some(command_rx)),
            subscriptions: RwLock::new(subscriptions),
            reconnect_count: AtomicU32::new(0),
        }
    }

    pub fn is_subscribed(&self, mint: &str) -> bool {
        self.subscriptions.read().token_trades.contains(mint)
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().token_trades.len()
    }

    pub fn reconnect_count(&self) -> u32 {
        self.reconnect_count.load(Ordering::Relaxed)
    }

    /// Spawn the connection loop
    pub fn start(self: &Arc<Self>) -> JoinHandle<()> {
        let feed = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = feed.run().await {
                error!("Portal feed stopped: {}", e);
            }
        })
    }

    pub fn shutdown(&self) {
        let _ = self.command_tx.send(PortalCommand::Shutdown);
    }

    /// Connect, process, and reconnect with backoff until shutdown
    pub async fn run(&self) -> Result<(), PortalError> {
        let mut command_rx = self
            .command_rx
            .lock()
            .take()
            .ok_or(PortalError::AlreadyRunning)?;

        info!("Portal feed connecting to {}", self.config.ws_url);
        let mut attempts = 0u32;

        loop {
            match self.connect_and_process(&mut command_rx).await {
                Ok(true) => {
                    info!("Portal feed shut down");
                    return Ok(());
                }
                Ok(false) => warn!("Portal connection closed"),
                Err(e) => error!("Portal connection error: {}", e),
            }

            attempts += 1;
            self.reconnect_count.store(attempts, Ordering::Relaxed);
            let delay_ms = backoff_delay_ms(attempts);
            warn!("Reconnecting to portal in {}ms (attempt {})", delay_ms, attempts);

            if wait_out_backoff(&mut command_rx, Duration::from_millis(delay_ms)).await {
                return Ok(());
            }
        }
    }

    /// Returns Ok(true) when shutdown was requested
    async fn connect_and_process(
        &self,
        command_rx: &mut mpsc::UnboundedReceiver<PortalCommand>,
    ) -> Result<bool, PortalError> {
        let (ws, _) = connect_async(self.config.ws_url.as_str())
            .await
            .map_err(|e| PortalError::ConnectionFailed(e.to_string()))?;
        let (mut sink, mut stream) = ws.split();

        info!("Connected to portal");
        self.reconnect_count.store(0, Ordering::Relaxed);

        for msg in self.replay_messages() {
            send_json(&mut sink, &msg).await?;
        }

        loop {
            tokio::select! {
                cmd = command_rx.recv() => match cmd {
                    Some(PortalCommand::Send(msg)) => send_json(&mut sink, &msg).await?,
                    Some(PortalCommand::Shutdown) | None => {
                        let _ = sink.close().await;
                        return Ok(true);
                    }
                },
                frame = stream.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(event) = self.process_message(&text) {
                            self.bus.emit(event);
                        }
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        sink.send(Message::Pong(payload))
                            .await
                            .map_err(|e| PortalError::WebSocketError(e.to_string()))?;
                    }
                    Some(Ok(Message::Close(_))) | None => return Ok(false),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(PortalError::WebSocketError(e.to_string())),
                },
            }
        }
    }

    /// Control messages that restore the current subscription set
    fn replay_messages(&self) -> Vec<SubscribeMessage> {
        let subs = self.subscriptions.read();
        let mut messages = Vec::new();
        if subs.new_tokens {
            messages.push(SubscribeMessage::new_tokens());
        }
        if !subs.token_trades.is_empty() {
            let mut mints: Vec<String> = subs.token_trades.iter().cloned().collect();
            mints.sort();
            messages.push(SubscribeMessage::token_trades(mints));
        }
        messages
    }

    /// Map one inbound text frame to a pipeline event
    pub fn process_message(&self, raw: &str) -> Option<BotEvent> {
        if raw.len() > MAX_MESSAGE_SIZE {
            warn!("Portal message exceeds max size: {} bytes", raw.len());
            return None;
        }

        let parsed = match PortalMessage::parse(raw) {
            Ok(msg) => msg,
            Err(e) => {
                debug!("Unrecognised portal message: {}", e);
                return None;
            }
        };

        match parsed {
            PortalMessage::Ack { message } => {
                debug!("Portal acknowledged: {}", message);
                None
            }
            PortalMessage::Event(PortalEvent::Create(token)) => {
                if !self.subscriptions.read().new_tokens {
                    return None;
                }
                let mint = token.mint.clone();
                match token.into_launch(now_ms()) {
                    Some(launch) => Some(BotEvent::LaunchDetected(launch)),
                    None => {
                        warn!(mint = %mint, "Portal launch with invalid addresses");
                        None
                    }
                }
            }
            PortalMessage::Event(event) => {
                let trade = event.as_trade()?;
                if !self.is_subscribed(&trade.mint) {
                    return None;
                }
                debug!(mint = %trade.mint, "Trade {:+.4} SOL", trade.signed_sol());
                Some(BotEvent::TradeUpdate(trade))
            }
        }
    }

    fn send_command(&self, msg: SubscribeMessage) -> Result<(), FeedError> {
        self.command_tx
            .send(PortalCommand::Send(msg))
            .map_err(|_| FeedError::ChannelClosed)
    }
}

#[async_trait]
impl TradeFeedPort for PortalFeed {
    async fn subscribe(&self, mint: &str) -> Result<(), FeedError> {
        self.subscriptions.write().token_trades.insert(mint.to_string());
        self.send_command(SubscribeMessage::token_trades(vec![mint.to_string()]))
    }

    async fn unsubscribe(&self, mint: &str) -> Result<(), FeedError> {
        self.subscriptions.write().token_trades.remove(mint);
        self.send_command(SubscribeMessage::unsubscribe_token_trades(vec![mint.to_string()]))
    }
}

fn backoff_delay_ms(attempt: u32) -> u64 {
    std::cmp::min(
        RECONNECT_BASE_DELAY_MS * 2u64.pow(attempt.saturating_sub(1).min(10)),
        MAX_RECONNECT_DELAY_MS,
    )
}

/// Sleep for the full backoff delay. Subscription commands arriving meanwhile
/// are dropped since state is replayed on reconnect. Returns true on shutdown.
async fn wait_out_backoff(
    command_rx: &mut mpsc::UnboundedReceiver<PortalCommand>,
    delay: Duration,
) -> bool {
    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);

    loop {
        tokio::select! {
            _ = &mut sleep => return false,
            cmd = command_rx.recv() => match cmd {
                Some(PortalCommand::Send(msg)) => debug!("Deferred {} until reconnect", msg.method),
                Some(PortalCommand::Shutdown) | None => return true,
            },
        }
    }
}

async fn send_json<S>(sink: &mut S, msg: &SubscribeMessage) -> Result<(), PortalError>
where
    S: Sink<Message> + Unpin,
    <S as Sink<Message>>::Error: std::fmt::Display,
{
    let text = serde_json::to_string(msg).map_err(|e| PortalError::WebSocketError(e.to_string()))?;
    debug!("Portal -> {}", text);
    sink.send(Message::Text(text))
        .await
        .map_err(|e| PortalError::WebSocketError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::TradeSide;
    use serde_json::json;

    const MINT: &str = "7GCihgDB8fe6KNjn2MYtkzZcRjQy3t9GHdC8uHYmW2hr";

    fn feed(forward_launches: bool) -> (PortalFeed, mpsc::UnboundedReceiver<BotEvent>) {
        let (bus, rx) = EventBus::channel();
        let config = PortalConfig {
            forward_launches,
            ..PortalConfig::default()
        };
        (PortalFeed::new(config, bus), rx)
    }

    fn trade(mint: &str, side: &str, sol: f64) -> String {
        json!({"mint": mint, "solAmount": sol, "txType": side}).to_string()
    }

    #[test]
    fn test_backoff_schedule() {
        assert_eq!(backoff_delay_ms(1), 1000);
        assert_eq!(backoff_delay_ms(2), 2000);
        assert_eq!(backoff_delay_ms(5), 16000);
        assert_eq!(backoff_delay_ms(6), 30000);
        assert_eq!(backoff_delay_ms(50), 30000);
    }

    #[tokio::test]
    async fn test_backoff_not_cut_short_by_subscriptions() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        for i in 0..3 {
            tx.send(PortalCommand::Send(SubscribeMessage::token_trades(vec![format!("m{}", i)])))
                .unwrap();
        }

        let started = std::time::Instant::now();
        let shutdown = wait_out_backoff(&mut rx, Duration::from_millis(50)).await;

        assert!(!shutdown);
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_backoff_ends_on_shutdown() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(PortalCommand::Send(SubscribeMessage::new_tokens())).unwrap();
        tx.send(PortalCommand::Shutdown).unwrap();

        let shutdown = tokio::time::timeout(
            Duration::from_secs(5),
            wait_out_backoff(&mut rx, Duration::from_secs(60)),
        )
        .await
        .unwrap();
        assert!(shutdown);

        let (tx, mut rx) = mpsc::unbounded_channel::<PortalCommand>();
        drop(tx);
        assert!(wait_out_backoff(&mut rx, Duration::from_secs(60)).await);
    }

    #[tokio::test]
    async fn test_trades_forwarded_only_when_subscribed() {
        let (feed, _rx) = feed(false);
        assert!(feed.process_message(&trade(MINT, "buy", 0.3)).is_none());

        feed.subscribe(MINT).await.unwrap();
        match feed.process_message(&trade(MINT, "sell", 0.3)) {
            Some(BotEvent::TradeUpdate(t)) => {
                assert_eq!(t.mint, MINT);
                assert_eq!(t.side, TradeSide::Sell);
            }
            other => panic!("unexpected {:?}", other),
        }

        feed.unsubscribe(MINT).await.unwrap();
        assert!(feed.process_message(&trade(MINT, "buy", 0.3)).is_none());
        assert_eq!(feed.subscription_count(), 0);
    }

    #[test]
    fn test_ack_is_silent() {
        let (feed, _rx) = feed(true);
        assert!(feed
            .process_message(r#"{"message":"Successfully subscribed to token creation events."}"#)
            .is_none());
    }

    #[test]
    fn test_launch_forwarding_follows_config() {
        let create = json!({
            "mint": MINT,
            "txType": "create",
            "traderPublicKey": "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM",
            "solAmount": 0.5,
            "bondingCurveKey": "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
            "vTokensInBondingCurve": 1_055_000_000.0,
            "vSolInBondingCurve": 30.5,
            "name": "Frog",
            "symbol": "FRG",
            "uri": ""
        })
        .to_string();

        let (off, _rx) = feed(false);
        assert!(off.process_message(&create).is_none());

        let (on, _rx) = feed(true);
        match on.process_message(&create) {
            Some(BotEvent::LaunchDetected(launch)) => assert_eq!(launch.symbol, "FRG"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_garbage_and_oversized_ignored() {
        let (feed, _rx) = feed(true);
        assert!(feed.process_message("").is_none());
        assert!(feed.process_message("{broken").is_none());
        assert!(feed
            .process_message(&"x".repeat(MAX_MESSAGE_SIZE + 1))
            .is_none());
    }

    #[tokio::test]
    async fn test_replay_restores_subscriptions() {
        let (feed, _rx) = feed(true);
        feed.subscribe("b").await.unwrap();
        feed.subscribe("a").await.unwrap();

        let replay = feed.replay_messages();
        assert_eq!(replay[0], SubscribeMessage::new_tokens());
        assert_eq!(
            replay[1],
            SubscribeMessage::token_trades(vec!["a".to_string(), "b".to_string()])
        );
    }

    #[tokio::test]
    async fn test_second_run_rejected() {
        let (feed, _rx) = feed(false);
        feed.command_rx.lock().take();
        assert!(matches!(feed.run().await, Err(PortalError::AlreadyRunning)));
    }
}
