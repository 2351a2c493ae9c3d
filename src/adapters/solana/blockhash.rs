//! Background blockhash refresh
//!
//! Keeps a recent blockhash on hand so transaction building never waits on
//! RPC, and keeps the relay connection warm on its own timer.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use solana_sdk::hash::Hash;
use tokio::task::JoinHandle;

use crate::adapters::relay::RelayClient;

use super::rpc::{SolanaClient, SolanaClientError};

pub struct BlockhashCache {
    client: SolanaClient,
    relay: Option<RelayClient>,
    hash: RwLock<Option<Hash>>,
    refresh_interval: Duration,
    warm_interval: Duration,
}

impl BlockhashCache {
    pub fn new(client: SolanaClient, refresh_interval: Duration) -> Self {
        Self {
            client,
            relay: None,
            hash: RwLock::new(None),
            refresh_interval,
            warm_interval: Duration::from_secs(15),
        }
    }

    /// Also ping `relay` every `interval`
    pub fn with_relay_warmup(mut self, relay: RelayClient, interval: Duration) -> Self {
        self.relay = Some(relay);
        self.warm_interval = interval;
        self
    }

    /// Most recent cached hash
    pub fn cached(&self) -> Option<Hash> {
        *self.hash.read()
    }

    /// Cached hash, or a fresh one if nothing is cached yet
    pub async fn latest(&self) -> Result<Hash, SolanaClientError> {
        match self.cached() {
            Some(hash) => Ok(hash),
            None => self.refresh().await,
        }
    }

    pub async fn refresh(&self) -> Result<Hash, SolanaClientError> {
        let hash = self.client.get_latest_blockhash().await?;
        *self.hash.write() = Some(hash);
        Ok(hash)
    }

    /// Spawn the refresh loop. Errors keep the previous hash.
    pub fn start(self: &Arc<Self>) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let mut refresh = tokio::time::interval(cache.refresh_interval);
            let mut warm = tokio::time::interval(cache.warm_interval);

            loop {
                tokio::select! {
                    _ = refresh.tick() => {
                        if let Err(e) = cache.refresh().await {
                            tracing::warn!("Blockhash refresh failed: {}", e);
                        }
                    }
                    _ = warm.tick() => {
                        if let Some(relay) = &cache.relay {
                            if let Err(e) = relay.warm().await {
                                tracing::debug!("Relay warmup failed: {}", e);
                            }
                        }
                    }
                }
            }
        })
    }
}
