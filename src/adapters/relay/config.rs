//! Relay Configuration
//!
//! Provider selection, endpoints and the fee-account pools each relay
//! expects its priority fee to be paid into.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Relay endpoints
pub mod endpoints {
    /// BlockRazor Frankfurt ingress
    pub const BLOCK_RAZOR: &str = "http://frankfurt.solana.blockrazor.xyz:443";
    /// Axiom batched send
    pub const AXIOM: &str = "https://tx-pro.axiom.trade/batched-send-tx-v2";
    /// Jito block engine (Frankfurt)
    pub const JITO: &str = "https://frankfurt.mainnet.block-engine.jito.wtf";
}

/// Provider fee accounts. Each submission pays one address drawn at random.
pub mod fee_accounts {
    use super::SendMode;

    pub const BLOCK_RAZOR: &[&str] = &[
        "FjmZZrFvhnqqb9ThCuMVnENaM3JGVuGWNyCAxRJcFpg9",
        "6No2i3aawzHsjtThw81iq1EXPJN6rh8eSJCLaYZfKDTG",
        "A9cWowVAiHe9pJfKAj3TJiN9VpbzMUq6E4kEvf5mUT22",
        "Gywj98ophM7GmkDdaWs4isqZnDdFCW7B46TXmKfvyqSm",
        "68Pwb4jS7eZATjDfhmTXgRJjCiZmw1L7Huy4HNpnxJ3o",
        "4ABhJh5rZPjv63RBJBuyWzBK3g9gWMUQdTZP2kiW31V9",
        "B2M4NG5eyZp5SBQrSdtemzk5TqVuaWGQnowGaCBt8GyM",
        "5jA59cXMKQqZAVdtopv8q3yyw9SYfiE3vUCbt7p8MfVf",
        "5YktoWygr1Bp9wiS1xtMtUki1PeYuuzuCF98tqwYxf61",
        "295Avbam4qGShBYK7E9H5Ldew4B3WyJGmgmXfiWdeeyV",
        "EDi4rSy2LZgKJX74mbLTFk4mxoTgT6F7HxxzG2HBAFyK",
        "BnGKHAC386n4Qmv9xtpBVbRaUTKixjBe3oagkPFKtoy6",
        "Dd7K2Fp7AtoN8xCghKDRmyqr5U169t48Tw5fEd3wT9mq",
        "AP6qExwrbRgBAVaehg4b5xHENX815sMabtBzUzVB4v8S",
    ];

    /// Shared by ZeroSlot and the Axiom relay, which forwards to ZeroSlot
    pub const SLOT: &[&str] = &[
        "6fQaVhYZA4w3MBSXjJ81Vf6W1EDYeUPXpgVQ6UQyU1Av",
        "4HiwLEP2Bzqj3hM2ENxJuzhcPCdsafwiet3oGkMkuQY4",
        "7toBU3inhmrARGngC7z6SjyP85HgGMmCTEwGNRAcYnEK",
        "8mR3wB1nh4D6J9RUCugxUpc6ya8w38LPxZ3ZjcBhgzws",
        "6SiVU5WEwqfFapRuYCndomztEwDjvS5xgtEof3PLEGm9",
        "TpdxgNJBWZRL8UXF5mrEsyWxDWx9HQexA9P1eTWQ42p",
        "D8f3WkQu6dCF33cZxuAsrKHrGsqGP2yvAHf8mX6RXnwf",
    ];

    pub const JITO: &[&str] = &[
        "Cw8CFyM9FkoMi7K7Crf6HNQqf4uEMzpKw6QNghXLvLkY",
        "ADaUMid9yfUytqMBgopwjb2DTLSokTSzL1zt6iGPaS49",
        "DfXygSm4jCyNCybVYYK6DwvWqjKee8pbDmJGcLWNDXjh",
        "HFqU5x63VTqvQss8hp11i4wVV8bD44PvwucfZ2bU7gRe",
        "96gYZGLnJYVFmbjzopPSU6QiEV5fGqZNyN9nmNhvrZU5",
        "ADuUkR4vqLUMWXxW9gh6D6L8pMSawimctcNZ5pGwDcEt",
        "DttWaMuVvTiduZRnguLF7jNxTgiMBZ1hyAumKUiL2KRL",
        "3AVi9Tg9Uo68tJfuvoKvqKNWKkC5wPdSSdeBnizKZ6jT",
    ];

    /// Pool used by `mode`, if it charges a fee
    pub fn pool_for(mode: SendMode) -> Option<&'static [&'static str]> {
        match mode {
            SendMode::Direct => None,
            SendMode::BlockRazor => Some(BLOCK_RAZOR),
            SendMode::ZeroSlot | SendMode::Axiom => Some(SLOT),
            SendMode::Jito => Some(JITO),
        }
    }

    /// Pick a fee account for `mode` uniformly at random
    pub fn random_fee_account(mode: SendMode) -> Option<&'static str> {
        use rand::Rng;
        let pool = pool_for(mode)?;
        let idx = rand::thread_rng().gen_range(0..pool.len());
        Some(pool[idx])
    }
}

/// Where signed transactions are sent. One per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SendMode {
    /// Plain `sendTransaction` against the configured RPC
    Direct,
    BlockRazor,
    #[default]
    ZeroSlot,
    /// Axiom batched relay, authenticated with a session cookie pair
    Axiom,
    Jito,
}

impl SendMode {
    pub fn needs_auth_session(&self) -> bool {
        matches!(self, SendMode::Axiom)
    }
}

impl std::fmt::Display for SendMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SendMode::Direct => "direct",
            SendMode::BlockRazor => "block_razor",
            SendMode::ZeroSlot => "zero_slot",
            SendMode::Axiom => "axiom",
            SendMode::Jito => "jito",
        };
        f.write_str(name)
    }
}

/// Relay router configuration
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub mode: SendMode,
    /// RPC used for direct broadcast
    pub rpc_url: String,
    pub block_razor_url: String,
    pub block_razor_api_key: Option<String>,
    pub zero_slot_url: Option<String>,
    pub zero_slot_api_key: Option<String>,
    pub axiom_url: String,
    pub jito_url: String,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            mode: SendMode::default(),
            rpc_url: "https://api.mainnet-beta.solana.com".to_string(),
            block_razor_url: endpoints::BLOCK_RAZOR.to_string(),
            block_razor_api_key: None,
            zero_slot_url: None,
            zero_slot_api_key: None,
            axiom_url: endpoints::AXIOM.to_string(),
            jito_url: endpoints::JITO.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl RelayConfig {
    pub fn with_mode(mut self, mode: SendMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_rpc_url(mut self, url: String) -> Self {
        self.rpc_url = url;
        self
    }

    pub fn with_block_razor_key(mut self, key: String) -> Self {
        self.block_razor_api_key = Some(key);
        self
    }

    pub fn with_zero_slot(mut self, url: String, api_key: String) -> Self {
        self.zero_slot_url = Some(url);
        self.zero_slot_api_key = Some(api_key);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// ZeroSlot submission URL with the API key as query parameter
    pub fn zero_slot_submit_url(&self) -> Option<String> {
        let url = self.zero_slot_url.as_ref()?;
        let key = self.zero_slot_api_key.as_deref().unwrap_or_default();
        Some(format!("{}?api-key={}", url, key))
    }
}
