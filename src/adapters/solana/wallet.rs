use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("Keypair file not found: {0}")]
    NotFound(PathBuf),
    #[error("Failed to read keypair file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Keypair file is not a JSON byte array: {0}")]
    InvalidJson(String),
    #[error("Invalid base58 private key: {0}")]
    InvalidBase58(String),
    #[error("Invalid keypair bytes: {0}")]
    InvalidKeypair(String),
}

/// Signing wallet. Immutable once loaded; share it behind an `Arc`.
pub struct WalletManager {
    keypair: Keypair,
}

impl WalletManager {
    /// A base58 secret wins over the keypair file when both are available
    pub fn load(private_key: Option<&str>, keypair_path: &Path) -> Result<Self, WalletError> {
        match private_key {
            Some(secret) => Self::from_base58(secret),
            None => Self::from_file(keypair_path),
        }
    }

    /// Solana CLI keypair file: a JSON array of 64 bytes
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, WalletError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                WalletError::NotFound(path.to_path_buf())
            } else {
                WalletError::Read {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        let bytes: Vec<u8> = serde_json::from_str(&contents)
            .map_err(|e| WalletError::InvalidJson(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Base58 encoding of the 64-byte secret key, as wallets export it
    pub fn from_base58(encoded: &str) -> Result<Self, WalletError> {
        let bytes = bs58::decode(encoded.trim())
            .into_vec()
            .map_err(|e| WalletError::InvalidBase58(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WalletError> {
        let keypair =
            Keypair::try_from(bytes).map_err(|e| WalletError::InvalidKeypair(e.to_string()))?;
        Ok(Self { keypair })
    }

    pub fn new_random() -> Self {
        Self {
            keypair: Keypair::new(),
        }
    }

    /// Base58 address
    pub fn public_key(&self) -> String {
        self.keypair.pubkey().to_string()
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.keypair.to_bytes().to_vec()
    }
}

impl std::fmt::Debug for WalletManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletManager")
            .field("pubkey", &self.public_key())
            .finish()
    }
}
