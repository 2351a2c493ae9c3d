pub mod blockhash;
pub mod rpc;
pub mod wallet;

pub use blockhash::BlockhashCache;
pub use rpc::{SolanaClient, SolanaClientError};
pub use wallet::{WalletError, WalletManager};
