use async_trait::async_trait;
use thiserror::Error;

use crate::domain::HistoryRecord;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("History IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("History serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Append-only sink for closed trades
#[async_trait]
pub trait HistoryPort: Send + Sync {
    async fn append(&self, record: &HistoryRecord) -> Result<(), HistoryError>;
    async fn load(&self) -> Result<Vec<HistoryRecord>, HistoryError>;
}
