//! JSON history log
//!
//! Append-only array of closed trades. Each append re-reads the file so
//! hand edits and concurrent readers see a complete array.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::domain::HistoryRecord;
use crate::ports::{HistoryError, HistoryPort};

/// Default history file name
pub const DEFAULT_HISTORY_FILE: &str = "token-history.json";

pub struct JsonHistoryLog {
    path: PathBuf,
    // Serializes read-modify-write cycles between parallel sells
    write_lock: Mutex<()>,
}

impl JsonHistoryLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current records; a missing or unreadable array yields an empty one
    async fn read_records(&self) -> Result<Vec<HistoryRecord>, HistoryError> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str::<Vec<HistoryRecord>>(&content) {
            Ok(records) => Ok(records),
            Err(e) => {
                warn!(path = %self.path.display(), "History file is not a record array, starting fresh: {}", e);
                Ok(Vec::new())
            }
        }
    }
}

#[async_trait]
impl HistoryPort for JsonHistoryLog {
    async fn append(&self, record: &HistoryRecord) -> Result<(), HistoryError> {
        let _guard = self.write_lock.lock().await;

        let mut records = self.read_records().await?;
        records.push(record.clone());

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(&records)?;
        fs::write(&self.path, content).await?;

        debug!(mint = %record.mint, entries = records.len(), "History appended");
        Ok(())
    }

    async fn load(&self) -> Result<Vec<HistoryRecord>, HistoryError> {
        self.read_records().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(mint: &str, gain: f64) -> HistoryRecord {
        HistoryRecord {
            mint: mint.to_string(),
            buy_signature: format!("buy-{}", mint),
            sell_signature: format!("sell-{}", mint),
            name: "Frog".to_string(),
            symbol: "FRG".to_string(),
            buy_price: 0.000000033,
            buy_sol_amount: 0.1,
            buy_time: 1_700_000_000_000,
            amount: 3_026_315_000_000,
            sell_price: 0.000000035,
            sell_sol_amount: 0.1 * (1.0 + gain / 100.0),
            sell_time: 1_700_000_004_000,
            gain,
            decimals: 6,
            buy_latency: 420,
        }
    }

    #[tokio::test]
    async fn test_append_to_missing_file() {
        let dir = tempdir().unwrap();
        let log = JsonHistoryLog::new(dir.path().join("nested").join(DEFAULT_HISTORY_FILE));

        log.append(&record("A", 5.0)).await.unwrap();
        log.append(&record("B", -20.0)).await.unwrap();

        let records = log.load().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].mint, "A");
        assert_eq!(records[1].mint, "B");
    }

    #[tokio::test]
    async fn test_invalid_json_starts_fresh() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(DEFAULT_HISTORY_FILE);
        std::fs::write(&path, "{ not an array").unwrap();

        let log = JsonHistoryLog::new(&path);
        log.append(&record("A", 1.0)).await.unwrap();

        assert_eq!(log.load().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_non_array_starts_fresh() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(DEFAULT_HISTORY_FILE);
        std::fs::write(&path, r#"{"mint": "x"}"#).unwrap();

        let log = JsonHistoryLog::new(&path);
        assert!(log.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_file_is_pretty_camel_case() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(DEFAULT_HISTORY_FILE);
        let log = JsonHistoryLog::new(&path);
        log.append(&record("A", 1.0)).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("[\n"));
        assert!(content.contains("\"buySignature\""));
        assert!(content.contains("\"sellSolAmount\""));
        assert!(content.contains("\"buyLatency\": 420"));
    }

    #[tokio::test]
    async fn test_concurrent_appends_keep_every_record() {
        let dir = tempdir().unwrap();
        let log = std::sync::Arc::new(JsonHistoryLog::new(dir.path().join(DEFAULT_HISTORY_FILE)));

        let mut handles = Vec::new();
        for i in 0..8 {
            let log = log.clone();
            handles.push(tokio::spawn(async move {
                log.append(&record(&format!("M{}", i), 0.0)).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(log.load().await.unwrap().len(), 8);
    }
}
