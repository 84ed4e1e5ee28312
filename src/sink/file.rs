//! JSON Lines file sink
//!
//! Appends each record as one JSON line to `<dir>/<table>.jsonl`, one file
//! per log kind. Useful as a local fallback when no database is wired in.

use crate::error::{AuditError, Result};
use crate::sink::AuditSink;
use crate::types::{AccessLog, DataChangeLog, LogKind, LoginLog, OperationLog};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// File-backed sink writing JSON Lines per table
pub struct JsonlFileSink {
    dir: PathBuf,

    /// Serializes appends so lines from concurrent workers never interleave
    write_lock: Mutex<()>,
}

impl JsonlFileSink {
    /// Create a sink writing under `dir` (created on first write)
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Get the output directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding records of one kind
    pub fn path_for(&self, kind: LogKind) -> PathBuf {
        self.dir.join(format!("{}.jsonl", kind.table_name()))
    }

    async fn append<T: Serialize>(&self, kind: LogKind, record: &T) -> Result<()> {
        let mut line = serde_json::to_vec(record)
            .map_err(|e| AuditError::persistence(kind, format!("encode failed: {}", e)))?;
        line.push(b'\n');

        let path = self.path_for(kind);
        let _guard = self.write_lock.lock().await;

        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            AuditError::persistence(
                kind,
                format!("Failed to create directory {}: {}", self.dir.display(), e),
            )
        })?;

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| {
                AuditError::persistence(kind, format!("Failed to open {}: {}", path.display(), e))
            })?;

        file.write_all(&line).await.map_err(|e| {
            AuditError::persistence(kind, format!("Failed to append to {}: {}", path.display(), e))
        })?;
        file.flush().await.map_err(|e| {
            AuditError::persistence(kind, format!("Failed to flush {}: {}", path.display(), e))
        })?;

        tracing::trace!(kind = %kind, path = %path.display(), "Audit record appended");
        Ok(())
    }

    /// Read back every record of one kind; a missing file yields no records
    pub async fn read_all<T: DeserializeOwned>(&self, kind: LogKind) -> Result<Vec<T>> {
        let path = self.path_for(kind);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(AuditError::from))
            .collect()
    }
}

#[async_trait]
impl AuditSink for JsonlFileSink {
    async fn persist_operation(&self, log: &OperationLog) -> Result<()> {
        self.append(LogKind::Operation, log).await
    }

    async fn persist_data_change(&self, log: &DataChangeLog) -> Result<()> {
        self.append(LogKind::DataChange, log).await
    }

    async fn persist_login(&self, log: &LoginLog) -> Result<()> {
        self.append(LogKind::Login, log).await
    }

    async fn persist_access(&self, log: &AccessLog) -> Result<()> {
        self.append(LogKind::Access, log).await
    }

    fn name(&self) -> &str {
        "jsonl"
    }
}
