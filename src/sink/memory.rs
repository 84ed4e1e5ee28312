//! In-memory audit sink for development and testing

use crate::error::{AuditError, Result};
use crate::sink::AuditSink;
use crate::types::{AccessLog, DataChangeLog, LogKind, LoginLog, OperationLog};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory sink keeping every persisted record per kind
///
/// Individual kinds can be switched into a failing mode to simulate a
/// storage outage.
#[derive(Default)]
pub struct MemorySink {
    operations: Arc<RwLock<Vec<OperationLog>>>,
    data_changes: Arc<RwLock<Vec<DataChangeLog>>>,
    logins: Arc<RwLock<Vec<LoginLog>>>,
    accesses: Arc<RwLock<Vec<AccessLog>>>,
    failing: std::sync::RwLock<HashSet<LogKind>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every insert of `kind` fail until [`recover_kind`](Self::recover_kind)
    pub fn fail_kind(&self, kind: LogKind) -> Result<()> {
        let mut failing = self.failing.write().map_err(|e| {
            AuditError::Config(format!("Failed to acquire sink lock: {}", e))
        })?;
        failing.insert(kind);
        Ok(())
    }

    /// Resume accepting inserts of `kind`
    pub fn recover_kind(&self, kind: LogKind) -> Result<()> {
        let mut failing = self.failing.write().map_err(|e| {
            AuditError::Config(format!("Failed to acquire sink lock: {}", e))
        })?;
        failing.remove(&kind);
        Ok(())
    }

    fn check(&self, kind: LogKind) -> Result<()> {
        let failing = self.failing.read().map_err(|e| {
            AuditError::persistence(kind, format!("Failed to acquire sink lock: {}", e))
        })?;
        if failing.contains(&kind) {
            return Err(AuditError::persistence(kind, "simulated storage outage"));
        }
        Ok(())
    }

    pub async fn operations(&self) -> Vec<OperationLog> {
        self.operations.read().await.clone()
    }

    pub async fn data_changes(&self) -> Vec<DataChangeLog> {
        self.data_changes.read().await.clone()
    }

    pub async fn logins(&self) -> Vec<LoginLog> {
        self.logins.read().await.clone()
    }

    pub async fn accesses(&self) -> Vec<AccessLog> {
        self.accesses.read().await.clone()
    }

    /// Number of persisted records of one kind
    pub async fn count(&self, kind: LogKind) -> usize {
        match kind {
            LogKind::Operation => self.operations.read().await.len(),
            LogKind::DataChange => self.data_changes.read().await.len(),
            LogKind::Login => self.logins.read().await.len(),
            LogKind::Access => self.accesses.read().await.len(),
        }
    }

    /// Number of persisted records across all kinds
    pub async fn total(&self) -> usize {
        let mut total = 0;
        for kind in LogKind::ALL {
            total += self.count(kind).await;
        }
        total
    }
}

#[async_trait]
impl AuditSink for MemorySink {
    async fn persist_operation(&self, log: &OperationLog) -> Result<()> {
        self.check(LogKind::Operation)?;
        self.operations.write().await.push(log.clone());
        Ok(())
    }

    async fn persist_data_change(&self, log: &DataChangeLog) -> Result<()> {
        self.check(LogKind::DataChange)?;
        self.data_changes.write().await.push(log.clone());
        Ok(())
    }

    async fn persist_login(&self, log: &LoginLog) -> Result<()> {
        self.check(LogKind::Login)?;
        self.logins.write().await.push(log.clone());
        Ok(())
    }

    async fn persist_access(&self, log: &AccessLog) -> Result<()> {
        self.check(LogKind::Access)?;
        self.accesses.write().await.push(log.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::persist_entry;
    use crate::types::{DataAction, LogEntry, LoginStatus};

    #[tokio::test]
    async fn test_routes_by_kind() {
        let sink = MemorySink::new();
        let entries: Vec<LogEntry> = vec![
            OperationLog::new("t-1", "u", "1", "GET", "/", 200, 1).into(),
            DataChangeLog::new("t-1", "m", "r", DataAction::Delete, "u").into(),
            LoginLog::new("u", "alice", LoginStatus::Success).into(),
            AccessLog::new("t-2", "GET", "/", 200, 1).into(),
            AccessLog::new("t-3", "GET", "/", 404, 1).into(),
        ];
        for entry in &entries {
            persist_entry(&sink, entry).await.unwrap();
        }

        assert_eq!(sink.count(LogKind::Operation).await, 1);
        assert_eq!(sink.count(LogKind::DataChange).await, 1);
        assert_eq!(sink.count(LogKind::Login).await, 1);
        assert_eq!(sink.count(LogKind::Access).await, 2);
        assert_eq!(sink.total().await, 5);
        assert_eq!(sink.logins().await[0].account, "alice");
        assert_eq!(sink.data_changes().await[0].action, DataAction::Delete);
    }

    #[tokio::test]
    async fn test_fail_and_recover() {
        let sink = MemorySink::new();
        sink.fail_kind(LogKind::Login).unwrap();

        let login = LoginLog::new("u", "bob", LoginStatus::Fail);
        let err = sink.persist_login(&login).await.unwrap_err();
        assert!(matches!(
            err,
            AuditError::Persistence {
                kind: LogKind::Login,
                ..
            }
        ));

        // Other kinds unaffected
        sink.persist_access(&AccessLog::new("t", "GET", "/", 200, 1))
            .await
            .unwrap();

        sink.recover_kind(LogKind::Login).unwrap();
        sink.persist_login(&login).await.unwrap();
        assert_eq!(sink.count(LogKind::Login).await, 1);
        assert_eq!(sink.operations().await.len(), 0);
        assert_eq!(sink.accesses().await.len(), 1);
    }
}
