//! Audit sink trait — the durable-storage side of the pipeline
//!
//! A sink exposes one insert-style operation per log kind. Relational
//! stores, files, or remote collectors all implement `AuditSink`; the
//! pipeline only ever calls it from worker tasks or the shutdown drain.

use crate::error::Result;
use crate::types::{AccessLog, DataChangeLog, LogEntry, LoginLog, OperationLog};
use async_trait::async_trait;

pub mod file;
pub mod memory;

/// Durable storage for audit records
///
/// Implementations must be safe to call concurrently from every worker;
/// connection pooling, if any, is the sink's own business. Failures are
/// returned as values, the pipeline logs them and drops the record.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Insert one operation record
    async fn persist_operation(&self, log: &OperationLog) -> Result<()>;

    /// Insert one data change record
    async fn persist_data_change(&self, log: &DataChangeLog) -> Result<()>;

    /// Insert one login record
    async fn persist_login(&self, log: &LoginLog) -> Result<()>;

    /// Insert one access record
    async fn persist_access(&self, log: &AccessLog) -> Result<()>;

    /// Sink name (e.g., "memory", "jsonl", "postgres")
    fn name(&self) -> &str;
}

/// Route an entry to the sink operation matching its kind
pub async fn persist_entry(sink: &dyn AuditSink, entry: &LogEntry) -> Result<()> {
    match entry {
        LogEntry::Operation(log) => sink.persist_operation(log).await,
        LogEntry::DataChange(log) => sink.persist_data_change(log).await,
        LogEntry::Login(log) => sink.persist_login(log).await,
        LogEntry::Access(log) => sink.persist_access(log).await,
    }
}
