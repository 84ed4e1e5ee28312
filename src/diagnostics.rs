//! Diagnostics reporting for the audit pipeline
//!
//! The pipeline never writes drop or failure reports to a global logger;
//! it calls the `Diagnostics` implementation it was constructed with.
//! `TracingDiagnostics` forwards to `tracing`, `MemoryDiagnostics` keeps
//! the reports so tests can assert on them.

use crate::error::AuditError;
use crate::types::LogKind;
use std::sync::Mutex;

/// Why an entry was dropped before reaching the sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Buffer at capacity
    QueueFull,
    /// Pipeline not started yet, or already stopping
    NotRunning,
}

impl DropReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DropReason::QueueFull => "queue_full",
            DropReason::NotRunning => "not_running",
        }
    }
}

/// Pipeline lifecycle milestones
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    /// Workers spawned
    Started { workers: usize, capacity: usize },
    /// Stop requested, producers now rejected
    Stopping { buffered: usize },
    /// Shutdown drain finished
    Drained { persisted: usize, failed: usize },
    /// All workers released
    Stopped,
    /// Pipeline dropped while running; buffered entries abandoned
    Abandoned { buffered: usize },
}

/// Receiver of pipeline drop, failure and lifecycle reports
pub trait Diagnostics: Send + Sync {
    /// An entry was dropped on the producer side
    fn entry_dropped(&self, kind: LogKind, reason: DropReason, occupancy: usize, capacity: usize);

    /// The sink rejected an entry; the entry is gone
    fn persist_failed(&self, kind: LogKind, error: &AuditError);

    /// A lifecycle transition happened
    fn lifecycle(&self, event: PipelineEvent);
}

/// Structured `tracing` output (the default)
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn entry_dropped(&self, kind: LogKind, reason: DropReason, occupancy: usize, capacity: usize) {
        tracing::warn!(
            kind = %kind,
            reason = reason.as_str(),
            occupancy,
            capacity,
            "Audit log dropped"
        );
    }

    fn persist_failed(&self, kind: LogKind, error: &AuditError) {
        tracing::error!(kind = %kind, error = %error, "Failed to write audit log");
    }

    fn lifecycle(&self, event: PipelineEvent) {
        match event {
            PipelineEvent::Started { workers, capacity } => {
                tracing::info!(workers, capacity, "Audit log pipeline started");
            }
            PipelineEvent::Stopping { buffered } => {
                tracing::info!(buffered, "Audit log pipeline stopping");
            }
            PipelineEvent::Drained { persisted, failed } => {
                tracing::debug!(persisted, failed, "Audit log buffer drained");
            }
            PipelineEvent::Stopped => {
                tracing::info!("Audit log pipeline stopped");
            }
            PipelineEvent::Abandoned { buffered } => {
                tracing::warn!(buffered, "Audit log pipeline dropped while running");
            }
        }
    }
}

/// One recorded diagnostic
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticRecord {
    Dropped {
        kind: LogKind,
        reason: DropReason,
        occupancy: usize,
        capacity: usize,
    },
    Failed {
        kind: LogKind,
        error: String,
    },
    Lifecycle(PipelineEvent),
}

/// In-memory diagnostics for tests
#[derive(Debug, Default)]
pub struct MemoryDiagnostics {
    records: Mutex<Vec<DiagnosticRecord>>,
}

impl MemoryDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, record: DiagnosticRecord) {
        let mut records = self
            .records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        records.push(record);
    }

    /// Snapshot of everything recorded so far
    pub fn records(&self) -> Vec<DiagnosticRecord> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Drop reports only
    pub fn drops(&self) -> Vec<(LogKind, DropReason)> {
        self.records()
            .into_iter()
            .filter_map(|r| match r {
                DiagnosticRecord::Dropped { kind, reason, .. } => Some((kind, reason)),
                _ => None,
            })
            .collect()
    }

    /// Persistence failure reports only
    pub fn failures(&self) -> Vec<(LogKind, String)> {
        self.records()
            .into_iter()
            .filter_map(|r| match r {
                DiagnosticRecord::Failed { kind, error } => Some((kind, error)),
                _ => None,
            })
            .collect()
    }

    /// Lifecycle events only
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.records()
            .into_iter()
            .filter_map(|r| match r {
                DiagnosticRecord::Lifecycle(event) => Some(event),
                _ => None,
            })
            .collect()
    }
}

impl Diagnostics for MemoryDiagnostics {
    fn entry_dropped(&self, kind: LogKind, reason: DropReason, occupancy: usize, capacity: usize) {
        self.push(DiagnosticRecord::Dropped {
            kind,
            reason,
            occupancy,
            capacity,
        });
    }

    fn persist_failed(&self, kind: LogKind, error: &AuditError) {
        self.push(DiagnosticRecord::Failed {
            kind,
            error: error.to_string(),
        });
    }

    fn lifecycle(&self, event: PipelineEvent) {
        self.push(DiagnosticRecord::Lifecycle(event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_diagnostics_filters() {
        let diag = MemoryDiagnostics::new();
        diag.lifecycle(PipelineEvent::Started {
            workers: 2,
            capacity: 8,
        });
        diag.entry_dropped(LogKind::Access, DropReason::QueueFull, 8, 8);
        diag.persist_failed(
            LogKind::Login,
            &AuditError::persistence(LogKind::Login, "db down"),
        );
        diag.entry_dropped(LogKind::Operation, DropReason::NotRunning, 0, 8);

        assert_eq!(diag.records().len(), 4);
        assert_eq!(
            diag.drops(),
            vec![
                (LogKind::Access, DropReason::QueueFull),
                (LogKind::Operation, DropReason::NotRunning)
            ]
        );
        let failures = diag.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, LogKind::Login);
        assert!(failures[0].1.contains("db down"));
        assert_eq!(
            diag.events(),
            vec![PipelineEvent::Started {
                workers: 2,
                capacity: 8
            }]
        );
    }

    #[test]
    fn test_tracing_diagnostics_does_not_panic_without_subscriber() {
        let diag = TracingDiagnostics;
        diag.entry_dropped(LogKind::Login, DropReason::QueueFull, 1, 1);
        diag.persist_failed(LogKind::Login, &AuditError::Config("x".to_string()));
        diag.lifecycle(PipelineEvent::Stopped);
    }
}
