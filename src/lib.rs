//! # a3s-audit
//!
//! Asynchronous audit-log ingestion for the A3S ecosystem.
//!
//! ## Overview
//!
//! `a3s-audit` decouples request handling from audit persistence. Handlers
//! push operation, data change, login and access records into a bounded
//! in-memory buffer; a fixed pool of worker tasks writes them to a pluggable
//! sink. Producers never wait: when the buffer is full the record is dropped
//! and counted. Stopping the pipeline drains whatever is still buffered.
//!
//! ## Quick Start
//!
//! ```rust
//! use a3s_audit::{AuditPipeline, LoginLog, LoginStatus, MemorySink, PipelineConfig};
//! use std::sync::Arc;
//!
//! # async fn example() -> a3s_audit::Result<()> {
//! let sink = Arc::new(MemorySink::new());
//! let pipeline = AuditPipeline::new(PipelineConfig::default(), sink.clone())?;
//! pipeline.start().await?;
//!
//! pipeline.push_login(LoginLog::new("u-1", "alice", LoginStatus::Success));
//!
//! pipeline.stop().await;
//! assert_eq!(sink.logins().await.len(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Sinks
//!
//! - **memory** — in-memory sink for testing and single-process use
//! - **jsonl** — JSON Lines files, one per audit table
//!
//! ## Architecture
//!
//! - **LogEntry** — one record of exactly one kind
//! - **BoundedBuffer** — fixed-capacity MPMC FIFO, non-blocking enqueue
//! - **AuditSink** trait — one insert operation per kind
//! - **Diagnostics** trait — where drops and sink failures are reported
//! - **AuditPipeline** — lifecycle, worker pool and producer API

pub mod buffer;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod pipeline;
pub mod sink;
pub mod types;

// Re-export core types
pub use buffer::{BoundedBuffer, Rejected};
pub use config::PipelineConfig;
pub use diagnostics::{
    DiagnosticRecord, Diagnostics, DropReason, MemoryDiagnostics, PipelineEvent,
    TracingDiagnostics,
};
pub use error::{AuditError, Result};
pub use pipeline::{AuditPipeline, PipelineState, PipelineStats, PushOutcome};
pub use sink::{persist_entry, AuditSink};
pub use types::{
    AccessLog, ClientInfo, DataAction, DataChangeLog, LogEntry, LogKind, LoginLog, LoginStatus,
    OperationLog,
};

// Re-export sinks for convenience
pub use sink::file::JsonlFileSink;
pub use sink::memory::MemorySink;
