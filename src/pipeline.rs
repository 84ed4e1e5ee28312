//! Audit pipeline controller
//!
//! `AuditPipeline` owns the bounded buffer and a fixed pool of worker tasks.
//! Producers push entries without ever waiting; workers take entries off the
//! buffer and hand them to the sink. Delivery is at-most-once: a full buffer,
//! a pipeline that is not running, or a failing sink all drop the entry and
//! report it through [`Diagnostics`].
//!
//! Lifecycle: `Created` → `Running` → `Stopping` → `Stopped`.

use crate::buffer::{BoundedBuffer, Rejected};
use crate::config::PipelineConfig;
use crate::diagnostics::{Diagnostics, DropReason, PipelineEvent, TracingDiagnostics};
use crate::error::{AuditError, Result};
use crate::sink::{persist_entry, AuditSink};
use crate::types::{AccessLog, DataChangeLog, LogEntry, LogKind, LoginLog, OperationLog};
use futures::FutureExt;
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Lifecycle state of a pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PipelineState {
    Created = 0,
    Running = 1,
    Stopping = 2,
    Stopped = 3,
}

impl PipelineState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => PipelineState::Created,
            1 => PipelineState::Running,
            2 => PipelineState::Stopping,
            _ => PipelineState::Stopped,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineState::Created => "created",
            PipelineState::Running => "running",
            PipelineState::Stopping => "stopping",
            PipelineState::Stopped => "stopped",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to a pushed entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Entry is in the buffer
    Accepted,
    /// Entry was discarded and counted
    Dropped(DropReason),
}

impl PushOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, PushOutcome::Accepted)
    }

    pub fn is_dropped(&self) -> bool {
        !self.is_accepted()
    }
}

/// Point-in-time pipeline counters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineStats {
    pub state: PipelineState,
    /// Entries accepted into the buffer
    pub accepted: u64,
    /// Entries the sink stored
    pub persisted: u64,
    /// Entries the sink rejected
    pub failed: u64,
    /// Entries dropped because the buffer was full
    pub dropped_full: u64,
    /// Entries dropped because the pipeline was not running
    pub dropped_not_running: u64,
    /// Entries currently buffered
    pub occupancy: usize,
    pub capacity: usize,
    /// Configured worker count
    pub workers: usize,
    /// Worker tasks still alive
    pub active_workers: usize,
}

impl PipelineStats {
    /// Total entries dropped on the producer side
    pub fn dropped(&self) -> u64 {
        self.dropped_full + self.dropped_not_running
    }
}

#[derive(Debug, Default)]
struct Counters {
    accepted: AtomicU64,
    persisted: AtomicU64,
    failed: AtomicU64,
    dropped_full: AtomicU64,
    dropped_not_running: AtomicU64,
}

/// State shared between the controller and its workers
struct Shared {
    buffer: BoundedBuffer,
    sink: Arc<dyn AuditSink>,
    diagnostics: Arc<dyn Diagnostics>,
    counters: Counters,
    active_workers: AtomicUsize,
}

impl Shared {
    /// Hand one entry to the sink; returns whether it was stored
    ///
    /// The entry is released when this returns, stored or not.
    async fn persist(&self, entry: LogEntry) -> bool {
        let kind = entry.kind();
        let result = AssertUnwindSafe(persist_entry(self.sink.as_ref(), &entry))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(AuditError::persistence(kind, panic_reason(panic))));

        match result {
            Ok(()) => {
                self.counters.persisted.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(e) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                self.diagnostics.persist_failed(kind, &e);
                false
            }
        }
    }
}

fn panic_reason(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("sink panicked: {}", msg)
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("sink panicked: {}", msg)
    } else {
        "sink panicked".to_string()
    }
}

/// Decrements the live-worker count when a worker exits, however it exits
struct WorkerGuard(Arc<Shared>);

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        self.0.active_workers.fetch_sub(1, Ordering::SeqCst);
    }
}

async fn run_worker(id: usize, shared: Arc<Shared>, cancel: CancellationToken) {
    let _guard = WorkerGuard(shared.clone());
    let mut processed: u64 = 0;

    loop {
        let entry = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            entry = shared.buffer.dequeue() => entry,
        };

        match entry {
            Some(entry) => {
                shared.persist(entry).await;
                processed += 1;
            }
            None => break, // buffer closed and empty
        }
    }

    tracing::debug!(worker = id, processed, "Audit log worker exited");
}

/// Asynchronous audit-log ingestion pipeline
///
/// Thread-safe: share it behind an `Arc` with every request handler.
/// `push_*` methods are synchronous and never wait, so they are safe to
/// call from async handlers and from plain threads alike.
pub struct AuditPipeline {
    config: PipelineConfig,
    shared: Arc<Shared>,
    state: AtomicU8,
    cancel: CancellationToken,

    /// Worker handles; the lock also serializes start/stop
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl AuditPipeline {
    /// Create a pipeline reporting through `tracing`
    pub fn new(config: PipelineConfig, sink: Arc<dyn AuditSink>) -> Result<Self> {
        config.validate()?;
        let shared = Shared {
            buffer: BoundedBuffer::new(config.capacity),
            sink,
            diagnostics: Arc::new(TracingDiagnostics),
            counters: Counters::default(),
            active_workers: AtomicUsize::new(0),
        };

        Ok(Self {
            config,
            shared: Arc::new(shared),
            state: AtomicU8::new(PipelineState::Created as u8),
            cancel: CancellationToken::new(),
            workers: Mutex::new(Vec::new()),
        })
    }

    /// Replace the diagnostics receiver
    ///
    /// Only takes effect before [`start`](Self::start); afterwards the
    /// workers already share the original receiver.
    #[must_use]
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        match Arc::get_mut(&mut self.shared) {
            Some(shared) => shared.diagnostics = diagnostics,
            None => tracing::warn!("Diagnostics cannot be replaced on a started pipeline"),
        }
        self
    }

    /// Spawn the worker pool
    ///
    /// Valid only once, from `Created`; any later call returns
    /// [`AuditError::InvalidState`] and changes nothing.
    pub async fn start(&self) -> Result<()> {
        let mut handles = self.workers.lock().await;

        self.state
            .compare_exchange(
                PipelineState::Created as u8,
                PipelineState::Running as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .map_err(|current| AuditError::InvalidState {
                operation: "start",
                state: PipelineState::from_u8(current).to_string(),
            })?;

        for id in 0..self.config.workers {
            self.shared.active_workers.fetch_add(1, Ordering::SeqCst);
            handles.push(tokio::spawn(run_worker(
                id,
                self.shared.clone(),
                self.cancel.clone(),
            )));
        }

        self.shared.diagnostics.lifecycle(PipelineEvent::Started {
            workers: self.config.workers,
            capacity: self.config.capacity,
        });
        Ok(())
    }

    /// Stop the pipeline, persisting everything still buffered
    ///
    /// Producers are rejected from the moment this is called. Workers finish
    /// the entry they hold and exit; remaining entries are then drained on
    /// the calling task. Returns once every worker is gone and the buffer is
    /// empty. Calling it again (or concurrently) waits for the first stop and
    /// returns; calling it before `start` moves straight to `Stopped`.
    ///
    /// If a previous call was dropped mid-way (e.g. by a caller timeout), the
    /// pipeline stays `Stopping` and the next call resumes the shutdown. An
    /// entry the dropped call was persisting at that moment is lost.
    pub async fn stop(&self) {
        let mut handles = self.workers.lock().await;

        match self.state() {
            PipelineState::Running => {
                self.set_state(PipelineState::Stopping);
                self.shared.diagnostics.lifecycle(PipelineEvent::Stopping {
                    buffered: self.shared.buffer.len(),
                });
            }
            PipelineState::Stopping => {
                tracing::debug!(
                    remaining_workers = handles.len(),
                    buffered = self.shared.buffer.len(),
                    "Resuming interrupted audit pipeline stop"
                );
            }
            PipelineState::Created => {
                self.set_state(PipelineState::Stopped);
                self.shared.buffer.close().await;
                self.shared.diagnostics.lifecycle(PipelineEvent::Stopped);
                return;
            }
            PipelineState::Stopped => return,
        }

        self.cancel.cancel();

        // Pop only after the join completes so a dropped stop leaves the
        // remaining handles for the next call.
        while let Some(handle) = handles.last_mut() {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Audit log worker terminated abnormally");
            }
            handles.pop();
        }

        // Producers that passed the state check before Stopping either landed
        // in the buffer already or see a closed channel from here on.
        self.shared.buffer.close().await;

        // Closed, so this ends as soon as the buffer is empty and no send is
        // still in flight; try_recv could miss a send mid-commit.
        let mut persisted = 0;
        let mut failed = 0;
        while let Some(entry) = self.shared.buffer.dequeue().await {
            if self.shared.persist(entry).await {
                persisted += 1;
            } else {
                failed += 1;
            }
        }
        self.shared
            .diagnostics
            .lifecycle(PipelineEvent::Drained { persisted, failed });

        self.set_state(PipelineState::Stopped);
        self.shared.diagnostics.lifecycle(PipelineEvent::Stopped);
    }

    /// Push any entry; never waits
    pub fn push(&self, entry: impl Into<LogEntry>) -> PushOutcome {
        let entry = entry.into();
        let kind = entry.kind();

        if self.state() != PipelineState::Running {
            return self.reject(kind, DropReason::NotRunning);
        }

        match self.shared.buffer.try_enqueue(entry) {
            Ok(()) => {
                self.shared.counters.accepted.fetch_add(1, Ordering::Relaxed);
                PushOutcome::Accepted
            }
            Err(Rejected::Full(_)) => self.reject(kind, DropReason::QueueFull),
            Err(Rejected::Closed(_)) => self.reject(kind, DropReason::NotRunning),
        }
    }

    /// Push an operation log
    pub fn push_operation(&self, log: OperationLog) -> PushOutcome {
        self.push(LogEntry::Operation(log))
    }

    /// Push a data change log
    pub fn push_data_change(&self, log: DataChangeLog) -> PushOutcome {
        self.push(LogEntry::DataChange(log))
    }

    /// Push a login log
    pub fn push_login(&self, log: LoginLog) -> PushOutcome {
        self.push(LogEntry::Login(log))
    }

    /// Push an access log
    pub fn push_access(&self, log: AccessLog) -> PushOutcome {
        self.push(LogEntry::Access(log))
    }

    fn reject(&self, kind: LogKind, reason: DropReason) -> PushOutcome {
        let counter = match reason {
            DropReason::QueueFull => &self.shared.counters.dropped_full,
            DropReason::NotRunning => &self.shared.counters.dropped_not_running,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        self.shared.diagnostics.entry_dropped(
            kind,
            reason,
            self.shared.buffer.len(),
            self.shared.buffer.capacity(),
        );
        PushOutcome::Dropped(reason)
    }

    /// Current lifecycle state
    pub fn state(&self) -> PipelineState {
        PipelineState::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn set_state(&self, state: PipelineState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.state() == PipelineState::Running
    }

    /// Entries currently waiting in the buffer
    pub fn buffered(&self) -> usize {
        self.shared.buffer.len()
    }

    /// Total entries dropped on the producer side
    pub fn dropped(&self) -> u64 {
        self.shared.counters.dropped_full.load(Ordering::Relaxed)
            + self.shared.counters.dropped_not_running.load(Ordering::Relaxed)
    }

    /// Worker tasks still alive
    pub fn active_workers(&self) -> usize {
        self.shared.active_workers.load(Ordering::SeqCst)
    }

    /// Snapshot of all counters
    pub fn stats(&self) -> PipelineStats {
        let counters = &self.shared.counters;
        PipelineStats {
            state: self.state(),
            accepted: counters.accepted.load(Ordering::Relaxed),
            persisted: counters.persisted.load(Ordering::Relaxed),
            failed: counters.failed.load(Ordering::Relaxed),
            dropped_full: counters.dropped_full.load(Ordering::Relaxed),
            dropped_not_running: counters.dropped_not_running.load(Ordering::Relaxed),
            occupancy: self.shared.buffer.len(),
            capacity: self.shared.buffer.capacity(),
            workers: self.config.workers,
            active_workers: self.active_workers(),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Name of the sink entries are persisted to
    pub fn sink_name(&self) -> &str {
        self.shared.sink.name()
    }
}

impl Drop for AuditPipeline {
    fn drop(&mut self) {
        if self.state() == PipelineState::Running {
            self.cancel.cancel();
            self.shared.diagnostics.lifecycle(PipelineEvent::Abandoned {
                buffered: self.shared.buffer.len(),
            });
        }
    }
}
