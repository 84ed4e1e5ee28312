//! Bounded buffer between producers and workers
//!
//! A fixed-capacity FIFO built on `tokio::sync::mpsc`. The sender side is
//! cloned freely by producers through `&self`; the receiver sits behind an
//! async mutex so any number of workers can take turns dequeuing.
//! Enqueue never waits: a full or closed buffer hands the entry back.

use crate::types::LogEntry;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Mutex;

/// Why an entry was not accepted by the buffer
#[derive(Debug)]
pub enum Rejected {
    /// Buffer at capacity
    Full(LogEntry),
    /// Buffer closed for shutdown
    Closed(LogEntry),
}

impl Rejected {
    /// Recover the rejected entry
    #[cfg(test)]
    pub(crate) fn into_inner(self) -> LogEntry {
        match self {
            Rejected::Full(entry) | Rejected::Closed(entry) => entry,
        }
    }
}

/// Multi-producer, multi-consumer bounded FIFO of pending entries
pub struct BoundedBuffer {
    tx: mpsc::Sender<LogEntry>,
    rx: Mutex<mpsc::Receiver<LogEntry>>,
    capacity: usize,
}

impl BoundedBuffer {
    /// Create a buffer holding at most `capacity` entries
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero; callers validate through
    /// [`PipelineConfig::validate`](crate::config::PipelineConfig::validate).
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            tx,
            rx: Mutex::new(rx),
            capacity,
        }
    }

    /// Append an entry without waiting
    pub fn try_enqueue(&self, entry: LogEntry) -> std::result::Result<(), Rejected> {
        self.tx.try_send(entry).map_err(|e| match e {
            TrySendError::Full(entry) => Rejected::Full(entry),
            TrySendError::Closed(entry) => Rejected::Closed(entry),
        })
    }

    /// Wait for the next entry
    ///
    /// Returns `None` once the buffer is closed, empty, and no producer is
    /// midway through an enqueue.
    pub async fn dequeue(&self) -> Option<LogEntry> {
        let mut rx = self.rx.lock().await;
        rx.recv().await
    }

    /// Take the next entry if one is resident, without waiting for producers
    #[cfg(test)]
    pub(crate) async fn try_dequeue(&self) -> Option<LogEntry> {
        let mut rx = self.rx.lock().await;
        rx.try_recv().ok()
    }

    /// Stop accepting entries; resident entries stay dequeueable
    ///
    /// Waits for the receiver lock, so consumers blocked in [`dequeue`](Self::dequeue)
    /// must be released first.
    pub async fn close(&self) {
        let mut rx = self.rx.lock().await;
        rx.close();
    }

    /// Whether [`close`](Self::close) has been called
    #[cfg(test)]
    pub(crate) fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Number of entries currently resident
    pub fn len(&self) -> usize {
        self.capacity.saturating_sub(self.tx.capacity())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
