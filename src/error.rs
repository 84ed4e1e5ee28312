//! Error types for a3s-audit

use crate::types::LogKind;
use thiserror::Error;

/// Errors that can occur in the audit pipeline
///
/// None of these ever travel back through a producer's request path.
/// Producers see at most a [`PushOutcome`](crate::pipeline::PushOutcome), whose
/// [`DropReason`](crate::diagnostics::DropReason) covers a full buffer; everything
/// else is reported through [`Diagnostics`](crate::diagnostics::Diagnostics).
#[derive(Debug, Error)]
pub enum AuditError {
    /// Operation not valid in the pipeline's current lifecycle state
    #[error("Cannot {operation} audit pipeline in state '{state}'")]
    InvalidState {
        operation: &'static str,
        state: String,
    },

    /// Sink failed to persist a record
    #[error("Failed to persist {kind} log: {reason}")]
    Persistence { kind: LogKind, reason: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O failure in a file-backed sink
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AuditError {
    /// Build a persistence error for the given kind
    pub fn persistence(kind: LogKind, reason: impl Into<String>) -> Self {
        Self::Persistence {
            kind,
            reason: reason.into(),
        }
    }
}

/// Result type alias for audit operations
pub type Result<T> = std::result::Result<T, AuditError>;
