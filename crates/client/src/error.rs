//! Error model.
//!
//! Two disjoint classes. A [`FatalError`] is a protocol violation: the
//! operation stops at once and nothing partial is returned. A
//! [`TransportError`] means the exchange itself failed (error status, no
//! response, or a request that could not be built) and the caller may
//! retry with its own policy.

use mex_protocol::{ChunkRange, ProtocolError};
use mex_transfer::TransferError;
use tracing::{error, info, warn};

/// Protocol violations. Unrecoverable within the operation.
#[derive(Debug, thiserror::Error)]
pub enum FatalError {
    #[error("{operation}: unexpected status {status}")]
    UnexpectedStatus { operation: &'static str, status: u16 },

    #[error("{operation}: first chunk response carried no message id")]
    MissingMessageId { operation: &'static str },

    #[error("{operation}: partial response without a chunk range")]
    MissingChunkRange { operation: &'static str },

    #[error("{operation}: {source}")]
    InvalidChunkRange {
        operation: &'static str,
        #[source]
        source: ProtocolError,
    },

    #[error("{operation}: expected chunk {expected}, server sent {actual}")]
    ChunkRangeMismatch {
        operation: &'static str,
        expected: ChunkRange,
        actual: ChunkRange,
    },

    #[error("{operation}: chunk preparation failed: {source}")]
    Chunking {
        operation: &'static str,
        #[source]
        source: TransferError,
    },

    #[error("{operation}: malformed response body: {source}")]
    MalformedBody {
        operation: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{operation}: chunk sequence ended without a final response")]
    SequenceEnded { operation: &'static str },
}

impl FatalError {
    pub fn operation(&self) -> &'static str {
        match self {
            Self::UnexpectedStatus { operation, .. }
            | Self::MissingMessageId { operation }
            | Self::MissingChunkRange { operation }
            | Self::InvalidChunkRange { operation, .. }
            | Self::ChunkRangeMismatch { operation, .. }
            | Self::Chunking { operation, .. }
            | Self::MalformedBody { operation, .. }
            | Self::SequenceEnded { operation } => operation,
        }
    }
}

/// Failures of the HTTP exchange itself. Recoverable by the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("{operation}: server responded with error status {status}")]
    Status {
        operation: &'static str,
        status: u16,
        body: String,
    },

    #[error("{operation}: no response received: {reason}")]
    NoResponse {
        operation: &'static str,
        reason: String,
    },

    #[error("{operation}: request could not be constructed: {reason}")]
    Request {
        operation: &'static str,
        reason: String,
    },
}

impl TransportError {
    pub fn operation(&self) -> &'static str {
        match self {
            Self::Status { operation, .. }
            | Self::NoResponse { operation, .. }
            | Self::Request { operation, .. } => operation,
        }
    }
}

/// Errors returned by every mailbox operation.
#[derive(Debug, thiserror::Error)]
pub enum MexError {
    #[error("fatal protocol violation: {0}")]
    Fatal(#[from] FatalError),

    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),

    #[error("{0}: cancelled")]
    Cancelled(&'static str),
}

impl MexError {
    /// Returns `true` for protocol violations.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }

    /// Name of the operation that failed.
    pub fn operation(&self) -> &'static str {
        match self {
            Self::Fatal(e) => e.operation(),
            Self::Transport(e) => e.operation(),
            Self::Cancelled(operation) => operation,
        }
    }

    /// HTTP status behind the failure, if a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Fatal(FatalError::UnexpectedStatus { status, .. })
            | Self::Transport(TransportError::Status { status, .. }) => Some(*status),
            _ => None,
        }
    }

    /// Emits the diagnostic for this failure.
    pub(crate) fn report(&self) {
        let operation = self.operation();
        match self {
            Self::Fatal(e) => {
                error!(operation, status = ?self.status(), error = %e, "fatal protocol violation");
            }
            Self::Transport(TransportError::Status { status, body, .. }) => {
                warn!(operation, status, body = %body, "server responded with error status");
            }
            Self::Transport(TransportError::NoResponse { reason, .. }) => {
                warn!(operation, reason = %reason, "no response received");
            }
            Self::Transport(TransportError::Request { reason, .. }) => {
                warn!(operation, reason = %reason, "request could not be constructed");
            }
            Self::Cancelled(_) => info!(operation, "operation cancelled"),
        }
    }
}

/// Classifies a response whose status is outside `accepted`.
///
/// 4xx/5xx answers are transport failures; anything else is a protocol
/// violation.
pub(crate) fn unexpected_status(operation: &'static str, status: u16, body: &[u8]) -> MexError {
    if (400..600).contains(&status) {
        TransportError::Status {
            operation,
            status,
            body: String::from_utf8_lossy(body).into_owned(),
        }
        .into()
    } else {
        FatalError::UnexpectedStatus { operation, status }.into()
    }
}
