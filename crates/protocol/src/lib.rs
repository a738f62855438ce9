//! Wire vocabulary for the chunked mailbox message-exchange protocol.
//!
//! This crate has no I/O. It names the headers, status codes and endpoint
//! templates shared by the upload and download pipelines, and the small
//! value types threaded between requests (`ChunkRange`, `MessageId`).

pub mod constants;
pub mod endpoints;
pub mod types;

pub use endpoints::Endpoints;
pub use types::{
    AcknowledgeResponse, ChunkRange, InboxListing, MessageId, SendMetadata, SendResponse,
    TransferResult,
};

/// Errors produced while interpreting protocol values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("invalid chunk range: {0:?}")]
    InvalidChunkRange(String),

    #[error("empty message identifier")]
    EmptyMessageId,

    #[error("message identifier {0:?} is a relative path segment")]
    RelativeMessageId(String),
}
