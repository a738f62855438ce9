//! Chunked upload/download engine for the mailbox message-exchange service.
//!
//! The service caps each request body, so large payloads travel as a
//! sequence of gzip-compressed chunks. This crate drives those sequences
//! against a pluggable HTTP transport. It is a library with no process
//! control: protocol violations come back as [`MexError::Fatal`] and the
//! host decides what to do with them.
//!
//! # Pipelines
//!
//! - **Send**: split → compress → POST first chunk to the outbox → thread
//!   the returned message id through the remaining chunks.
//! - **Receive**: GET the message → on 206 follow the `mex-chunk-range`
//!   cursor until the last part → return the concatenated body.
//!
//! Every request gets freshly generated authentication headers from the
//! [`HeaderProvider`]; requests within one operation never overlap.

pub mod auth;
pub mod client;
pub mod config;
pub mod download;
pub mod error;
pub mod transport;
pub mod upload;

mod session;

#[cfg(test)]
mod testing;

pub use auth::{AuthError, HeaderProvider, MailboxCredentials, MeshAuthProvider};
pub use client::MailboxClient;
pub use config::{ClientConfig, ConfigError, TlsConfig};
pub use download::{DownloadMachine, DownloadState};
pub use error::{FatalError, MexError, TransportError};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport, TransportConfig};
pub use upload::{UploadMachine, UploadPhase};

// Re-export the wire vocabulary so hosts need a single dependency.
pub use mex_protocol::{ChunkRange, Endpoints, MessageId, SendMetadata, TransferResult};
