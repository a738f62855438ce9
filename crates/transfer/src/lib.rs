//! Payload chunking and chunk compression.
//!
//! Both stages are pure and synchronous: the splitter borrows the payload
//! and the compressor turns one chunk into one gzip body.

mod chunked;
mod compress;
mod types;

pub use chunked::{ChunkSplitter, chunk_count, split_payload};
pub use compress::{compress, decompress};
pub use types::{Chunk, CompressedChunk};

/// Default chunk size limit: 10 MiB.
///
/// The exchange service caps each request body, so payloads above this are
/// split into multiple chunks.
pub const DEFAULT_CHUNK_SIZE: usize = 10 * 1024 * 1024;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("compression failed: {0}")]
    Compression(#[source] std::io::Error),

    #[error("decompression failed: {0}")]
    Decompression(#[source] std::io::Error),

    #[error("payload needs {0} chunks, more than a chunk range can address")]
    TooManyChunks(usize),
}
