//! Send-side state machine.
//!
//! The first chunk goes to the outbox collection and, for multi-chunk
//! messages, comes back with a server-assigned [`MessageId`]. Every later
//! chunk is addressed by that id and its 1-based index. Only the final
//! response populates the returned [`TransferResult`].

use mex_protocol::constants::{
    CONTENT_ENCODING_GZIP, CONTENT_TYPE_OCTET_STREAM, HEADER_CHUNK_RANGE, HEADER_FILENAME,
    HEADER_FROM, HEADER_TO, HEADER_WORKFLOW_ID, STATUS_ACCEPTED,
};
use mex_protocol::{ChunkRange, Endpoints, MessageId, SendMetadata, SendResponse, TransferResult};
use mex_transfer::{ChunkSplitter, CompressedChunk};
use reqwest::Method;
use reqwest::header::{CONTENT_ENCODING, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use tracing::debug;

use crate::error::{FatalError, MexError, TransportError, unexpected_status};
use crate::session::Session;
use crate::transport::HttpResponse;

pub(crate) const OPERATION: &str = "send_message";

/// Where the upload sequence stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadPhase {
    /// Nothing sent yet; the next request goes to the outbox.
    FirstChunk,
    /// Id established; `next` is the range of the chunk to send.
    SubsequentChunk {
        message_id: MessageId,
        next: ChunkRange,
    },
    /// Final response received.
    Done,
}

/// Cursor over the upload of one `total`-chunk message.
///
/// Pure: it never performs I/O, it only says where the next chunk goes
/// and digests each response.
#[derive(Debug, Clone)]
pub struct UploadMachine {
    phase: UploadPhase,
    total: u32,
}

impl UploadMachine {
    /// Starts a sequence of `total` chunks (`total >= 1`).
    pub fn new(total: u32) -> Result<Self, mex_protocol::ProtocolError> {
        ChunkRange::first(total)?;
        Ok(Self {
            phase: UploadPhase::FirstChunk,
            total,
        })
    }

    pub fn phase(&self) -> &UploadPhase {
        &self.phase
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    /// The server-assigned id, once the first chunk has been accepted.
    pub fn message_id(&self) -> Option<&MessageId> {
        match &self.phase {
            UploadPhase::SubsequentChunk { message_id, .. } => Some(message_id),
            _ => None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.phase == UploadPhase::Done
    }

    /// URL and range for the next chunk, or `None` once done.
    pub fn next_target(&self, endpoints: &Endpoints) -> Option<(String, ChunkRange)> {
        match &self.phase {
            UploadPhase::FirstChunk => {
                let range = ChunkRange::first(self.total).ok()?;
                Some((endpoints.outbox(), range))
            }
            UploadPhase::SubsequentChunk { message_id, next } => Some((
                endpoints.outbox_chunk(message_id, next.current()),
                *next,
            )),
            UploadPhase::Done => None,
        }
    }

    /// Digests the response to the chunk last sent.
    ///
    /// Returns the operation's result once the final chunk is accepted.
    /// Any status other than 202 ends the sequence with an error.
    pub fn on_response(
        &mut self,
        response: &HttpResponse,
    ) -> Result<Option<TransferResult>, MexError> {
        let current = match &self.phase {
            UploadPhase::FirstChunk => ChunkRange::first(self.total).map_err(|source| {
                FatalError::InvalidChunkRange {
                    operation: OPERATION,
                    source,
                }
            })?,
            UploadPhase::SubsequentChunk { next, .. } => *next,
            UploadPhase::Done => return Ok(None),
        };

        if response.status != STATUS_ACCEPTED {
            return Err(unexpected_status(OPERATION, response.status, &response.body));
        }

        if current.is_last() {
            self.phase = UploadPhase::Done;
            return Ok(Some(TransferResult::new(
                response.status,
                response.body.clone(),
            )));
        }

        let next = current.next().ok_or(FatalError::SequenceEnded {
            operation: OPERATION,
        })?;
        let message_id = match &self.phase {
            UploadPhase::SubsequentChunk { message_id, .. } => message_id.clone(),
            _ => parse_message_id(&response.body)?,
        };
        self.phase = UploadPhase::SubsequentChunk { message_id, next };
        Ok(None)
    }
}

fn parse_message_id(body: &[u8]) -> Result<MessageId, FatalError> {
    let parsed: SendResponse =
        serde_json::from_slice(body).map_err(|source| FatalError::MalformedBody {
            operation: OPERATION,
            source,
        })?;
    MessageId::new(parsed.message_id).map_err(|_| FatalError::MissingMessageId {
        operation: OPERATION,
    })
}

/// Headers carried by every upload request, on top of authentication.
fn chunk_headers(metadata: &SendMetadata, range: ChunkRange) -> Result<HeaderMap, MexError> {
    let mut headers = HeaderMap::new();
    let range = range.to_string();
    let fields = [
        (HEADER_FROM, metadata.from.as_str()),
        (HEADER_TO, metadata.to.as_str()),
        (HEADER_WORKFLOW_ID, metadata.workflow_id.as_str()),
        (HEADER_FILENAME, metadata.filename.as_str()),
        (HEADER_CHUNK_RANGE, range.as_str()),
    ];
    for (name, value) in fields {
        let value = HeaderValue::from_str(value).map_err(|_| TransportError::Request {
            operation: OPERATION,
            reason: format!("invalid value for header {name}"),
        })?;
        headers.insert(HeaderName::from_static(name), value);
    }
    headers.insert(
        CONTENT_ENCODING,
        HeaderValue::from_static(CONTENT_ENCODING_GZIP),
    );
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static(CONTENT_TYPE_OCTET_STREAM),
    );
    Ok(headers)
}

/// Uploads `payload` as one logical message, strictly one chunk at a time.
pub(crate) async fn send_chunked(
    session: &Session<'_>,
    chunk_size: usize,
    metadata: &SendMetadata,
    payload: &[u8],
) -> Result<TransferResult, MexError> {
    let chunking = |source| FatalError::Chunking {
        operation: OPERATION,
        source,
    };
    let mut chunks = ChunkSplitter::new(payload, chunk_size).map_err(chunking)?;
    let mut machine = UploadMachine::new(chunks.total()).map_err(|source| {
        FatalError::InvalidChunkRange {
            operation: OPERATION,
            source,
        }
    })?;

    debug!(
        operation = OPERATION,
        to = %metadata.to,
        bytes = payload.len(),
        chunks = machine.total(),
        "starting upload"
    );

    while let Some((url, range)) = machine.next_target(session.endpoints) {
        let Some(chunk) = chunks.next() else { break };
        debug_assert_eq!(chunk.range, range);

        // One compressed chunk in memory at a time.
        let compressed = CompressedChunk::from_chunk(&chunk).map_err(chunking)?;
        let headers = chunk_headers(metadata, range)?;

        debug!(
            operation = OPERATION,
            chunk = %range,
            message_id = ?machine.message_id().map(MessageId::as_str),
            raw_bytes = compressed.raw_len,
            sent_bytes = compressed.body.len(),
            "uploading chunk"
        );

        let response = session
            .execute(OPERATION, Method::POST, url, headers, Some(compressed.body))
            .await?;
        if let Some(result) = machine.on_response(&response)? {
            return Ok(result);
        }
    }

    Err(FatalError::SequenceEnded {
        operation: OPERATION,
    }
    .into())
}
