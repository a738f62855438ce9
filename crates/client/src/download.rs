//! Receive-side state machine.
//!
//! A 200 on the initial request is the whole message. A 206 means the
//! server is delivering it in parts: the `mex-chunk-range` header says
//! which part this is, and the client keeps fetching
//! `inbox/{id}/{next}` until `current == total`.

use mex_protocol::constants::{HEADER_CHUNK_RANGE, STATUS_OK, STATUS_PARTIAL_CONTENT};
use mex_protocol::{ChunkRange, Endpoints, MessageId, TransferResult};
use reqwest::Method;
use reqwest::header::HeaderMap;
use tracing::debug;

use crate::error::{FatalError, MexError, unexpected_status};
use crate::session::Session;
use crate::transport::HttpResponse;

pub(crate) const OPERATION: &str = "receive_message";

/// Where the download stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadState {
    /// Initial request not answered yet.
    Initial,
    /// Chunked delivery under way.
    InProgress {
        data: Vec<u8>,
        next_index: u32,
        total: u32,
    },
    /// Terminal.
    Complete(TransferResult),
}

/// Cursor over the download of one message.
#[derive(Debug, Clone)]
pub struct DownloadMachine {
    state: DownloadState,
}

impl Default for DownloadMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl DownloadMachine {
    pub fn new() -> Self {
        Self {
            state: DownloadState::Initial,
        }
    }

    pub fn state(&self) -> &DownloadState {
        &self.state
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.state, DownloadState::Complete(_))
    }

    /// URL of the next request, or `None` once complete.
    pub fn next_target(&self, endpoints: &Endpoints, message_id: &MessageId) -> Option<String> {
        match &self.state {
            DownloadState::Initial => Some(endpoints.inbox_message(message_id)),
            DownloadState::InProgress { next_index, .. } => {
                Some(endpoints.inbox_chunk(message_id, *next_index))
            }
            DownloadState::Complete(_) => None,
        }
    }

    /// Digests the response to the request last issued.
    ///
    /// Returns the assembled result once the message is complete. A
    /// chunked message completes with status 206, the status its parts
    /// were served with, even though the body is whole. A rejected
    /// response leaves the state untouched.
    pub fn on_response(
        &mut self,
        response: &HttpResponse,
    ) -> Result<Option<TransferResult>, MexError> {
        let range = match &self.state {
            DownloadState::Initial => match response.status {
                STATUS_OK => None,
                STATUS_PARTIAL_CONTENT => {
                    let range = chunk_range(response)?;
                    check_range(expected_range(1, range.total())?, range)?;
                    Some(range)
                }
                status => return Err(unexpected_status(OPERATION, status, &response.body)),
            },
            DownloadState::InProgress {
                next_index, total, ..
            } => {
                if !matches!(response.status, STATUS_OK | STATUS_PARTIAL_CONTENT) {
                    return Err(unexpected_status(OPERATION, response.status, &response.body));
                }
                let range = chunk_range(response)?;
                check_range(expected_range(*next_index, *total)?, range)?;
                Some(range)
            }
            DownloadState::Complete(_) => return Ok(None),
        };

        let Some(range) = range else {
            return self.finish(TransferResult::new(STATUS_OK, response.body.clone()));
        };
        let mut data = match std::mem::replace(&mut self.state, DownloadState::Initial) {
            DownloadState::InProgress { data, .. } => data,
            _ => Vec::new(),
        };
        data.extend_from_slice(&response.body);
        self.accept(data, range)
    }

    /// Records a part whose body is already appended to `data`.
    fn accept(
        &mut self,
        data: Vec<u8>,
        range: ChunkRange,
    ) -> Result<Option<TransferResult>, MexError> {
        match range.next() {
            None => self.finish(TransferResult::new(STATUS_PARTIAL_CONTENT, data)),
            Some(next) => {
                self.state = DownloadState::InProgress {
                    data,
                    next_index: next.current(),
                    total: next.total(),
                };
                Ok(None)
            }
        }
    }

    fn finish(&mut self, result: TransferResult) -> Result<Option<TransferResult>, MexError> {
        self.state = DownloadState::Complete(result.clone());
        Ok(Some(result))
    }
}

fn chunk_range(response: &HttpResponse) -> Result<ChunkRange, FatalError> {
    let raw = response
        .headers
        .get(HEADER_CHUNK_RANGE)
        .ok_or(FatalError::MissingChunkRange {
            operation: OPERATION,
        })?;
    let raw = String::from_utf8_lossy(raw.as_bytes());
    raw.parse().map_err(|source| FatalError::InvalidChunkRange {
        operation: OPERATION,
        source,
    })
}

fn expected_range(current: u32, total: u32) -> Result<ChunkRange, FatalError> {
    ChunkRange::new(current, total).map_err(|source| FatalError::InvalidChunkRange {
        operation: OPERATION,
        source,
    })
}

fn check_range(expected: ChunkRange, actual: ChunkRange) -> Result<(), FatalError> {
    if expected == actual {
        Ok(())
    } else {
        Err(FatalError::ChunkRangeMismatch {
            operation: OPERATION,
            expected,
            actual,
        })
    }
}

/// Fetches one message, following chunk ranges one request at a time.
pub(crate) async fn receive_chunked(
    session: &Session<'_>,
    message_id: &MessageId,
) -> Result<TransferResult, MexError> {
    let mut machine = DownloadMachine::new();

    while let Some(url) = machine.next_target(session.endpoints, message_id) {
        let response = session
            .execute(OPERATION, Method::GET, url, HeaderMap::new(), None)
            .await?;
        debug!(
            operation = OPERATION,
            message_id = %message_id,
            status = response.status,
            chunk = response.header(HEADER_CHUNK_RANGE).unwrap_or("-"),
            bytes = response.body.len(),
            "received part"
        );
        if let Some(result) = machine.on_response(&response)? {
            return Ok(result);
        }
    }

    Err(FatalError::SequenceEnded {
        operation: OPERATION,
    }
    .into())
}
