use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// Position of one chunk within its message, both fields 1-based.
///
/// Invariant: `1 <= current <= total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkRange {
    current: u32,
    total: u32,
}

impl ChunkRange {
    /// Builds a range, rejecting zero values and `current > total`.
    pub fn new(current: u32, total: u32) -> Result<Self, ProtocolError> {
        if current == 0 || current > total {
            return Err(ProtocolError::InvalidChunkRange(format!(
                "{current}:{total}"
            )));
        }
        Ok(Self { current, total })
    }

    /// The range of the first chunk of a `total`-chunk message.
    pub fn first(total: u32) -> Result<Self, ProtocolError> {
        Self::new(1, total)
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    /// Returns `true` for the final chunk of the message.
    pub fn is_last(&self) -> bool {
        self.current == self.total
    }

    /// The range of the following chunk, or `None` after the last.
    pub fn next(&self) -> Option<Self> {
        if self.is_last() {
            None
        } else {
            Some(Self {
                current: self.current + 1,
                total: self.total,
            })
        }
    }
}

impl fmt::Display for ChunkRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.current, self.total)
    }
}

impl FromStr for ChunkRange {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ProtocolError::InvalidChunkRange(s.to_string());
        let (current, total) = s.trim().split_once(':').ok_or_else(invalid)?;
        let current: u32 = current.trim().parse().map_err(|_| invalid())?;
        let total: u32 = total.trim().parse().map_err(|_| invalid())?;
        Self::new(current, total).map_err(|_| invalid())
    }
}

/// Server-assigned identifier correlating all chunks of one message.
///
/// Always non-empty; subsequent-chunk addressing only accepts this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MessageId(String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Result<Self, ProtocolError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ProtocolError::EmptyMessageId);
        }
        // Percent-encoding leaves dots alone, so these would re-route the URL.
        if id == "." || id == ".." {
            return Err(ProtocolError::RelativeMessageId(id));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for MessageId {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<MessageId> for String {
    fn from(id: MessageId) -> Self {
        id.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for MessageId {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Outcome of a whole send or receive operation.
///
/// For sends this is the final chunk's response. For a chunked receive the
/// status is the last part's 206, not 200, matching what the service
/// returns on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferResult {
    pub status: u16,
    pub data: Vec<u8>,
}

impl TransferResult {
    pub fn new(status: u16, data: Vec<u8>) -> Self {
        Self { status, data }
    }

    /// Returns `true` when the result came from a chunked download.
    pub fn is_partial(&self) -> bool {
        self.status == crate::constants::STATUS_PARTIAL_CONTENT
    }

    /// Lossy UTF-8 view of the body.
    pub fn text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.data)
    }
}

/// Per-message upload metadata carried on every chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendMetadata {
    /// Sender mailbox id.
    pub from: String,
    /// Recipient mailbox id.
    pub to: String,
    pub workflow_id: String,
    pub filename: String,
}

/// Body of an accepted upload; the first chunk's carries the new id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendResponse {
    #[serde(alias = "messageID", alias = "messageId")]
    pub message_id: String,
}

/// Body of the inbox listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboxListing {
    #[serde(default)]
    pub messages: Vec<String>,
}

/// Body of an acknowledge response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcknowledgeResponse {
    #[serde(alias = "messageID", alias = "messageId")]
    pub message_id: String,
}
