//! Endpoint templates.
//!
//! Every dynamic segment (mailbox id, message id) is percent-encoded so an
//! identifier can never break out of its path segment.

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

use crate::types::MessageId;

/// Characters escaped inside a single path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// URL builder for one local mailbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    root: String,
}

impl Endpoints {
    /// Creates endpoints for `mailbox_id` under `base_url`.
    pub fn new(base_url: &str, mailbox_id: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            root: format!("{base}/messageexchange/{}", encode(mailbox_id)),
        }
    }

    /// Mailbox root, used for the handshake.
    pub fn handshake(&self) -> String {
        self.root.clone()
    }

    /// Collection endpoint for the first upload chunk.
    pub fn outbox(&self) -> String {
        format!("{}/outbox", self.root)
    }

    /// Upload endpoint for chunk `index` (1-based) of an established message.
    pub fn outbox_chunk(&self, message_id: &MessageId, index: u32) -> String {
        format!("{}/outbox/{}/{index}", self.root, encode(message_id.as_str()))
    }

    /// Inbox listing.
    pub fn inbox(&self) -> String {
        format!("{}/inbox", self.root)
    }

    /// Full (or first part of a chunked) message download.
    pub fn inbox_message(&self, message_id: &MessageId) -> String {
        format!("{}/inbox/{}", self.root, encode(message_id.as_str()))
    }

    /// Download endpoint for chunk `index` (1-based) of a chunked message.
    pub fn inbox_chunk(&self, message_id: &MessageId, index: u32) -> String {
        format!("{}/{index}", self.inbox_message(message_id))
    }

    /// Marks a message as read.
    pub fn acknowledge(&self, message_id: &MessageId) -> String {
        format!("{}/status/acknowledged", self.inbox_message(message_id))
    }
}

fn encode(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT).to_string()
}
