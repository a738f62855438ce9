//! Mailbox facade.
//!
//! [`MailboxClient`] owns the credentials, endpoint templates, transport and
//! header provider, and exposes one method per mailbox operation. Each call
//! runs its own request sequence; concurrent calls share nothing mutable.

use mex_protocol::constants::STATUS_OK;
use mex_protocol::{
    AcknowledgeResponse, Endpoints, InboxListing, MessageId, SendMetadata, TransferResult,
};
use reqwest::Method;
use reqwest::header::HeaderMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::auth::{HeaderProvider, MailboxCredentials, MeshAuthProvider};
use crate::config::{ClientConfig, ConfigError};
use crate::error::{FatalError, MexError, unexpected_status};
use crate::session::Session;
use crate::transport::{HttpResponse, HttpTransport, ReqwestTransport};
use crate::{download, upload};

/// Client for one local mailbox.
pub struct MailboxClient<T = ReqwestTransport, H = MeshAuthProvider> {
    transport: T,
    header_provider: H,
    credentials: MailboxCredentials,
    endpoints: Endpoints,
    chunk_size: usize,
    cancel: CancellationToken,
}

impl MailboxClient<ReqwestTransport, MeshAuthProvider> {
    /// Builds a client with the reqwest transport and signed headers.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let transport = ReqwestTransport::new(&config.transport_config())?;
        Ok(Self::new(
            transport,
            MeshAuthProvider::default(),
            config.credentials(),
            &config.base_url,
        )
        .with_chunk_size(config.chunk_size))
    }
}

impl<T: HttpTransport, H: HeaderProvider> MailboxClient<T, H> {
    pub fn new(
        transport: T,
        header_provider: H,
        credentials: MailboxCredentials,
        base_url: &str,
    ) -> Self {
        let endpoints = Endpoints::new(base_url, &credentials.mailbox_id);
        Self {
            transport,
            header_provider,
            credentials,
            endpoints,
            chunk_size: mex_transfer::DEFAULT_CHUNK_SIZE,
            cancel: CancellationToken::new(),
        }
    }

    /// Sets the chunk size limit (0 falls back to the default).
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Uses `token` to abort operations between (or during) requests.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn mailbox_id(&self) -> &str {
        &self.credentials.mailbox_id
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Upload metadata sent from this mailbox.
    pub fn outbound(
        &self,
        to: impl Into<String>,
        workflow_id: impl Into<String>,
        filename: impl Into<String>,
    ) -> SendMetadata {
        SendMetadata {
            from: self.credentials.mailbox_id.clone(),
            to: to.into(),
            workflow_id: workflow_id.into(),
            filename: filename.into(),
        }
    }

    fn session(&self) -> Session<'_> {
        Session {
            transport: &self.transport,
            header_provider: &self.header_provider,
            credentials: &self.credentials,
            endpoints: &self.endpoints,
            cancel: &self.cancel,
        }
    }

    /// Sends `payload` as one message, chunked and gzip-compressed.
    ///
    /// The result is the final chunk's response.
    pub async fn send_message(
        &self,
        metadata: &SendMetadata,
        payload: &[u8],
    ) -> Result<TransferResult, MexError> {
        let result = upload::send_chunked(&self.session(), self.chunk_size, metadata, payload)
            .await
            .inspect_err(MexError::report)?;
        info!(
            operation = upload::OPERATION,
            to = %metadata.to,
            bytes = payload.len(),
            status = result.status,
            "message sent"
        );
        Ok(result)
    }

    /// Fetches one message, reassembling it if it arrives in parts.
    pub async fn receive_message(&self, message_id: &MessageId) -> Result<TransferResult, MexError> {
        let result = download::receive_chunked(&self.session(), message_id)
            .await
            .inspect_err(MexError::report)?;
        info!(
            operation = download::OPERATION,
            message_id = %message_id,
            bytes = result.data.len(),
            status = result.status,
            "message received"
        );
        Ok(result)
    }

    /// Lists message ids waiting in the inbox.
    pub async fn list_inbox(&self) -> Result<Vec<MessageId>, MexError> {
        const OPERATION: &str = "list_inbox";
        let run = async {
            let response = self
                .simple(OPERATION, Method::GET, self.endpoints.inbox())
                .await?;
            let listing: InboxListing = parse_json(OPERATION, &response)?;
            // Blank ids cannot be addressed; drop them.
            let ids: Vec<MessageId> = listing
                .messages
                .into_iter()
                .filter_map(|id| MessageId::new(id).ok())
                .collect();
            Ok::<_, MexError>(ids)
        };
        let ids = run.await.inspect_err(MexError::report)?;
        debug!(operation = OPERATION, count = ids.len(), "inbox listed");
        Ok(ids)
    }

    /// Marks a message as read so it leaves the inbox.
    pub async fn acknowledge(&self, message_id: &MessageId) -> Result<(), MexError> {
        const OPERATION: &str = "acknowledge";
        let run = async {
            let response = self
                .simple(OPERATION, Method::PUT, self.endpoints.acknowledge(message_id))
                .await?;
            // Older service versions answer with an empty body.
            if !response.body.is_empty() {
                let _: AcknowledgeResponse = parse_json(OPERATION, &response)?;
            }
            Ok::<_, MexError>(())
        };
        run.await.inspect_err(MexError::report)?;
        debug!(operation = OPERATION, message_id = %message_id, "message acknowledged");
        Ok(())
    }

    /// Checks that the mailbox exists and the credentials are accepted.
    pub async fn handshake(&self) -> Result<(), MexError> {
        const OPERATION: &str = "handshake";
        self.simple(OPERATION, Method::GET, self.endpoints.handshake())
            .await
            .inspect_err(MexError::report)?;
        info!(operation = OPERATION, mailbox = %self.credentials.mailbox_id, "handshake ok");
        Ok(())
    }

    /// Single request expecting 200.
    async fn simple(
        &self,
        operation: &'static str,
        method: Method,
        url: String,
    ) -> Result<HttpResponse, MexError> {
        let body = (method == Method::PUT).then(Vec::new);
        let response = self
            .session()
            .execute(operation, method, url, HeaderMap::new(), body)
            .await?;
        if response.status != STATUS_OK {
            return Err(unexpected_status(operation, response.status, &response.body));
        }
        Ok(response)
    }
}

fn parse_json<T: serde::de::DeserializeOwned>(
    operation: &'static str,
    response: &HttpResponse,
) -> Result<T, MexError> {
    serde_json::from_slice(&response.body)
        .map_err(|source| FatalError::MalformedBody { operation, source }.into())
}
