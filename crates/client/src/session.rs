//! Per-operation request context.
//!
//! All requests of one operation go through [`Session::execute`], which
//! generates a fresh header set for each call and honours cancellation.

use reqwest::Method;
use reqwest::header::HeaderMap;
use tokio_util::sync::CancellationToken;

use crate::auth::{HeaderProvider, MailboxCredentials};
use crate::error::{MexError, TransportError};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport};
use mex_protocol::Endpoints;

pub(crate) struct Session<'a> {
    pub(crate) transport: &'a dyn HttpTransport,
    pub(crate) header_provider: &'a dyn HeaderProvider,
    pub(crate) credentials: &'a MailboxCredentials,
    pub(crate) endpoints: &'a Endpoints,
    pub(crate) cancel: &'a CancellationToken,
}

impl Session<'_> {
    /// Sends one request. `extra` headers are layered over the
    /// authentication headers.
    pub(crate) async fn execute(
        &self,
        operation: &'static str,
        method: Method,
        url: String,
        extra: HeaderMap,
        body: Option<Vec<u8>>,
    ) -> Result<HttpResponse, MexError> {
        if self.cancel.is_cancelled() {
            return Err(MexError::Cancelled(operation));
        }

        let mut headers = self
            .header_provider
            .generate_headers(self.credentials)
            .map_err(|e| TransportError::Request {
                operation,
                reason: e.to_string(),
            })?;
        headers.extend(extra);

        let request = HttpRequest {
            operation,
            method,
            url,
            headers,
            body,
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(MexError::Cancelled(operation)),
            resp = self.transport.execute(request) => Ok(resp?),
        }
    }
}
