//! Scripted transport and header provider shared by unit tests.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use reqwest::header::{HeaderMap, HeaderValue};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::auth::{AuthError, HeaderProvider, MailboxCredentials};
use crate::error::TransportError;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport};

/// Replays queued responses in order and records every request.
#[derive(Default)]
pub(crate) struct MockTransport {
    responses: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    requests: Mutex<Vec<HttpRequest>>,
    cancel_after: Option<(usize, CancellationToken)>,
}

impl MockTransport {
    pub(crate) fn new(responses: Vec<Result<HttpResponse, TransportError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
            cancel_after: None,
        }
    }

    /// Cancels `token` as the `count`-th request is answered.
    pub(crate) fn cancelling_after(mut self, count: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((count, token));
        self
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl HttpTransport for MockTransport {
    fn execute(
        &self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + Send + '_>> {
        Box::pin(async move {
            let operation = request.operation;
            let seen = {
                let mut requests = self.requests.lock().unwrap();
                requests.push(request);
                requests.len()
            };
            if let Some((count, token)) = &self.cancel_after {
                if seen == *count {
                    token.cancel();
                }
            }
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| {
                    Err(TransportError::NoResponse {
                        operation,
                        reason: "script exhausted".into(),
                    })
                })
        })
    }
}

/// Builds a response with the given status, chunk range header and body.
pub(crate) fn response(status: u16, range: Option<&str>, body: &[u8]) -> HttpResponse {
    let mut resp = HttpResponse::new(status, body);
    if let Some(range) = range {
        resp.headers
            .insert("mex-chunk-range", HeaderValue::from_str(range).unwrap());
    }
    resp
}

/// Transport whose requests never complete.
#[derive(Default)]
pub(crate) struct StalledTransport {
    pub(crate) started: Notify,
    requests: AtomicUsize,
}

impl StalledTransport {
    pub(crate) fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl HttpTransport for StalledTransport {
    fn execute(
        &self,
        _request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + Send + '_>> {
        Box::pin(async move {
            self.requests.fetch_add(1, Ordering::SeqCst);
            self.started.notify_one();
            std::future::pending().await
        })
    }
}

/// Header provider that stamps each call with a sequence number.
#[derive(Default)]
pub(crate) struct CountingHeaders {
    calls: AtomicUsize,
}

impl CountingHeaders {
    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl HeaderProvider for CountingHeaders {
    fn generate_headers(&self, credentials: &MailboxCredentials) -> Result<HeaderMap, AuthError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        let mut headers = HeaderMap::new();
        headers.insert("x-nonce", HeaderValue::from(n));
        headers.insert(
            "x-mailbox",
            HeaderValue::from_str(&credentials.mailbox_id).unwrap(),
        );
        Ok(headers)
    }
}

/// Header provider that always fails.
pub(crate) struct BrokenHeaders;

impl HeaderProvider for BrokenHeaders {
    fn generate_headers(&self, _credentials: &MailboxCredentials) -> Result<HeaderMap, AuthError> {
        Err(AuthError::InvalidKey)
    }
}

pub(crate) fn credentials() -> MailboxCredentials {
    MailboxCredentials::new("X26ABC1", "password", "TestKey")
}
