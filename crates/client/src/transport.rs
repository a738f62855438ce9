//! HTTP transport seam.
//!
//! The state machines only see [`HttpRequest`] / [`HttpResponse`] values.
//! [`ReqwestTransport`] is the production implementation; tests plug in
//! scripted mocks through the same trait.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::time::Duration;

use mex_protocol::constants::DEFAULT_REQUEST_TIMEOUT;
use reqwest::Method;
use reqwest::header::HeaderMap;
use tracing::trace;

use crate::config::ConfigError;
use crate::error::TransportError;

/// One outgoing request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// Operation name used in diagnostics.
    pub operation: &'static str,
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

/// A received response, whatever its status.
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Returns a header as a string, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Executes HTTP requests.
///
/// Any status is a successful exchange; only a missing response or a
/// request that could not be sent is an error.
pub trait HttpTransport: Send + Sync {
    fn execute(
        &self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + Send + '_>>;
}

/// Settings for [`ReqwestTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Budget for each individual request.
    pub timeout: Duration,
    /// Extra trusted root certificate (PEM).
    pub ca_cert: Option<PathBuf>,
    /// Client certificate (PEM), paired with `client_key`.
    pub client_cert: Option<PathBuf>,
    /// Client private key (PEM).
    pub client_key: Option<PathBuf>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_REQUEST_TIMEOUT,
            ca_cert: None,
            client_cert: None,
            client_key: None,
        }
    }
}

/// `reqwest`-backed transport with per-request timeout and optional mTLS.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(config: &TransportConfig) -> Result<Self, ConfigError> {
        let mut builder = reqwest::Client::builder()
            .use_rustls_tls()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(config.timeout);

        if let Some(path) = &config.ca_cert {
            let pem = std::fs::read(path)?;
            let cert = reqwest::Certificate::from_pem(&pem)
                .map_err(|e| ConfigError::Tls(format!("{}: {e}", path.display())))?;
            builder = builder.add_root_certificate(cert);
        }

        match (&config.client_cert, &config.client_key) {
            (Some(cert), Some(key)) => {
                let mut pem = std::fs::read(cert)?;
                pem.push(b'\n');
                pem.extend(std::fs::read(key)?);
                let identity = reqwest::Identity::from_pem(&pem)
                    .map_err(|e| ConfigError::Tls(format!("client identity: {e}")))?;
                builder = builder.identity(identity);
            }
            (None, None) => {}
            _ => {
                return Err(ConfigError::Invalid(
                    "client_cert and client_key must be set together".into(),
                ));
            }
        }

        let http = builder
            .build()
            .map_err(|e| ConfigError::Tls(e.to_string()))?;
        Ok(Self { http })
    }

    /// Wraps an existing client.
    pub fn from_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

impl HttpTransport for ReqwestTransport {
    fn execute(
        &self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + Send + '_>> {
        Box::pin(async move {
            let operation = request.operation;
            trace!(operation, method = %request.method, url = %request.url, "sending request");

            let mut builder = self
                .http
                .request(request.method, &request.url)
                .headers(request.headers);
            if let Some(body) = request.body {
                builder = builder.body(body);
            }

            let resp = builder.send().await.map_err(|e| classify(operation, e))?;
            let status = resp.status().as_u16();
            let headers = resp.headers().clone();
            let body = resp
                .bytes()
                .await
                .map_err(|e| classify(operation, e))?
                .to_vec();

            Ok(HttpResponse {
                status,
                headers,
                body,
            })
        })
    }
}

/// Maps a reqwest failure onto the transport error sub-cases.
fn classify(operation: &'static str, err: reqwest::Error) -> TransportError {
    if err.is_builder() {
        TransportError::Request {
            operation,
            reason: err.to_string(),
        }
    } else {
        TransportError::NoResponse {
            operation,
            reason: err.to_string(),
        }
    }
}
