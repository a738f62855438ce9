//! Request authentication.
//!
//! Every request carries an `authorization` header built around a
//! single-use nonce, so a header set must be generated per request and
//! never reused.

use std::fmt;

use hmac::{Hmac, Mac};
use mex_protocol::constants::{
    AUTH_SCHEMA_NAME, HEADER_CLIENT_VERSION, HEADER_OS_ARCHITECTURE, HEADER_OS_NAME,
};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Errors from a [`HeaderProvider`].
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid shared key")]
    InvalidKey,

    #[error("invalid header value for {0}")]
    InvalidHeader(String),
}

/// Mailbox identity and secrets used to sign requests.
#[derive(Clone, PartialEq, Eq)]
pub struct MailboxCredentials {
    pub mailbox_id: String,
    pub mailbox_password: String,
    pub shared_key: String,
}

impl MailboxCredentials {
    pub fn new(
        mailbox_id: impl Into<String>,
        mailbox_password: impl Into<String>,
        shared_key: impl Into<String>,
    ) -> Self {
        Self {
            mailbox_id: mailbox_id.into(),
            mailbox_password: mailbox_password.into(),
            shared_key: shared_key.into(),
        }
    }
}

impl fmt::Debug for MailboxCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailboxCredentials")
            .field("mailbox_id", &self.mailbox_id)
            .field("mailbox_password", &"<redacted>")
            .field("shared_key", &"<redacted>")
            .finish()
    }
}

/// Produces the header set for one request.
///
/// Called exactly once per HTTP request. Implementations must embed a
/// fresh freshness token on every call.
pub trait HeaderProvider: Send + Sync {
    fn generate_headers(&self, credentials: &MailboxCredentials) -> Result<HeaderMap, AuthError>;
}

/// Default provider: HMAC-SHA256 signed `NHSMESH` authorization.
///
/// ```text
/// authorization: NHSMESH <mailbox>:<nonce>:<nonce_count>:<timestamp>:<hmac>
/// hmac = hex(HMAC-SHA256(shared_key, "<mailbox>:<nonce>:<nonce_count>:<password>:<timestamp>"))
/// ```
#[derive(Debug, Clone)]
pub struct MeshAuthProvider {
    client_version: String,
}

impl Default for MeshAuthProvider {
    fn default() -> Self {
        Self::new(concat!("mex-client/", env!("CARGO_PKG_VERSION")))
    }
}

impl MeshAuthProvider {
    pub fn new(client_version: impl Into<String>) -> Self {
        Self {
            client_version: client_version.into(),
        }
    }

    /// Builds the authorization value for a given nonce and timestamp.
    pub fn authorization(
        &self,
        credentials: &MailboxCredentials,
        nonce: &str,
        nonce_count: u32,
        timestamp: &str,
    ) -> Result<String, AuthError> {
        let mailbox = &credentials.mailbox_id;
        let signed = format!(
            "{mailbox}:{nonce}:{nonce_count}:{}:{timestamp}",
            credentials.mailbox_password
        );
        let mut mac = HmacSha256::new_from_slice(credentials.shared_key.as_bytes())
            .map_err(|_| AuthError::InvalidKey)?;
        mac.update(signed.as_bytes());
        let digest = hex::encode(mac.finalize().into_bytes());
        Ok(format!(
            "{AUTH_SCHEMA_NAME} {mailbox}:{nonce}:{nonce_count}:{timestamp}:{digest}"
        ))
    }
}

impl HeaderProvider for MeshAuthProvider {
    fn generate_headers(&self, credentials: &MailboxCredentials) -> Result<HeaderMap, AuthError> {
        let nonce = uuid::Uuid::new_v4().to_string();
        let timestamp = chrono::Utc::now().format("%Y%m%d%H%M").to_string();
        let authorization = self.authorization(credentials, &nonce, 0, &timestamp)?;

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, header_value("authorization", &authorization)?);
        insert(&mut headers, HEADER_CLIENT_VERSION, &self.client_version)?;
        insert(&mut headers, HEADER_OS_NAME, std::env::consts::OS)?;
        insert(&mut headers, HEADER_OS_ARCHITECTURE, std::env::consts::ARCH)?;
        Ok(headers)
    }
}

fn insert(headers: &mut HeaderMap, name: &'static str, value: &str) -> Result<(), AuthError> {
    headers.insert(HeaderName::from_static(name), header_value(name, value)?);
    Ok(())
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, AuthError> {
    HeaderValue::from_str(value).map_err(|_| AuthError::InvalidHeader(name.to_string()))
}
