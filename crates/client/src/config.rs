//! Client configuration.
//!
//! Loaded from a JSON file, by default `~/.config/mex-client/config.json`.
//! Secrets may be kept out of the file and supplied through
//! `MEX_MAILBOX_PASSWORD` / `MEX_SHARED_KEY`.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::auth::MailboxCredentials;
use crate::transport::TransportConfig;

/// Environment variable overriding `mailbox_password`.
pub const ENV_MAILBOX_PASSWORD: &str = "MEX_MAILBOX_PASSWORD";

/// Environment variable overriding `shared_key`.
pub const ENV_SHARED_KEY: &str = "MEX_SHARED_KEY";

/// Errors loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("TLS setup failed: {0}")]
    Tls(String),
}

/// TLS material, all PEM file paths.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_cert: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_key: Option<PathBuf>,
}

/// Mailbox client configuration.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub base_url: String,
    pub mailbox_id: String,
    #[serde(default)]
    pub mailbox_password: String,
    #[serde(default)]
    pub shared_key: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsConfig>,
}

fn default_timeout_secs() -> u64 {
    mex_protocol::constants::DEFAULT_REQUEST_TIMEOUT.as_secs()
}

fn default_chunk_size() -> usize {
    mex_transfer::DEFAULT_CHUNK_SIZE
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("mailbox_id", &self.mailbox_id)
            .field("mailbox_password", &"<redacted>")
            .field("shared_key", &"<redacted>")
            .field("timeout_secs", &self.timeout_secs)
            .field("chunk_size", &self.chunk_size)
            .field("tls", &self.tls)
            .finish()
    }
}

impl ClientConfig {
    /// Creates a configuration with defaults for everything but the
    /// service address and credentials.
    pub fn new(base_url: impl Into<String>, credentials: MailboxCredentials) -> Self {
        Self {
            base_url: base_url.into(),
            mailbox_id: credentials.mailbox_id,
            mailbox_password: credentials.mailbox_password,
            shared_key: credentials.shared_key,
            timeout_secs: default_timeout_secs(),
            chunk_size: default_chunk_size(),
            tls: None,
        }
    }

    /// Parses and validates a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads `path`, applies environment overrides and validates.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = serde_json::from_str(&content)?;
        config.apply_env_overrides();
        config.validate()?;
        tracing::debug!(path = %path.display(), mailbox = %config.mailbox_id, "configuration loaded");
        Ok(config)
    }

    /// Writes the configuration as pretty JSON, owner-readable only.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        set_permissions_0600(path);
        Ok(())
    }

    /// Overrides secrets from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Overrides secrets from `lookup`; empty values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup(ENV_MAILBOX_PASSWORD).filter(|v| !v.is_empty()) {
            self.mailbox_password = v;
        }
        if let Some(v) = lookup(ENV_SHARED_KEY).filter(|v| !v.is_empty()) {
            self.shared_key = v;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.into()));
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return invalid("base_url must be an http(s) URL");
        }
        if self.mailbox_id.trim().is_empty() {
            return invalid("mailbox_id is empty");
        }
        if self.timeout_secs == 0 {
            return invalid("timeout_secs must be positive");
        }
        if self.chunk_size == 0 {
            return invalid("chunk_size must be positive");
        }
        if let Some(tls) = &self.tls {
            if tls.client_cert.is_some() != tls.client_key.is_some() {
                return invalid("client_cert and client_key must be set together");
            }
        }
        Ok(())
    }

    pub fn credentials(&self) -> MailboxCredentials {
        MailboxCredentials::new(
            self.mailbox_id.clone(),
            self.mailbox_password.clone(),
            self.shared_key.clone(),
        )
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn transport_config(&self) -> TransportConfig {
        let tls = self.tls.clone().unwrap_or_default();
        TransportConfig {
            timeout: self.timeout(),
            ca_cert: tls.ca_cert,
            client_cert: tls.client_cert,
            client_key: tls.client_key,
        }
    }
}

/// Default config file location.
pub fn default_config_path() -> PathBuf {
    config_base_dir().join("mex-client").join("config.json")
}

fn config_base_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        PathBuf::from(appdata)
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        PathBuf::from(home).join(".config")
    }
}

fn set_permissions_0600(path: &Path) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600));
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
}
