use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};

/// Mutual-TLS client certificate and key paths plus the optional payload
/// encryption key, as handed over by the secrets layer. The core never
/// creates or deletes the PEM files; it only reads them at send time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientCredential {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
    pub encryption_key: Option<String>,
}

impl ClientCredential {
    pub fn new(cert_path: impl Into<PathBuf>, key_path: impl Into<PathBuf>) -> Self {
        Self {
            cert_path: cert_path.into(),
            key_path: key_path.into(),
            encryption_key: None,
        }
    }

    pub fn with_encryption_key(mut self, key: impl Into<String>) -> Self {
        self.encryption_key = Some(key.into());
        self
    }

    /// The encryption key, or a credential error when none was supplied.
    /// Encrypted sends call this before touching the network.
    pub fn require_encryption_key(&self) -> Result<&str> {
        self.encryption_key
            .as_deref()
            .ok_or_else(|| ClientError::CredentialError("no encryption key configured".to_string()))
    }
}

/// Explicit per-caller context: the sandbox base URL, the credential triple,
/// and the HTTP timeout. Passed into request construction instead of being
/// read from ambient globals.
#[derive(Debug, Clone)]
pub struct ApiContext {
    pub base_url: String,
    pub credential: ClientCredential,
    pub timeout: Duration,
}

impl ApiContext {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(base_url: impl Into<String>, credential: ClientCredential) -> Self {
        Self {
            base_url: base_url.into(),
            credential,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Load the context from the environment.
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("SANDBOX_BASE_URL")
            .unwrap_or_else(|_| "https://api.ssg-wsg.sg".to_string());
        let cert_path = std::env::var("SANDBOX_CERT_PATH")
            .map_err(|_| ClientError::CredentialError("SANDBOX_CERT_PATH is not set".to_string()))?;
        let key_path = std::env::var("SANDBOX_KEY_PATH")
            .map_err(|_| ClientError::CredentialError("SANDBOX_KEY_PATH is not set".to_string()))?;

        let mut credential = ClientCredential::new(cert_path, key_path);
        if let Ok(key) = std::env::var("SANDBOX_ENCRYPTION_KEY") {
            credential = credential.with_encryption_key(key);
        }

        Ok(Self::new(base_url, credential))
    }
}
