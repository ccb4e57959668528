use thiserror::Error;

use crate::encryption::error::EncryptionError;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Endpoint error: {0}")]
    EndpointError(String),
    #[error("Header error: {0}")]
    HeaderError(String),
    #[error("Parameter error: {0}")]
    ParameterError(String),
    #[error("Body error: {0}")]
    BodyError(String),
    #[error("Credential error: {0}")]
    CredentialError(String),
    #[error("Encryption error: {0}")]
    EncryptionError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Transport error: {0}")]
    TransportError(String),
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::CredentialError(err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::SerializationError(err.to_string())
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::TransportError(err.to_string())
    }
}

impl From<EncryptionError> for ClientError {
    fn from(err: EncryptionError) -> Self {
        ClientError::EncryptionError(err.to_string())
    }
}
