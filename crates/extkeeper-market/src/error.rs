//! Error types for the marketplace crate

use extkeeper_core::UpdaterError;
use thiserror::Error;

/// Marketplace result type
pub type Result<T> = std::result::Result<T, MarketError>;

/// Errors that can occur while talking to the marketplace or writing packages
#[derive(Error, Debug)]
pub enum MarketError {
    /// Request could not be sent or the body could not be read
    #[error("network error: {0}")]
    Network(String),

    /// Marketplace answered with a non-success status
    #[error("marketplace returned HTTP {status} for {url}")]
    Http { status: u16, url: String },

    /// Extension unknown to the marketplace or not installed locally
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed manifest or metadata
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    /// No build for this platform
    #[error("no build available for platform {platform} (extension {id})")]
    NoBuild { id: String, platform: String },

    /// Downloaded bytes do not match the published checksum
    #[error("checksum verification failed: expected {expected}, got {actual}")]
    Checksum { expected: String, actual: String },

    /// Downloaded length differs from the published size
    #[error("size mismatch: expected {expected} bytes, got {actual}")]
    Size { expected: usize, actual: usize },

    /// Proxy address could not be used
    #[error("invalid proxy '{proxy}': {message}")]
    InvalidProxy { proxy: String, message: String },

    /// Filesystem error
    #[error("io error: {0}")]
    Io(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<reqwest::Error> for MarketError {
    fn from(e: reqwest::Error) -> Self {
        MarketError::Network(e.to_string())
    }
}

impl From<std::io::Error> for MarketError {
    fn from(e: std::io::Error) -> Self {
        MarketError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for MarketError {
    fn from(e: serde_json::Error) -> Self {
        MarketError::Serialization(e.to_string())
    }
}

impl From<tempfile::PersistError> for MarketError {
    fn from(e: tempfile::PersistError) -> Self {
        MarketError::Io(e.error.to_string())
    }
}

impl From<MarketError> for UpdaterError {
    fn from(e: MarketError) -> Self {
        match e {
            MarketError::NotFound(what) => UpdaterError::NotFound(what),
            MarketError::Io(message) => UpdaterError::Io(message),
            MarketError::Serialization(message) => UpdaterError::Serialization(message),
            other => UpdaterError::Other(other.to_string()),
        }
    }
}
