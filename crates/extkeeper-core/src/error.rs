//! Error types for the extkeeper core crate.

use std::path::PathBuf;

use thiserror::Error;

/// Core result type.
pub type Result<T> = std::result::Result<T, UpdaterError>;

/// Errors raised by collaborators and configuration.
///
/// The orchestrator never returns these to its caller; it folds them into a
/// [`RunSummary`](crate::outcome::RunSummary). They surface directly only from
/// configuration loading and from the collaborator traits.
#[derive(Error, Debug)]
pub enum UpdaterError {
    /// Install root does not exist or is not a directory
    #[error("install root not found: {}", .0.display())]
    InstallRootNotFound(PathBuf),

    /// A collaborator was not wired into the orchestrator
    #[error("dependency unavailable: {0}")]
    DependencyUnavailable(String),

    /// Inventory could not be built
    #[error("inventory error: {0}")]
    Inventory(String),

    /// Applying an update to one extension failed
    #[error("failed to update {name}: {message}")]
    Apply { name: String, message: String },

    /// Extension not found
    #[error("extension not found: {0}")]
    NotFound(String),

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Filesystem error
    #[error("io error: {0}")]
    Io(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Anything a collaborator could not classify
    #[error("{0}")]
    Other(String),
}

impl UpdaterError {
    /// Convenience constructor for per-extension failures.
    pub fn apply(name: impl Into<String>, message: impl Into<String>) -> Self {
        UpdaterError::Apply {
            name: name.into(),
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for UpdaterError {
    fn from(e: std::io::Error) -> Self {
        UpdaterError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for UpdaterError {
    fn from(e: serde_json::Error) -> Self {
        UpdaterError::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for UpdaterError {
    fn from(e: toml::de::Error) -> Self {
        UpdaterError::Config(e.to_string())
    }
}
