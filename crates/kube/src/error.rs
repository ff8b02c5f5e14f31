//! Error types for the Kubernetes client.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for Kubernetes client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while resolving cluster access or talking to the API server.
#[derive(Error, Debug)]
pub enum Error {
    /// No kubeconfig file and no in-cluster service account.
    #[error("no cluster configuration found: {reason}")]
    ConfigNotFound { reason: String },

    /// Kubeconfig refers to an entry it does not define.
    #[error("kubeconfig has no {kind} named '{name}'")]
    MissingEntry { kind: &'static str, name: String },

    /// Kubeconfig is structurally valid YAML but unusable.
    #[error("invalid kubeconfig: {reason}")]
    InvalidConfig { reason: String },

    /// Failed to read a file referenced by the configuration.
    #[error("failed to read '{path}': {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Named resource does not exist.
    #[error("tweet resource '{name}' not found")]
    NotFound { name: String },

    /// API server answered with a non-success status.
    #[error("API server returned {status}: {body}")]
    Api { status: u16, body: String },

    /// HTTP error from reqwest.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parse error.
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML deserialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Base64 decode error.
    #[error("invalid certificate data: {0}")]
    Base64(#[from] base64::DecodeError),
}

impl Error {
    /// Create a config not found error.
    pub fn config_not_found(reason: impl Into<String>) -> Self {
        Self::ConfigNotFound {
            reason: reason.into(),
        }
    }

    /// Create a missing entry error.
    pub fn missing_entry(kind: &'static str, name: impl Into<String>) -> Self {
        Self::MissingEntry {
            kind,
            name: name.into(),
        }
    }

    /// Create an invalid config error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Create a file read error.
    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Create a not found error.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// Check if this error means the resource does not exist.
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl tweet_reconciler::CollaboratorError for Error {
    fn is_not_found(&self) -> bool {
        Self::is_not_found(self)
    }
}
