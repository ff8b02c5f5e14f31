//! Error types for the Twitter client.

use thiserror::Error;

/// Result type for Twitter client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to the Twitter API.
#[derive(Error, Debug)]
pub enum Error {
    /// Required environment variable is unset or empty.
    #[error("{key} must be set")]
    MissingEnv { key: &'static str },

    /// The owner account does not exist.
    #[error("user '{username}' not found")]
    UserNotFound { username: String },

    /// Credentials were rejected.
    #[error("unauthorized ({status}): {body}")]
    Unauthorized { status: u16, body: String },

    /// Request quota exhausted.
    #[error("rate limited{}", reset_suffix(.reset_at))]
    RateLimited { reset_at: Option<u64> },

    /// API answered with another non-success status.
    #[error("API returned {status}: {body}")]
    Api { status: u16, body: String },

    /// Response body did not have the expected shape.
    #[error("invalid response: {reason}")]
    InvalidResponse { reason: String },

    /// Request could not be signed.
    #[error("failed to sign request: {reason}")]
    Signing { reason: String },

    /// HTTP error from reqwest.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parse error.
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

fn reset_suffix(reset_at: &Option<u64>) -> String {
    reset_at
        .map(|epoch| format!(" until {epoch}"))
        .unwrap_or_default()
}

impl Error {
    /// Create an invalid response error.
    pub fn invalid_response(reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            reason: reason.into(),
        }
    }

    /// Create a signing error.
    pub fn signing(reason: impl Into<String>) -> Self {
        Self::Signing {
            reason: reason.into(),
        }
    }
}

impl tweet_reconciler::CollaboratorError for Error {}
