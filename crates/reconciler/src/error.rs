//! Error types for the reconciler crate.

use std::fmt;

use thiserror::Error;

/// Result type alias for reconciler operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error raised by a collaborator (store or posting service).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error type of a store or posting service.
///
/// The reconciler boxes collaborator errors, so whether one means "the entity
/// does not exist" has to be captured before wrapping.
pub trait CollaboratorError: std::error::Error + Send + Sync + 'static {
    /// Whether the requested entity does not exist.
    fn is_not_found(&self) -> bool {
        false
    }
}

/// Collaborator call that was in flight when a pass failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Listing desired tweets from the store.
    ListDesired,
    /// Re-fetching one desired tweet by name.
    GetDesired,
    /// Listing posted tweets for the owner.
    ListPosted,
    /// Posting a new tweet.
    CreateTweet,
    /// Deleting a posted tweet.
    DeleteTweet,
    /// Writing observed counters back to the store.
    SetStatus,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::ListDesired => "list desired tweets",
            Self::GetDesired => "get desired tweet",
            Self::ListPosted => "list posted tweets",
            Self::CreateTweet => "create tweet",
            Self::DeleteTweet => "delete tweet",
            Self::SetStatus => "update status",
        };
        f.write_str(text)
    }
}

/// Reconciler error types.
#[derive(Debug, Error)]
pub enum Error {
    /// Named tweet does not exist in the desired state store.
    #[error("tweet '{name}' not found")]
    NotFound { name: String },

    /// A collaborator call failed during a pass.
    #[error("failed to {operation}{}: {source}", for_entity(.entity))]
    Collaborator {
        operation: Operation,
        entity: Option<String>,
        not_found: bool,
        source: BoxError,
    },

    /// A collaborator could not serve the request.
    #[error("service unavailable: {reason}")]
    Unavailable { reason: String },

    /// Invalid configuration.
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

fn for_entity(entity: &Option<String>) -> String {
    entity
        .as_ref()
        .map(|name| format!(" for '{name}'"))
        .unwrap_or_default()
}

impl Error {
    /// Create a not found error.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// Wrap a collaborator failure with the operation and entity being processed.
    pub fn collaborator<E: CollaboratorError>(
        operation: Operation,
        entity: Option<&str>,
        source: E,
    ) -> Self {
        Self::Collaborator {
            operation,
            entity: entity.map(str::to_string),
            not_found: source.is_not_found(),
            source: Box::new(source),
        }
    }

    /// Create an unavailable error.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Create an invalid config error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Operation that failed, if this error came from a collaborator.
    pub const fn operation(&self) -> Option<Operation> {
        match self {
            Self::Collaborator { operation, .. } => Some(*operation),
            _ => None,
        }
    }

    /// Name of the desired tweet being processed when the error occurred.
    pub fn entity(&self) -> Option<&str> {
        match self {
            Self::Collaborator { entity, .. } => entity.as_deref(),
            Self::NotFound { name } => Some(name),
            _ => None,
        }
    }

    /// Check whether this error, or the collaborator error it wraps, is a not-found.
    pub const fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Collaborator { not_found, .. } => *not_found,
            _ => false,
        }
    }
}

impl CollaboratorError for Error {
    fn is_not_found(&self) -> bool {
        Self::is_not_found(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::not_found("hello-world");
        assert_eq!(err.to_string(), "tweet 'hello-world' not found");
    }

    #[test]
    fn test_collaborator_display_names_entity_and_operation() {
        let err = Error::collaborator(
            Operation::SetStatus,
            Some("hello-world"),
            Error::unavailable("connection reset"),
        );
        assert_eq!(
            err.to_string(),
            "failed to update status for 'hello-world': service unavailable: connection reset"
        );
        assert_eq!(err.operation(), Some(Operation::SetStatus));
        assert_eq!(err.entity(), Some("hello-world"));
    }

    #[test]
    fn test_collaborator_without_entity() {
        let err = Error::collaborator(Operation::ListDesired, None, Error::unavailable("down"));
        assert_eq!(
            err.to_string(),
            "failed to list desired tweets: service unavailable: down"
        );
        assert_eq!(err.entity(), None);
    }

    #[test]
    fn test_is_not_found_sees_through_wrapping() {
        let err = Error::collaborator(
            Operation::GetDesired,
            Some("gone"),
            Error::not_found("gone"),
        );
        assert!(err.is_not_found());
        assert!(!Error::unavailable("x").is_not_found());
    }

    #[derive(Debug, Error)]
    #[error("gone upstream")]
    struct Gone;

    impl CollaboratorError for Gone {
        fn is_not_found(&self) -> bool {
            true
        }
    }

    #[derive(Debug, Error)]
    #[error("timed out")]
    struct TimedOut;

    impl CollaboratorError for TimedOut {}

    #[test]
    fn test_is_not_found_uses_foreign_collaborator_error() {
        let gone = Error::collaborator(Operation::GetDesired, Some("gone"), Gone);
        let timed_out = Error::collaborator(Operation::GetDesired, Some("gone"), TimedOut);

        assert!(gone.is_not_found());
        assert!(!timed_out.is_not_found());
        assert_eq!(gone.to_string(), "failed to get desired tweet for 'gone': gone upstream");
    }
}
