//! Core types for the reconciler.

use serde::{Deserialize, Serialize};

/// Counters observed on a posted tweet, as recorded on the resource status.
///
/// Field names on the wire follow the `Tweet` resource schema
/// (`id`, `likes`, `retweets`, `replies`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TweetStatus {
    /// Identifier assigned by the posting service.
    #[serde(rename = "id", default)]
    pub external_id: u64,
    #[serde(rename = "likes", default)]
    pub like_count: u64,
    #[serde(rename = "retweets", default)]
    pub repost_count: u64,
    #[serde(rename = "replies", default)]
    pub reply_count: u64,
}

impl From<&ActualTweet> for TweetStatus {
    fn from(actual: &ActualTweet) -> Self {
        Self {
            external_id: actual.external_id,
            like_count: actual.like_count,
            repost_count: actual.repost_count,
            reply_count: actual.reply_count,
        }
    }
}

/// A tweet as declared in the desired state store.
///
/// `name` is the store key and never leaves the store. `text` is the only
/// field used to correlate with a posted tweet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesiredTweet {
    pub name: String,
    pub text: String,
    pub status: TweetStatus,
}

impl DesiredTweet {
    /// Create a desired tweet with an empty status.
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            status: TweetStatus::default(),
        }
    }
}

/// A tweet as observed on the posting service.
///
/// The default value (empty text) stands for "no posted tweet matched".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActualTweet {
    pub text: String,
    pub external_id: u64,
    pub like_count: u64,
    pub repost_count: u64,
    pub reply_count: u64,
}

impl ActualTweet {
    /// Create a posted tweet with zeroed counters.
    pub fn new(external_id: u64, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            external_id,
            ..Self::default()
        }
    }

    /// Set the engagement counters.
    #[must_use]
    pub const fn with_counts(mut self, likes: u64, reposts: u64, replies: u64) -> Self {
        self.like_count = likes;
        self.repost_count = reposts;
        self.reply_count = replies;
        self
    }

    /// Whether this is the "nothing matched" placeholder.
    pub fn is_absent(&self) -> bool {
        self.text.is_empty()
    }
}

/// Corrective actions the reconciler can take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileAction {
    /// Post a tweet for a desired tweet that has no posted counterpart.
    CreateTweet { name: String, text: String },
    /// Delete the posted tweet matched to a desired tweet whose text is empty.
    DeleteTweet { name: String, tweet: ActualTweet },
    /// Delete a posted tweet that no desired tweet declares.
    DeleteOrphan { tweet: ActualTweet },
}

impl ReconcileAction {
    /// Name of the desired tweet this action was taken for, if any.
    pub fn entity(&self) -> Option<&str> {
        match self {
            Self::CreateTweet { name, .. } | Self::DeleteTweet { name, .. } => Some(name),
            Self::DeleteOrphan { .. } => None,
        }
    }

    /// Get a description of the action.
    pub fn description(&self) -> String {
        match self {
            Self::CreateTweet { name, text } => {
                format!("create tweet for {name} ({} chars)", text.chars().count())
            }
            Self::DeleteTweet { name, tweet } => {
                format!("delete tweet {} for {name}", tweet.external_id)
            }
            Self::DeleteOrphan { tweet } => {
                format!("delete orphaned tweet {}", tweet.external_id)
            }
        }
    }
}

/// Result of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileResult {
    /// The single corrective action taken, if any.
    pub action_taken: Option<ReconcileAction>,
    /// Desired tweets found in sync before the pass stopped.
    pub in_sync: usize,
    /// Whether desired and actual state fully match.
    pub converged: bool,
}

impl ReconcileResult {
    /// A pass that found nothing to do.
    pub const fn converged(in_sync: usize) -> Self {
        Self {
            action_taken: None,
            in_sync,
            converged: true,
        }
    }

    /// A pass that stopped after taking one action.
    pub const fn acted(action: ReconcileAction, in_sync: usize) -> Self {
        Self {
            action_taken: Some(action),
            in_sync,
            converged: false,
        }
    }
}
