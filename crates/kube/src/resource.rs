//! Wire types for the `tweets.example.com/v1` custom resource.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tweet_reconciler::{DesiredTweet, TweetStatus};

/// API group of the `Tweet` resource.
pub const GROUP: &str = "example.com";
/// API version of the `Tweet` resource.
pub const VERSION: &str = "v1";
/// Plural resource name used in URLs.
pub const PLURAL: &str = "tweets";
/// Kind of the `Tweet` resource.
pub const KIND: &str = "Tweet";

/// Object metadata. Fields this crate does not read are kept in `extra` so a
/// replace does not drop them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Desired content of a tweet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TweetSpec {
    #[serde(default)]
    pub text: String,
}

/// A `Tweet` custom resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TweetResource {
    #[serde(default = "api_version")]
    pub api_version: String,
    #[serde(default = "kind")]
    pub kind: String,
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: TweetSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TweetStatus>,
}

impl TweetResource {
    /// Create a resource with the given name and text.
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            api_version: api_version(),
            kind: kind(),
            metadata: ObjectMeta {
                name: name.into(),
                ..ObjectMeta::default()
            },
            spec: TweetSpec { text: text.into() },
            status: None,
        }
    }
}

impl From<TweetResource> for DesiredTweet {
    fn from(resource: TweetResource) -> Self {
        Self {
            name: resource.metadata.name,
            text: resource.spec.text,
            status: resource.status.unwrap_or_default(),
        }
    }
}

/// Response of a list call.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TweetResourceList {
    #[serde(default)]
    pub items: Vec<TweetResource>,
}

fn api_version() -> String {
    format!("{GROUP}/{VERSION}")
}

fn kind() -> String {
    KIND.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_round_trips_unknown_metadata() -> Result<(), serde_json::Error> {
        let raw = serde_json::json!({
            "apiVersion": "example.com/v1",
            "kind": "Tweet",
            "metadata": {
                "name": "hello-world",
                "namespace": "default",
                "resourceVersion": "42",
                "uid": "abc",
                "labels": { "team": "social" }
            },
            "spec": { "text": "Hello World" },
            "status": { "id": 12345, "likes": 1 }
        });

        let resource: TweetResource = serde_json::from_value(raw)?;
        assert_eq!(resource.metadata.resource_version.as_deref(), Some("42"));
        assert_eq!(resource.status.map(|s| s.like_count), Some(1));

        let back = serde_json::to_value(&resource)?;
        assert_eq!(back["metadata"]["uid"], "abc");
        assert_eq!(back["metadata"]["labels"]["team"], "social");
        assert_eq!(back["status"]["retweets"], 0);
        Ok(())
    }

    #[test]
    fn test_resource_without_spec_or_status() -> Result<(), serde_json::Error> {
        let resource: TweetResource =
            serde_json::from_value(serde_json::json!({ "metadata": { "name": "empty" } }))?;

        let desired = DesiredTweet::from(resource);
        assert_eq!(desired, DesiredTweet::new("empty", ""));
        Ok(())
    }
}
