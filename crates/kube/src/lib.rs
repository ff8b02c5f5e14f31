//! Kubernetes REST client for `Tweet` custom resources.
//!
//! Implements [`tweet_reconciler::DesiredStateStore`] over the
//! `tweets.example.com/v1` API of one namespace.

pub mod client;
pub mod config;
pub mod error;
pub mod resource;

pub use client::TweetClient;
pub use config::{KubeConfig, SERVICE_ACCOUNT_DIR};
pub use error::{Error, Result};
pub use resource::{ObjectMeta, TweetResource, TweetResourceList, TweetSpec};
