//! In-memory collaborators.
//!
//! Both types record every call they receive so tests can assert on the
//! exact interaction sequence of a pass. Clones share state.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::reconciler::{ActualStateService, DesiredStateStore};
use crate::types::{ActualTweet, DesiredTweet, TweetStatus};

/// Call received by [`InMemoryTweetStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    List,
    Get(String),
    SetStatus(String, TweetStatus),
}

/// Call received by [`InMemoryTwitter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceCall {
    ListForOwner(String),
    Create(String),
    Delete(u64),
}

#[derive(Debug, Default)]
struct StoreState {
    tweets: Vec<DesiredTweet>,
    calls: Vec<StoreCall>,
    failing: Option<StoreCallKind>,
}

/// Kind of store call, used for failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreCallKind {
    List,
    Get,
    SetStatus,
}

/// Desired state store backed by a vector.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTweetStore {
    state: Arc<RwLock<StoreState>>,
}

impl InMemoryTweetStore {
    /// Create a store holding `tweets` in list order.
    pub fn new(tweets: Vec<DesiredTweet>) -> Self {
        Self {
            state: Arc::new(RwLock::new(StoreState {
                tweets,
                ..StoreState::default()
            })),
        }
    }

    /// Add or replace a desired tweet, keeping its position if it exists.
    pub async fn upsert(&self, tweet: DesiredTweet) {
        let mut state = self.state.write().await;
        match state.tweets.iter_mut().find(|t| t.name == tweet.name) {
            Some(existing) => *existing = tweet,
            None => state.tweets.push(tweet),
        }
    }

    /// Remove a desired tweet by name.
    pub async fn remove(&self, name: &str) {
        self.state.write().await.tweets.retain(|t| t.name != name);
    }

    /// Make every subsequent call of `kind` fail.
    pub async fn fail_on(&self, kind: StoreCallKind) {
        self.state.write().await.failing = Some(kind);
    }

    /// Snapshot of the stored tweets.
    pub async fn tweets(&self) -> Vec<DesiredTweet> {
        self.state.read().await.tweets.clone()
    }

    /// Calls received so far, in order.
    pub async fn calls(&self) -> Vec<StoreCall> {
        self.state.read().await.calls.clone()
    }
}

impl StoreState {
    fn record(&mut self, call: StoreCall, kind: StoreCallKind) -> Result<()> {
        self.calls.push(call);
        if self.failing == Some(kind) {
            return Err(Error::unavailable(format!("injected {kind:?} failure")));
        }
        Ok(())
    }
}

#[async_trait]
impl DesiredStateStore for InMemoryTweetStore {
    type Error = Error;

    async fn get(&self, name: &str) -> Result<DesiredTweet> {
        let mut state = self.state.write().await;
        state.record(StoreCall::Get(name.to_string()), StoreCallKind::Get)?;
        state
            .tweets
            .iter()
            .find(|t| t.name == name)
            .cloned()
            .ok_or_else(|| Error::not_found(name))
    }

    async fn list(&self) -> Result<Vec<DesiredTweet>> {
        let mut state = self.state.write().await;
        state.record(StoreCall::List, StoreCallKind::List)?;
        Ok(state.tweets.clone())
    }

    async fn set_status(&self, name: &str, status: &TweetStatus) -> Result<()> {
        let mut state = self.state.write().await;
        state.record(
            StoreCall::SetStatus(name.to_string(), *status),
            StoreCallKind::SetStatus,
        )?;
        let tweet = state
            .tweets
            .iter_mut()
            .find(|t| t.name == name)
            .ok_or_else(|| Error::not_found(name))?;
        tweet.status = *status;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct ServiceState {
    posted: Vec<ActualTweet>,
    calls: Vec<ServiceCall>,
    next_id: u64,
    failing: bool,
}

/// Posting service backed by a vector.
///
/// `create` appends a tweet with a fresh id and zeroed counters.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTwitter {
    state: Arc<RwLock<ServiceState>>,
}

impl InMemoryTwitter {
    /// Create a service that already holds `posted`.
    pub fn new(posted: Vec<ActualTweet>) -> Self {
        let next_id = posted
            .iter()
            .map(|t| t.external_id)
            .max()
            .unwrap_or(0)
            .saturating_add(1);
        Self {
            state: Arc::new(RwLock::new(ServiceState {
                posted,
                next_id,
                ..ServiceState::default()
            })),
        }
    }

    /// Make every subsequent call fail.
    pub async fn fail_all(&self) {
        self.state.write().await.failing = true;
    }

    /// Snapshot of the posted tweets.
    pub async fn posted(&self) -> Vec<ActualTweet> {
        self.state.read().await.posted.clone()
    }

    /// Calls received so far, in order.
    pub async fn calls(&self) -> Vec<ServiceCall> {
        self.state.read().await.calls.clone()
    }

    /// Number of create and delete calls received.
    pub async fn mutation_count(&self) -> usize {
        self.state
            .read()
            .await
            .calls
            .iter()
            .filter(|c| matches!(c, ServiceCall::Create(_) | ServiceCall::Delete(_)))
            .count()
    }
}

impl ServiceState {
    fn record(&mut self, call: ServiceCall) -> Result<()> {
        self.calls.push(call);
        if self.failing {
            return Err(Error::unavailable("injected service failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl ActualStateService for InMemoryTwitter {
    type Error = Error;

    async fn list_for_owner(&self, owner: &str) -> Result<Vec<ActualTweet>> {
        let mut state = self.state.write().await;
        state.record(ServiceCall::ListForOwner(owner.to_string()))?;
        Ok(state.posted.clone())
    }

    async fn create(&self, text: &str) -> Result<()> {
        let mut state = self.state.write().await;
        state.record(ServiceCall::Create(text.to_string()))?;
        let id = state.next_id;
        state.next_id = id.saturating_add(1);
        state.posted.push(ActualTweet::new(id, text));
        Ok(())
    }

    async fn delete(&self, tweet: &ActualTweet) -> Result<()> {
        let mut state = self.state.write().await;
        state.record(ServiceCall::Delete(tweet.external_id))?;
        state.posted.retain(|t| t.external_id != tweet.external_id);
        Ok(())
    }
}
