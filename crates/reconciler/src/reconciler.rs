//! Reconciler implementation.

use async_trait::async_trait;
use itertools::Itertools;
use tracing::{debug, info, warn};

use crate::error::{CollaboratorError, Error, Operation, Result};
use crate::types::{ActualTweet, DesiredTweet, ReconcileAction, ReconcileResult, TweetStatus};

/// Store holding the declared tweets.
#[async_trait]
pub trait DesiredStateStore: Send + Sync {
    /// Error raised by the store. `get` reports a missing name through
    /// [`CollaboratorError::is_not_found`].
    type Error: CollaboratorError;

    /// Fetch one desired tweet by name.
    async fn get(&self, name: &str) -> std::result::Result<DesiredTweet, Self::Error>;

    /// List all desired tweets in store order.
    async fn list(&self) -> std::result::Result<Vec<DesiredTweet>, Self::Error>;

    /// Record observed counters on a desired tweet.
    async fn set_status(
        &self,
        name: &str,
        status: &TweetStatus,
    ) -> std::result::Result<(), Self::Error>;
}

/// Posting service holding the actual tweets.
#[async_trait]
pub trait ActualStateService: Send + Sync {
    /// Error raised by the service.
    type Error: CollaboratorError;

    /// List the tweets posted by `owner`.
    async fn list_for_owner(&self, owner: &str)
    -> std::result::Result<Vec<ActualTweet>, Self::Error>;

    /// Post a tweet. The new tweet is only discoverable by listing.
    async fn create(&self, text: &str) -> std::result::Result<(), Self::Error>;

    /// Delete a posted tweet.
    async fn delete(&self, tweet: &ActualTweet) -> std::result::Result<(), Self::Error>;
}

/// Configuration for the reconciler.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Account handle whose tweets are reconciled.
    pub owner: String,
}

impl ReconcilerConfig {
    /// Create a config for the given account handle.
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
        }
    }
}

/// Decide the corrective action for one desired tweet and its matched posted tweet.
///
/// Returns `None` when the pair is in sync.
pub fn decide(desired: &DesiredTweet, actual: &ActualTweet) -> Option<ReconcileAction> {
    match (desired.text.is_empty(), actual.is_absent()) {
        (true, false) => Some(ReconcileAction::DeleteTweet {
            name: desired.name.clone(),
            tweet: actual.clone(),
        }),
        (false, true) => Some(ReconcileAction::CreateTweet {
            name: desired.name.clone(),
            text: desired.text.clone(),
        }),
        (true, true) | (false, false) => None,
    }
}

/// Level-triggered reconciler for tweets.
///
/// Every pass re-reads both collaborators and takes at most one corrective
/// action before returning.
pub struct Reconciler<D, A> {
    store: D,
    service: A,
    config: ReconcilerConfig,
}

impl<D, A> Reconciler<D, A>
where
    D: DesiredStateStore,
    A: ActualStateService,
{
    /// Create a new reconciler.
    pub const fn new(store: D, service: A, config: ReconcilerConfig) -> Self {
        Self {
            store,
            service,
            config,
        }
    }

    /// Run one reconciliation pass.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Collaborator`] when any store or service call fails.
    /// The pass stops at the failing call; actions already taken stay applied.
    pub async fn reconcile(&self) -> Result<ReconcileResult> {
        let desired = self
            .store
            .list()
            .await
            .map_err(|e| Error::collaborator(Operation::ListDesired, None, e))?;

        info!(
            desired = desired.len(),
            owner = %self.config.owner,
            "Starting reconciliation"
        );
        warn_on_shared_text(&desired);

        let mut in_sync = 0usize;
        for listed in &desired {
            let name = listed.name.as_str();
            debug!(name, "Reconciling tweet");

            let current = self
                .store
                .get(name)
                .await
                .map_err(|e| Error::collaborator(Operation::GetDesired, Some(name), e))?;
            let actual = self
                .actual_state(&current.text)
                .await
                .map_err(|e| Error::collaborator(Operation::ListPosted, Some(name), e))?;

            if let Some(action) = self.reconcile_one(&current, &actual).await? {
                info!(action = %action.description(), "Reconciliation step taken");
                return Ok(ReconcileResult::acted(action, in_sync));
            }

            let status = TweetStatus::from(&actual);
            self.store
                .set_status(name, &status)
                .await
                .map_err(|e| Error::collaborator(Operation::SetStatus, Some(name), e))?;
            debug!(name, external_id = status.external_id, "Status updated");
            in_sync = in_sync.saturating_add(1);
        }

        if let Some(action) = self.remove_orphan().await? {
            info!(action = %action.description(), "Reconciliation step taken");
            return Ok(ReconcileResult::acted(action, in_sync));
        }

        info!(in_sync, "System converged");
        Ok(ReconcileResult::converged(in_sync))
    }

    /// Reconcile one desired tweet against its matched posted tweet.
    ///
    /// Returns the action taken, or `None` when the pair was already in sync.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Collaborator`] when the create or delete call fails.
    pub async fn reconcile_one(
        &self,
        desired: &DesiredTweet,
        actual: &ActualTweet,
    ) -> Result<Option<ReconcileAction>> {
        match decide(desired, actual) {
            Some(action) => {
                self.execute(&action).await?;
                Ok(Some(action))
            }
            None => Ok(None),
        }
    }

    /// First posted tweet whose text equals `text`, or the empty placeholder.
    async fn actual_state(&self, text: &str) -> std::result::Result<ActualTweet, A::Error> {
        debug!(owner = %self.config.owner, "Getting posted tweets");
        let posted = self.service.list_for_owner(&self.config.owner).await?;

        Ok(posted
            .into_iter()
            .find(|tweet| tweet.text == text)
            .unwrap_or_default())
    }

    /// Delete the first posted tweet that no desired tweet declares.
    async fn remove_orphan(&self) -> Result<Option<ReconcileAction>> {
        let desired = self
            .store
            .list()
            .await
            .map_err(|e| Error::collaborator(Operation::ListDesired, None, e))?;
        let posted = self
            .service
            .list_for_owner(&self.config.owner)
            .await
            .map_err(|e| Error::collaborator(Operation::ListPosted, None, e))?;

        let orphan = posted
            .into_iter()
            .find(|tweet| !desired.iter().any(|d| d.text == tweet.text));

        match orphan {
            Some(tweet) => {
                let action = ReconcileAction::DeleteOrphan { tweet };
                self.execute(&action).await?;
                Ok(Some(action))
            }
            None => Ok(None),
        }
    }

    async fn execute(&self, action: &ReconcileAction) -> Result<()> {
        debug!(action = ?action, "Applying action");

        match action {
            ReconcileAction::CreateTweet { name, text } => self
                .service
                .create(text)
                .await
                .map_err(|e| Error::collaborator(Operation::CreateTweet, Some(name), e)),
            ReconcileAction::DeleteTweet { name, tweet } => self
                .service
                .delete(tweet)
                .await
                .map_err(|e| Error::collaborator(Operation::DeleteTweet, Some(name), e)),
            ReconcileAction::DeleteOrphan { tweet } => self
                .service
                .delete(tweet)
                .await
                .map_err(|e| Error::collaborator(Operation::DeleteTweet, None, e)),
        }
    }

    /// Get the desired state store.
    pub const fn store(&self) -> &D {
        &self.store
    }

    /// Get the posting service.
    pub const fn service(&self) -> &A {
        &self.service
    }

    /// Get the configuration.
    pub const fn config(&self) -> &ReconcilerConfig {
        &self.config
    }
}

/// Two desired tweets with the same text map onto one posted tweet.
fn warn_on_shared_text(desired: &[DesiredTweet]) {
    desired
        .iter()
        .filter(|d| !d.text.is_empty())
        .map(|d| d.text.as_str())
        .duplicates()
        .for_each(|text| {
            let names = desired
                .iter()
                .filter(|d| d.text == text)
                .map(|d| d.name.as_str())
                .join(", ");
            warn!(names = %names, "Desired tweets share the same text");
        });
}

/// Builder for Reconciler.
pub struct ReconcilerBuilder<D, A> {
    store: Option<D>,
    service: Option<A>,
    owner: Option<String>,
}

impl<D, A> ReconcilerBuilder<D, A>
where
    D: DesiredStateStore,
    A: ActualStateService,
{
    /// Create a new builder.
    pub const fn new() -> Self {
        Self {
            store: None,
            service: None,
            owner: None,
        }
    }

    /// Set the desired state store.
    #[must_use]
    pub fn with_store(mut self, store: D) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the posting service.
    #[must_use]
    pub fn with_service(mut self, service: A) -> Self {
        self.service = Some(service);
        self
    }

    /// Set the account handle whose tweets are reconciled.
    #[must_use]
    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Build the reconciler.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] when a collaborator or the owner is missing.
    pub fn build(self) -> Result<Reconciler<D, A>> {
        let store = self
            .store
            .ok_or_else(|| Error::invalid_config("Desired state store is required"))?;
        let service = self
            .service
            .ok_or_else(|| Error::invalid_config("Posting service is required"))?;
        let owner = self
            .owner
            .filter(|owner| !owner.is_empty())
            .ok_or_else(|| Error::invalid_config("Owner handle is required"))?;

        Ok(Reconciler::new(store, service, ReconcilerConfig::new(owner)))
    }
}

impl<D, A> Default for ReconcilerBuilder<D, A>
where
    D: DesiredStateStore,
    A: ActualStateService,
{
    fn default() -> Self {
        Self::new()
    }
}
