//! End-to-end reconciliation scenarios against in-memory collaborators.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::collections::BTreeSet;

use async_trait::async_trait;
use tweet_reconciler::{
    ActualTweet, DesiredStateStore, DesiredTweet, Error, InMemoryTweetStore, InMemoryTwitter,
    Operation, ReconcileAction, Reconciler, ReconcilerConfig, Result, ServiceCall, StoreCall,
    StoreCallKind, TweetStatus,
};

fn reconciler(
    desired: Vec<DesiredTweet>,
    posted: Vec<ActualTweet>,
) -> (
    Reconciler<InMemoryTweetStore, InMemoryTwitter>,
    InMemoryTweetStore,
    InMemoryTwitter,
) {
    let store = InMemoryTweetStore::new(desired);
    let service = InMemoryTwitter::new(posted);
    let reconciler = Reconciler::new(
        store.clone(),
        service.clone(),
        ReconcilerConfig::new("bob"),
    );
    (reconciler, store, service)
}

#[tokio::test]
async fn given_unposted_tweet_when_reconciled_then_posts_it() -> Result<()> {
    let (reconciler, _, service) = reconciler(
        vec![DesiredTweet::new("hello-world", "Hello World")],
        Vec::new(),
    );

    let result = reconciler.reconcile().await?;

    assert!(!result.converged);
    assert_eq!(
        result.action_taken,
        Some(ReconcileAction::CreateTweet {
            name: "hello-world".to_string(),
            text: "Hello World".to_string(),
        })
    );
    let creates: Vec<_> = service
        .calls()
        .await
        .into_iter()
        .filter(|c| matches!(c, ServiceCall::Create(_)))
        .collect();
    assert_eq!(creates, vec![ServiceCall::Create("Hello World".to_string())]);
    assert_eq!(service.mutation_count().await, 1);
    Ok(())
}

#[tokio::test]
async fn given_emptied_text_when_reconciled_then_old_tweet_is_deleted() -> Result<()> {
    // An empty desired text matches nothing, so the old tweet goes in the orphan scan.
    let (reconciler, _, service) = reconciler(
        vec![DesiredTweet::new("hello-world", "")],
        vec![ActualTweet::new(12345, "Hello World")],
    );

    let result = reconciler.reconcile().await?;

    assert!(!result.converged);
    assert_eq!(service.mutation_count().await, 1);
    assert!(service.calls().await.contains(&ServiceCall::Delete(12345)));
    assert!(service.posted().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn given_empty_desired_text_and_empty_posted_text_then_in_sync() -> Result<()> {
    let (reconciler, _, service) = reconciler(
        vec![DesiredTweet::new("hello-world", "")],
        vec![ActualTweet::new(12345, "")],
    );

    let result = reconciler.reconcile().await?;

    // Both texts are empty: in sync, and the empty desired text declares the posted one.
    assert!(result.converged);
    assert_eq!(service.mutation_count().await, 0);
    Ok(())
}

#[tokio::test]
async fn given_no_desired_tweets_when_reconciled_then_deletes_orphan() -> Result<()> {
    let (reconciler, _, service) = reconciler(Vec::new(), vec![ActualTweet::new(1, "orphan")]);

    let result = reconciler.reconcile().await?;

    assert!(!result.converged);
    assert_eq!(
        result.action_taken,
        Some(ReconcileAction::DeleteOrphan {
            tweet: ActualTweet::new(1, "orphan"),
        })
    );
    assert_eq!(
        service.calls().await,
        vec![
            ServiceCall::ListForOwner("bob".to_string()),
            ServiceCall::Delete(1),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn given_posted_tweet_when_in_sync_then_status_propagates() -> Result<()> {
    let (reconciler, store, service) = reconciler(
        vec![DesiredTweet::new("hello-world", "X")],
        vec![ActualTweet::new(12345, "X").with_counts(1, 2, 3)],
    );

    let result = reconciler.reconcile().await?;

    assert!(result.converged);
    assert_eq!(result.in_sync, 1);
    assert_eq!(service.mutation_count().await, 0);

    let expected = TweetStatus {
        external_id: 12345,
        like_count: 1,
        repost_count: 2,
        reply_count: 3,
    };
    let status_writes: Vec<_> = store
        .calls()
        .await
        .into_iter()
        .filter(|c| matches!(c, StoreCall::SetStatus(..)))
        .collect();
    assert_eq!(
        status_writes,
        vec![StoreCall::SetStatus("hello-world".to_string(), expected)]
    );
    assert_eq!(
        store.tweets().await.first().map(|t| t.status),
        Some(expected)
    );
    Ok(())
}

#[tokio::test]
async fn given_converged_state_when_reconciled_repeatedly_then_no_mutations() -> Result<()> {
    let (reconciler, _, service) = reconciler(
        vec![DesiredTweet::new("a", "A"), DesiredTweet::new("b", "B")],
        vec![ActualTweet::new(1, "B"), ActualTweet::new(2, "A")],
    );

    for _ in 0..3 {
        let result = reconciler.reconcile().await?;
        assert!(result.converged);
        assert_eq!(result.action_taken, None);
    }

    assert_eq!(service.mutation_count().await, 0);
    Ok(())
}

#[tokio::test]
async fn given_divergent_state_then_each_pass_takes_exactly_one_action() -> Result<()> {
    let (reconciler, store, service) = reconciler(
        vec![
            DesiredTweet::new("a", "A"),
            DesiredTweet::new("b", "B"),
            DesiredTweet::new("c", ""),
        ],
        vec![
            ActualTweet::new(10, "stale one"),
            ActualTweet::new(11, "B"),
            ActualTweet::new(12, "stale two"),
        ],
    );

    let mut passes = 0usize;
    loop {
        let before = service.mutation_count().await;
        let result = reconciler.reconcile().await?;
        let after = service.mutation_count().await;
        passes = passes.saturating_add(1);

        if result.converged {
            assert_eq!(after, before);
            break;
        }
        assert_eq!(after, before.saturating_add(1));
        assert!(passes < 10, "reconciliation did not converge");
    }

    // create A, delete two orphans, then a converged pass
    assert_eq!(passes, 4);

    let desired: BTreeSet<_> = store
        .tweets()
        .await
        .into_iter()
        .map(|t| t.text)
        .filter(|text| !text.is_empty())
        .collect();
    let posted: BTreeSet<_> = service.posted().await.into_iter().map(|t| t.text).collect();
    assert_eq!(desired, posted);
    Ok(())
}

#[tokio::test]
async fn given_entities_then_each_is_refetched_by_name_in_list_order() -> Result<()> {
    let (reconciler, store, _) = reconciler(
        vec![DesiredTweet::new("first", "1"), DesiredTweet::new("second", "2")],
        vec![ActualTweet::new(1, "1"), ActualTweet::new(2, "2")],
    );

    reconciler.reconcile().await?;

    let calls = store.calls().await;
    assert_eq!(
        calls,
        vec![
            StoreCall::List,
            StoreCall::Get("first".to_string()),
            StoreCall::SetStatus("first".to_string(), TweetStatus::from(&ActualTweet::new(1, "1"))),
            StoreCall::Get("second".to_string()),
            StoreCall::SetStatus(
                "second".to_string(),
                TweetStatus::from(&ActualTweet::new(2, "2"))
            ),
            StoreCall::List,
        ]
    );
    Ok(())
}

#[tokio::test]
async fn given_first_divergence_then_later_entities_are_not_touched() -> Result<()> {
    let (reconciler, store, _) = reconciler(
        vec![DesiredTweet::new("first", "1"), DesiredTweet::new("second", "2")],
        Vec::new(),
    );

    reconciler.reconcile().await?;

    let calls = store.calls().await;
    assert!(!calls.contains(&StoreCall::Get("second".to_string())));
    assert!(!calls.iter().any(|c| matches!(c, StoreCall::SetStatus(..))));
    Ok(())
}

#[tokio::test]
async fn given_status_write_failure_then_error_names_entity() {
    let (reconciler, store, _) = reconciler(
        vec![DesiredTweet::new("hello-world", "X")],
        vec![ActualTweet::new(1, "X")],
    );
    store.fail_on(StoreCallKind::SetStatus).await;

    let result = reconciler.reconcile().await;

    let err = result.err();
    assert_eq!(
        err.as_ref().and_then(Error::operation),
        Some(Operation::SetStatus)
    );
    assert_eq!(err.as_ref().and_then(Error::entity), Some("hello-world"));
}

#[tokio::test]
async fn given_list_failure_then_pass_aborts_before_any_action() {
    let (reconciler, store, service) = reconciler(
        vec![DesiredTweet::new("hello-world", "X")],
        Vec::new(),
    );
    store.fail_on(StoreCallKind::List).await;

    let result = reconciler.reconcile().await;

    assert!(matches!(
        result,
        Err(Error::Collaborator {
            operation: Operation::ListDesired,
            entity: None,
            ..
        })
    ));
    assert!(service.calls().await.is_empty());
}

#[tokio::test]
async fn given_service_failure_then_listing_error_names_entity() {
    let (reconciler, _, service) = reconciler(
        vec![DesiredTweet::new("hello-world", "X")],
        Vec::new(),
    );
    service.fail_all().await;

    let result = reconciler.reconcile().await;

    let message = result.err().map(|e| e.to_string()).unwrap_or_default();
    assert_eq!(
        message,
        "failed to list posted tweets for 'hello-world': service unavailable: injected service failure"
    );
}

#[tokio::test]
async fn given_get_failure_then_error_names_operation_and_entity() {
    let (reconciler, store, _) = reconciler(vec![DesiredTweet::new("ghost", "boo")], Vec::new());
    store.fail_on(StoreCallKind::Get).await;

    let result = reconciler.reconcile().await;

    assert!(result.as_ref().is_err_and(|e| e.operation() == Some(Operation::GetDesired)));
    assert!(result.as_ref().is_err_and(|e| e.entity() == Some("ghost")));
    assert!(result.is_err_and(|e| !e.is_not_found()));
}

/// Lists a fixed snapshot while reads go to the live store.
struct StaleListStore {
    snapshot: Vec<DesiredTweet>,
    live: InMemoryTweetStore,
}

#[async_trait]
impl DesiredStateStore for StaleListStore {
    type Error = Error;

    async fn get(&self, name: &str) -> Result<DesiredTweet> {
        self.live.get(name).await
    }

    async fn list(&self) -> Result<Vec<DesiredTweet>> {
        Ok(self.snapshot.clone())
    }

    async fn set_status(&self, name: &str, status: &TweetStatus) -> Result<()> {
        self.live.set_status(name, status).await
    }
}

#[tokio::test]
async fn given_entity_removed_between_list_and_get_then_not_found_propagates() {
    let live = InMemoryTweetStore::new(vec![DesiredTweet::new("ghost", "boo")]);
    let store = StaleListStore {
        snapshot: live.tweets().await,
        live: live.clone(),
    };
    live.remove("ghost").await;
    let service = InMemoryTwitter::default();
    let reconciler = Reconciler::new(store, service.clone(), ReconcilerConfig::new("bob"));

    let result = reconciler.reconcile().await;

    assert_eq!(live.calls().await, vec![StoreCall::Get("ghost".to_string())]);
    assert!(result.as_ref().is_err_and(|e| e.operation() == Some(Operation::GetDesired)));
    assert!(result.as_ref().is_err_and(|e| e.entity() == Some("ghost")));
    assert!(result.is_err_and(|e| e.is_not_found()));
    assert!(service.calls().await.is_empty());
}

#[tokio::test]
async fn given_edited_text_then_new_tweet_is_posted_and_old_becomes_orphan() -> Result<()> {
    let (reconciler, store, service) = reconciler(
        vec![DesiredTweet::new("hello-world", "Hello World")],
        vec![ActualTweet::new(1, "Hello World")],
    );
    assert!(reconciler.reconcile().await?.converged);

    store
        .upsert(DesiredTweet::new("hello-world", "Hello again"))
        .await;

    let first = reconciler.reconcile().await?;
    assert!(matches!(
        first.action_taken,
        Some(ReconcileAction::CreateTweet { .. })
    ));
    let second = reconciler.reconcile().await?;
    assert!(matches!(
        second.action_taken,
        Some(ReconcileAction::DeleteOrphan { ref tweet }) if tweet.external_id == 1
    ));
    assert!(reconciler.reconcile().await?.converged);

    let texts: Vec<_> = service.posted().await.into_iter().map(|t| t.text).collect();
    assert_eq!(texts, vec!["Hello again".to_string()]);
    Ok(())
}
