//! Level-triggered reconciliation of `Tweet` resources against posted tweets.
//!
//! - **Desired State**: `Tweet` resources in a [`DesiredStateStore`]
//! - **Actual State**: tweets posted by one account, read from an [`ActualStateService`]
//! - **Diff**: desired and posted tweets are correlated by exact text
//! - **Action**: at most one create or delete per pass
//!
//! # Reconciliation
//!
//! Each pass:
//! 1. Lists the desired tweets
//! 2. For each one, re-fetches it by name and looks for a posted tweet with the same text
//! 3. Creates or deletes one tweet and stops, or writes the observed counters to the status
//! 4. When everything is in sync, deletes the first posted tweet nobody declares
//!
//! Converging `n` divergent tweets takes `n` passes.
//!
//! # Example
//!
//! ```ignore
//! use tweet_reconciler::{
//!     InMemoryTweetStore, InMemoryTwitter, LoopConfig, Reconciler, ReconcilerConfig,
//!     ReconciliationLoop,
//! };
//!
//! #[tokio::main]
//! async fn main() -> tweet_reconciler::Result<()> {
//!     let reconciler = Reconciler::new(
//!         InMemoryTweetStore::default(),
//!         InMemoryTwitter::default(),
//!         ReconcilerConfig::new("bob"),
//!     );
//!     let mut loop_runner = ReconciliationLoop::new(reconciler, LoopConfig::once());
//!     loop_runner.run().await?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod r#loop;
pub mod memory;
pub mod reconciler;
pub mod types;

// Re-export main types
pub use error::{BoxError, CollaboratorError, Error, Operation, Result};
pub use memory::{InMemoryTweetStore, InMemoryTwitter, ServiceCall, StoreCall, StoreCallKind};
pub use r#loop::{DEFAULT_INTERVAL, LoopConfig, LoopStopper, ReconciliationLoop, RunMode};
pub use reconciler::{
    ActualStateService, DesiredStateStore, Reconciler, ReconcilerBuilder, ReconcilerConfig,
    decide,
};
pub use types::{ActualTweet, DesiredTweet, ReconcileAction, ReconcileResult, TweetStatus};
