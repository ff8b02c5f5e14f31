//! Reconciliation loop.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::error::Result;
use crate::reconciler::{ActualStateService, DesiredStateStore, Reconciler};
use crate::types::ReconcileResult;

/// Default interval between passes.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);

/// How the loop schedules passes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunMode {
    /// Run a pass every interval until stopped.
    #[default]
    Continuous,
    /// Run a single pass and return.
    Once,
}

/// Configuration for the reconciliation loop.
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Interval between reconciliation passes.
    pub interval: Duration,
    /// Continuous polling or a single pass.
    pub mode: RunMode,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            mode: RunMode::Continuous,
        }
    }
}

impl LoopConfig {
    /// Config for a single pass.
    pub fn once() -> Self {
        Self {
            mode: RunMode::Once,
            ..Self::default()
        }
    }
}

/// Drives a [`Reconciler`] on a fixed interval.
///
/// A pass error ends the loop: there is no retry here, the next attempt is
/// whatever restarts the process.
pub struct ReconciliationLoop<D, A> {
    reconciler: Reconciler<D, A>,
    config: LoopConfig,
    stop_rx: watch::Receiver<bool>,
    stop_tx: watch::Sender<bool>,
}

impl<D, A> ReconciliationLoop<D, A>
where
    D: DesiredStateStore,
    A: ActualStateService,
{
    /// Create a new reconciliation loop.
    pub fn new(reconciler: Reconciler<D, A>, config: LoopConfig) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        Self {
            reconciler,
            config,
            stop_rx,
            stop_tx,
        }
    }

    /// Run the loop according to its mode.
    ///
    /// Returns the last pass result, or `None` when stopped before any pass
    /// completed.
    ///
    /// # Errors
    ///
    /// Returns the first pass error.
    pub async fn run(&mut self) -> Result<Option<ReconcileResult>> {
        match self.config.mode {
            RunMode::Once => {
                info!("Running a single reconciliation pass");
                self.run_pass().await.map(Some)
            }
            RunMode::Continuous => self.run_continuous().await,
        }
    }

    async fn run_continuous(&mut self) -> Result<Option<ReconcileResult>> {
        info!(
            interval_ms = self.config.interval.as_millis(),
            "Starting reconciliation loop"
        );

        let Self {
            reconciler,
            config,
            stop_rx,
            ..
        } = self;

        let mut interval = tokio::time::interval(config.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last = None;

        loop {
            tokio::select! {
                biased;
                changed = stop_rx.changed() => {
                    if changed.is_err() || *stop_rx.borrow() {
                        info!("Reconciliation loop stopped");
                        return Ok(last);
                    }
                }
                _ = interval.tick() => {
                    let result = run_logged(reconciler).await?;
                    last = Some(result);
                }
            }
        }
    }

    /// Run a single reconciliation pass.
    ///
    /// # Errors
    ///
    /// Returns the pass error.
    pub async fn run_pass(&self) -> Result<ReconcileResult> {
        run_logged(&self.reconciler).await
    }

    /// Stop the loop.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    /// Get a stopper handle.
    pub fn stopper(&self) -> LoopStopper {
        LoopStopper {
            stop_tx: self.stop_tx.clone(),
        }
    }

    /// Get the reconciler.
    pub const fn reconciler(&self) -> &Reconciler<D, A> {
        &self.reconciler
    }
}

async fn run_logged<D, A>(reconciler: &Reconciler<D, A>) -> Result<ReconcileResult>
where
    D: DesiredStateStore,
    A: ActualStateService,
{
    match reconciler.reconcile().await {
        Ok(result) => {
            if result.converged {
                debug!("System converged");
            }
            Ok(result)
        }
        Err(e) => {
            error!(error = %e, "Reconciliation error");
            Err(e)
        }
    }
}

/// Handle to stop a reconciliation loop.
#[derive(Clone)]
pub struct LoopStopper {
    stop_tx: watch::Sender<bool>,
}

impl LoopStopper {
    /// Stop the loop.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }
}
