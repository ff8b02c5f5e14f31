//! # tweet-operator
//!
//! Keeps the tweets of one account in sync with `Tweet` resources.
//!
//! ## Startup
//!
//! 1. **Tracing** - `RUST_LOG` filter, `info` by default
//! 2. **Twitter credentials** - `CONSUMER_KEY`, `CONSUMER_SECRET`, `ACCESS_TOKEN` and
//!    `ACCESS_TOKEN_SECRET`, checked against `GET /2/users/me`
//! 3. **Cluster access** - kubeconfig or in-cluster service account
//! 4. **Reconciliation loop** - every `--interval-secs`, or once with `--once`
//!
//! Missing configuration or rejected credentials stop the process before any pass runs. A failed
//! pass stops the loop and the process exits non-zero; restarting it is left
//! to whatever supervises the process.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::expect_used)]

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use tweet_kube::{KubeConfig, TweetClient};
use tweet_reconciler::{LoopStopper, ReconcilerBuilder, ReconciliationLoop};
use tweet_twitter::{TwitterClient, TwitterConfig};

use crate::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    info!("tweet-operator starting...");

    let twitter_config = TwitterConfig::from_env().context("Twitter configuration is incomplete")?;
    let (service, owner) = connect_twitter(twitter_config).await?;
    let kube_config = init_kube_config(&cli)?;

    info!(
        server = %kube_config.server,
        namespace = %kube_config.namespace,
        owner = %owner,
        "Configuration resolved"
    );

    let store = TweetClient::new(&kube_config).context("Failed to build Kubernetes client")?;

    let reconciler = ReconcilerBuilder::new()
        .with_store(store)
        .with_service(service)
        .owner(owner)
        .build()
        .context("Failed to build reconciler")?;

    let mut loop_runner = ReconciliationLoop::new(reconciler, cli.loop_config());
    tokio::spawn(stop_on_shutdown(loop_runner.stopper()));

    match loop_runner.run().await {
        Ok(Some(result)) => {
            info!(
                converged = result.converged,
                in_sync = result.in_sync,
                "tweet-operator stopped"
            );
            Ok(())
        }
        Ok(None) => {
            info!("tweet-operator stopped before the first pass");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Reconciliation failed, exiting");
            Err(e).context("Reconciliation failed")
        }
    }
}

/// Initialize tracing subscriber with environment filter.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build the Twitter client and confirm its credentials.
/// Returns the client and the handle of the account it acts for.
async fn connect_twitter(config: TwitterConfig) -> Result<(TwitterClient, String)> {
    let service = TwitterClient::new(config).context("Failed to build Twitter client")?;
    let account = service
        .verify_credentials()
        .await
        .context("Twitter credentials were rejected")?;
    Ok((service, account.username))
}

/// Resolve cluster access, applying the namespace override.
fn init_kube_config(cli: &Cli) -> Result<KubeConfig> {
    let config = KubeConfig::infer(cli.kubeconfig.as_deref())
        .context("Failed to resolve cluster configuration")?;

    Ok(match cli.namespace {
        Some(ref namespace) => config.with_namespace(namespace),
        None => config,
    })
}

async fn stop_on_shutdown(stopper: LoopStopper) {
    if wait_for_shutdown().await {
        stopper.stop();
    }
}

/// Wait for Ctrl+C or SIGTERM. Returns false if no signal can be awaited.
async fn wait_for_shutdown() -> bool {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => tokio::select! {
                result = tokio::signal::ctrl_c() => log_ctrl_c(result),
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, initiating graceful shutdown");
                    true
                }
            },
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
                log_ctrl_c(tokio::signal::ctrl_c().await)
            }
        }
    }

    #[cfg(not(unix))]
    {
        log_ctrl_c(tokio::signal::ctrl_c().await)
    }
}

fn log_ctrl_c(result: std::io::Result<()>) -> bool {
    match result {
        Ok(()) => {
            info!("Received Ctrl+C, initiating graceful shutdown");
            true
        }
        Err(err) => {
            error!("Failed to listen for shutdown signal: {}", err);
            false
        }
    }
}
