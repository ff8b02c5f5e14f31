//! CLI definition using clap.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tweet_reconciler::{LoopConfig, RunMode};

/// tweet-operator - keeps posted tweets in sync with `Tweet` resources
#[derive(Parser, Debug)]
#[command(name = "tweet-operator")]
#[command(version)]
#[command(about = "Keeps posted tweets in sync with Tweet custom resources")]
#[command(
    long_about = "Watches Tweet resources in a Kubernetes namespace and posts, deletes, or leaves tweets alone so the account matches them. Credentials are read from CONSUMER_KEY, CONSUMER_SECRET, ACCESS_TOKEN and ACCESS_TOKEN_SECRET."
)]
pub struct Cli {
    /// Path to a kubeconfig file (default: $KUBECONFIG, ~/.kube/config, then in-cluster)
    #[arg(long)]
    pub kubeconfig: Option<PathBuf>,

    /// Namespace holding the Tweet resources (default: from the kubeconfig context)
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Run a single reconciliation pass and exit
    #[arg(long, default_value_t = false)]
    pub once: bool,

    /// Seconds between passes in continuous mode
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval_secs: u64,
}

impl Cli {
    /// Loop settings selected on the command line.
    pub fn loop_config(&self) -> LoopConfig {
        LoopConfig {
            interval: Duration::from_secs(self.interval_secs),
            mode: if self.once {
                RunMode::Once
            } else {
                RunMode::Continuous
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_poll_every_ten_seconds() -> Result<(), clap::Error> {
        let cli = Cli::try_parse_from(["tweet-operator"])?;
        let config = cli.loop_config();

        assert_eq!(config.mode, RunMode::Continuous);
        assert_eq!(config.interval, Duration::from_secs(10));
        assert!(cli.kubeconfig.is_none());
        Ok(())
    }

    #[test]
    fn test_once_flag_selects_single_pass() -> Result<(), clap::Error> {
        let cli = Cli::try_parse_from([
            "tweet-operator",
            "--once",
            "--namespace",
            "social",
            "--kubeconfig",
            "/tmp/kubeconfig",
        ])?;

        assert_eq!(cli.loop_config().mode, RunMode::Once);
        assert_eq!(cli.namespace.as_deref(), Some("social"));
        assert_eq!(cli.kubeconfig, Some(PathBuf::from("/tmp/kubeconfig")));
        Ok(())
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let result = Cli::try_parse_from(["tweet-operator", "--interval-secs", "0"]);
        assert!(result.is_err());
    }
}
