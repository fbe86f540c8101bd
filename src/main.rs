mod db;
mod decay;
mod decoding;
mod historical;
mod rpc;
#[cfg(test)]
mod test_utils;
mod types;

use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use url::Url;

use db::DbPool;
use decay::{calculate_decay_loss, GenesisSnapshot};
use historical::{collect_events, collect_merge_senders};
use rpc::{RpcClient, RpcClientConfig};
use types::config::indexer::IndexerConfig;

const MIGRATIONS_DIR: &str = "migrations";

#[derive(Debug, Parser)]
#[command(
    name = "claims-decay-indexer",
    about = "Collects claims events from historical blocks and computes decay losses"
)]
struct Cli {
    /// Path to the JSON config file
    #[arg(long, default_value = "config/config.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Scan heights `from..=to` for merge and claim events
    CollectEvents { from: u64, to: u64 },
    /// Resolve the sender of every merge event that has none yet
    CollectMergeSenders,
    /// Rebuild the decay table from claim events and the genesis snapshot
    CalculateDecayLoss,
}

impl Command {
    fn needs_node(&self) -> bool {
        !matches!(self, Command::CalculateDecayLoss)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = IndexerConfig::load(&cli.config)?;

    if let Command::CollectEvents { from, to } = cli.command {
        anyhow::ensure!(from <= to, "from ({}) must not be greater than to ({})", from, to);
    }

    let mut required = vec![config.database_url_env_var.as_str()];
    if cli.command.needs_node() {
        required.push(config.node_url_env_var.as_str());
    }
    load_required_env_vars(&required)?;

    let database_url = env::var(&config.database_url_env_var)?;
    let pool = DbPool::new(&database_url, config.collection.max_workers + 1)
        .await
        .context("Failed to connect to the database")?;
    pool.run_migrations(Path::new(MIGRATIONS_DIR))
        .await
        .context("Failed to run migrations")?;
    let store = Arc::new(pool);

    let cancel = CancellationToken::new();
    spawn_shutdown_listener(cancel.clone());

    match cli.command {
        Command::CollectEvents { from, to } => {
            let source = Arc::new(build_rpc_client(&config)?);
            collect_events(source, store, &config.collection, cancel, from, to).await?;
        }
        Command::CollectMergeSenders => {
            let source = Arc::new(build_rpc_client(&config)?);
            collect_merge_senders(source, store, &config.collection, cancel).await?;
        }
        Command::CalculateDecayLoss => {
            let genesis = GenesisSnapshot::load(&config.genesis_path)?;
            calculate_decay_loss(store.as_ref(), &genesis, &config.denom, &config.decay).await?;
        }
    }

    tracing::info!("Done");
    Ok(())
}

/// Ensures all required env vars are set, loading .env if needed.
fn load_required_env_vars(required: &[&str]) -> anyhow::Result<()> {
    let missing: Vec<&&str> = required
        .iter()
        .filter(|var| env::var(var).is_err())
        .collect();

    if missing.is_empty() {
        return Ok(());
    }

    dotenvy::dotenv().with_context(|| {
        format!(
            "Missing env vars {:?} and failed to load .env file",
            missing
        )
    })?;

    let still_missing: Vec<&str> = required
        .iter()
        .filter(|var| env::var(var).is_err())
        .copied()
        .collect();

    anyhow::ensure!(
        still_missing.is_empty(),
        "Missing required env vars after loading .env: {:?}",
        still_missing
    );

    Ok(())
}

fn build_rpc_client(config: &IndexerConfig) -> anyhow::Result<RpcClient> {
    let raw_url = env::var(&config.node_url_env_var)?;
    let url = Url::parse(&raw_url)
        .with_context(|| format!("Invalid node URL in {}", config.node_url_env_var))?;

    let client_config = RpcClientConfig::new(url)
        .with_retry(config.rpc.retry_config())
        .with_rate_limit(config.rpc.rate_limit());

    let client = RpcClient::new(client_config)?;
    tracing::info!("Using node {}", client.config().url);
    Ok(client)
}

/// First Ctrl-C stops dispatching new batches; running ones finish.
fn spawn_shutdown_listener(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing in-flight batches");
            cancel.cancel();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_collect_events() {
        let cli = Cli::try_parse_from(["claims-decay-indexer", "collect-events", "265401", "353670"])
            .unwrap();
        assert!(matches!(
            cli.command,
            Command::CollectEvents {
                from: 265_401,
                to: 353_670
            }
        ));
        assert_eq!(cli.config, PathBuf::from("config/config.json"));
    }

    #[test]
    fn test_cli_rejects_malformed_heights() {
        assert!(Cli::try_parse_from(["claims-decay-indexer", "collect-events", "ten", "20"]).is_err());
        assert!(Cli::try_parse_from(["claims-decay-indexer", "collect-events", "10"]).is_err());
    }

    #[test]
    fn test_cli_parses_other_commands() {
        let cli = Cli::try_parse_from([
            "claims-decay-indexer",
            "--config",
            "other.json",
            "calculate-decay-loss",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::CalculateDecayLoss));
        assert!(!cli.command.needs_node());

        let cli = Cli::try_parse_from(["claims-decay-indexer", "collect-merge-senders"]).unwrap();
        assert!(cli.command.needs_node());
    }
}
