use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use crate::types::config::collection::CollectionConfig;
use crate::types::config::decay::DecayConfig;
use crate::types::config::rpc::RpcSettings;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    /// Env var holding the node's RPC base URL.
    pub node_url_env_var: String,
    /// Env var holding the PostgreSQL connection string.
    pub database_url_env_var: String,
    pub genesis_path: PathBuf,
    /// Denomination suffix carried by on-chain amounts, e.g. `1000aevmos`.
    pub denom: String,
    pub collection: CollectionConfig,
    pub rpc: RpcSettings,
    pub decay: DecayConfig,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            node_url_env_var: "NODE_URL".to_string(),
            database_url_env_var: "DATABASE_URL".to_string(),
            genesis_path: PathBuf::from("genesis.json"),
            denom: "aevmos".to_string(),
            collection: CollectionConfig::default(),
            rpc: RpcSettings::default(),
            decay: DecayConfig::default(),
        }
    }
}

impl IndexerConfig {
    /// Loads the config file, falling back to defaults when it does not exist.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::info!(
                "No config file at {}, using default configuration",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at {}", path.display()))?;
        let config: IndexerConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.collection.batch_size > 0,
            "collection.batch_size must be at least 1"
        );
        anyhow::ensure!(
            self.collection.max_workers > 0,
            "collection.max_workers must be at least 1"
        );
        anyhow::ensure!(
            self.collection.queue_capacity != Some(0),
            "collection.queue_capacity must be at least 1"
        );
        anyhow::ensure!(
            self.rpc.requests_per_second != Some(0),
            "rpc.requests_per_second must be at least 1"
        );
        Ok(())
    }
}
