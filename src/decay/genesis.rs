use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenesisError {
    #[error("Failed to open genesis file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse genesis: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Deserialize)]
struct GenesisFile {
    app_state: AppState,
}

#[derive(Deserialize)]
struct AppState {
    claims: ClaimsState,
}

#[derive(Deserialize)]
struct ClaimsState {
    #[serde(default)]
    claims_records: Vec<ClaimsRecord>,
}

#[derive(Deserialize)]
struct ClaimsRecord {
    address: String,
    #[serde(default)]
    initial_claimable_amount: String,
}

/// Initial claimable allocation per address, as recorded at genesis.
///
/// Amounts are kept as the decimal strings found in the file.
#[derive(Debug, Clone, Default)]
pub struct GenesisSnapshot {
    allocations: HashMap<String, String>,
}

impl GenesisSnapshot {
    pub fn load(path: &Path) -> Result<Self, GenesisError> {
        let file = File::open(path).map_err(|source| GenesisError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let snapshot = Self::from_reader(BufReader::new(file))?;
        tracing::info!(
            "Loaded {} claims records from {}",
            snapshot.len(),
            path.display()
        );
        Ok(snapshot)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, GenesisError> {
        let genesis: GenesisFile = serde_json::from_reader(reader)?;
        Ok(Self::from_records(
            genesis
                .app_state
                .claims
                .claims_records
                .into_iter()
                .map(|r| (r.address, r.initial_claimable_amount)),
        ))
    }

    pub fn from_records<I, A, V>(records: I) -> Self
    where
        I: IntoIterator<Item = (A, V)>,
        A: Into<String>,
        V: Into<String>,
    {
        Self {
            allocations: records
                .into_iter()
                .map(|(address, amount)| (address.into(), amount.into()))
                .collect(),
        }
    }

    pub fn initial_claimable_amount(&self, address: &str) -> Option<&str> {
        self.allocations.get(address).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.allocations.len()
    }
}
