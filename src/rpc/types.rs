//! Wire types of the node's `block_results` endpoint.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct BlockResultsResponse {
    #[serde(default)]
    pub result: Option<BlockResults>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlockResults {
    #[serde(default)]
    txs_results: Option<Vec<TxResult>>,
}

impl BlockResults {
    #[cfg(test)]
    pub fn new(txs: Vec<TxResult>) -> Self {
        Self {
            txs_results: Some(txs),
        }
    }

    /// Transaction results in block order. Empty blocks report `null`.
    pub fn txs(&self) -> &[TxResult] {
        self.txs_results.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TxResult {
    #[serde(default)]
    events: Option<Vec<RawEvent>>,
}

impl TxResult {
    #[cfg(test)]
    pub fn new(events: Vec<RawEvent>) -> Self {
        Self {
            events: Some(events),
        }
    }

    pub fn events(&self) -> &[RawEvent] {
        self.events.as_deref().unwrap_or_default()
    }
}

/// An event whose attribute values are still transport encoded.
#[derive(Debug, Clone, Deserialize)]
pub struct RawEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub attributes: Vec<RawAttribute>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawAttribute {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub index: bool,
}
