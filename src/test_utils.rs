//! Builders for synthetic blocks used across unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::rpc::{
    BlockFetchError, BlockResults, BlockSource, RawAttribute, RawEvent, RpcError, TxResult,
};

/// A raw event whose keys and values are base64 encoded the way the node sends them.
pub fn raw_event(kind: &str, attributes: &[(&str, &str)]) -> RawEvent {
    RawEvent {
        kind: kind.to_string(),
        attributes: attributes
            .iter()
            .map(|(key, value)| RawAttribute {
                key: Some(BASE64.encode(key)),
                value: Some(BASE64.encode(value)),
                index: true,
            })
            .collect(),
    }
}

pub fn merge_event(recipient: &str, claimed: &str, pool: &str) -> RawEvent {
    raw_event(
        "merge_claims_records",
        &[
            ("recipient", recipient),
            ("claimed_coins", claimed),
            ("fund_community_pool_coins", pool),
        ],
    )
}

pub fn claim_event(sender: &str, amount: &str, action: &str) -> RawEvent {
    raw_event(
        "claim",
        &[("sender", sender), ("amount", amount), ("action", action)],
    )
}

pub fn recv_packet(sender: &str) -> RawEvent {
    let packet = format!(
        r#"{{"amount":"100","denom":"transfer/channel-0/uosmo","receiver":"evmos1receiver","sender":"{}"}}"#,
        sender
    );
    raw_event("recv_packet", &[("packet_data", &packet)])
}

/// A block with one transaction per entry of `txs`.
pub fn block(txs: Vec<Vec<RawEvent>>) -> BlockResults {
    BlockResults::new(txs.into_iter().map(TxResult::new).collect())
}

/// A `BlockSource` serving canned blocks. Heights without a block fail as if
/// the retry budget had been exhausted.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    blocks: HashMap<u64, BlockResults>,
    requests: Mutex<Vec<u64>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_block(mut self, height: u64, block: BlockResults) -> Self {
        self.blocks.insert(height, block);
        self
    }

    /// Heights requested so far, in request order.
    pub fn requests(&self) -> Vec<u64> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl BlockSource for ScriptedSource {
    async fn block_results(&self, height: u64) -> Result<BlockResults, BlockFetchError> {
        self.requests.lock().unwrap().push(height);
        self.blocks
            .get(&height)
            .cloned()
            .ok_or_else(|| BlockFetchError {
                height,
                source: RpcError::Status(503),
            })
    }
}
