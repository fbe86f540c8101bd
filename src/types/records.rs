use std::fmt;
use std::str::FromStr;

use alloy_primitives::{I256, U256};
use serde::Deserialize;

/// One of the four claimable actions of the claims module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ClaimAction {
    Vote,
    Delegate,
    Evm,
    IbcTransfer,
}

impl ClaimAction {
    pub const ALL: [ClaimAction; 4] = [
        ClaimAction::Vote,
        ClaimAction::Delegate,
        ClaimAction::Evm,
        ClaimAction::IbcTransfer,
    ];

    /// Chain representation, as emitted in the `action` attribute.
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimAction::Vote => "ACTION_VOTE",
            ClaimAction::Delegate => "ACTION_DELEGATE",
            ClaimAction::Evm => "ACTION_EVM",
            ClaimAction::IbcTransfer => "ACTION_IBC_TRANSFER",
        }
    }

    fn slot(&self) -> usize {
        match self {
            ClaimAction::Vote => 0,
            ClaimAction::Delegate => 1,
            ClaimAction::Evm => 2,
            ClaimAction::IbcTransfer => 3,
        }
    }
}

impl fmt::Display for ClaimAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownClaimAction(pub String);

impl fmt::Display for UnknownClaimAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown claim action '{}'", self.0)
    }
}

impl std::error::Error for UnknownClaimAction {}

impl FromStr for ClaimAction {
    type Err = UnknownClaimAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bare = s.strip_prefix("ACTION_").unwrap_or(s);
        match bare {
            "VOTE" => Ok(ClaimAction::Vote),
            "DELEGATE" => Ok(ClaimAction::Delegate),
            "EVM" => Ok(ClaimAction::Evm),
            "IBC_TRANSFER" => Ok(ClaimAction::IbcTransfer),
            _ => Err(UnknownClaimAction(s.to_string())),
        }
    }
}

/// A `merge_claims_records` event as found on chain. The sender is not part of
/// the event; it is resolved later from a sibling `recv_packet`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeEvent {
    pub height: u64,
    pub recipient: String,
    pub claimed_coins: String,
    pub fund_community_pool_coins: String,
}

impl MergeEvent {
    /// True when the decoded attribute tuple of another merge event equals this one.
    pub fn same_claims(&self, other: &MergeEvent) -> bool {
        self.recipient == other.recipient
            && self.claimed_coins == other.claimed_coins
            && self.fund_community_pool_coins == other.fund_community_pool_coins
    }
}

/// A persisted merge event row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMergeEvent {
    pub id: i64,
    pub sender: Option<String>,
    pub event: MergeEvent,
}

/// A `claim` event. `amount` keeps the chain string, denomination included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimEvent {
    pub height: u64,
    pub sender: String,
    pub action: ClaimAction,
    pub amount: String,
}

/// A persisted claim event row; `id` gives insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredClaimEvent {
    pub id: i64,
    pub event: ClaimEvent,
}

/// Payload of a `recv_packet` event (ICS-20 fungible token packet data).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PacketData {
    #[serde(default)]
    pub amount: String,
    #[serde(default)]
    pub denom: String,
    #[serde(default)]
    pub receiver: String,
    pub sender: String,
}

/// A height (and optionally an event coordinate) that could not be processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorRecord {
    pub height: u64,
    pub event_type: Option<String>,
    pub tx_index: Option<u32>,
    pub event_index: Option<u32>,
}

impl ErrorRecord {
    pub fn height(height: u64) -> Self {
        Self {
            height,
            event_type: None,
            tx_index: None,
            event_index: None,
        }
    }

    pub fn event(height: u64, event_type: &str, tx_index: usize, event_index: usize) -> Self {
        Self {
            height,
            event_type: Some(event_type.to_string()),
            tx_index: Some(tx_index as u32),
            event_index: Some(event_index as u32),
        }
    }
}

/// Per-sender decay statistics derived from claim events and the genesis snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecayRecord {
    pub sender: String,
    /// Claimed amount per action, indexed in `ClaimAction::ALL` order.
    pub actions: [Option<U256>; 4],
    pub total_claimed: U256,
    pub total_lost: Option<I256>,
    pub initial_claimable_amount: Option<U256>,
}

impl DecayRecord {
    pub fn new(sender: impl Into<String>, initial_claimable_amount: Option<U256>) -> Self {
        Self {
            sender: sender.into(),
            actions: [None; 4],
            total_claimed: U256::ZERO,
            total_lost: None,
            initial_claimable_amount,
        }
    }

    pub fn action(&self, action: ClaimAction) -> Option<U256> {
        self.actions[action.slot()]
    }

    pub fn action_mut(&mut self, action: ClaimAction) -> &mut Option<U256> {
        &mut self.actions[action.slot()]
    }
}
