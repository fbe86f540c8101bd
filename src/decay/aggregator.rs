//! Per-sender decay statistics from the ordered claim stream.

use std::collections::BTreeMap;

use alloy_primitives::{I256, U256};
use thiserror::Error;

use super::genesis::GenesisSnapshot;
use crate::types::config::decay::DoubleClaimPolicy;
use crate::types::records::{ClaimEvent, DecayRecord};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("empty amount")]
    Empty,
    #[error("'{0}' is not a non-negative integer")]
    NotAnInteger(String),
    #[error("'{0}' does not fit in 256 bits")]
    Overflow(String),
}

/// Parses a plain decimal integer such as `1000000`.
pub fn parse_units(raw: &str) -> Result<U256, AmountError> {
    if raw.is_empty() {
        return Err(AmountError::Empty);
    }
    if !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AmountError::NotAnInteger(raw.to_string()));
    }
    U256::from_str_radix(raw, 10).map_err(|_| AmountError::Overflow(raw.to_string()))
}

/// Parses an on-chain amount, e.g. `1500aevmos`, after removing `denom`.
pub fn parse_amount(raw: &str, denom: &str) -> Result<U256, AmountError> {
    parse_units(raw.strip_suffix(denom).unwrap_or(raw))
}

/// `floor(initial / 4) - claimed`. Negative when more than a quarter was claimed.
pub fn loss_for_action(initial_claimable_amount: U256, claimed: U256) -> Option<I256> {
    let expected = I256::try_from(initial_claimable_amount / U256::from(4u8)).ok()?;
    let claimed = I256::try_from(claimed).ok()?;
    expected.checked_sub(claimed)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecayStats {
    pub claims_processed: u64,
    pub double_claims: u64,
    pub rejected_claims: u64,
    pub unknown_senders: u64,
    pub unparsable_amounts: u64,
}

/// Folds claim events, in insertion order, into one [`DecayRecord`] per sender.
///
/// The result only depends on the claim sequence and the genesis snapshot.
pub struct DecayAggregator<'a> {
    genesis: &'a GenesisSnapshot,
    denom: &'a str,
    policy: DoubleClaimPolicy,
    records: BTreeMap<String, DecayRecord>,
    stats: DecayStats,
}

impl<'a> DecayAggregator<'a> {
    pub fn new(genesis: &'a GenesisSnapshot, denom: &'a str, policy: DoubleClaimPolicy) -> Self {
        Self {
            genesis,
            denom,
            policy,
            records: BTreeMap::new(),
            stats: DecayStats::default(),
        }
    }

    pub fn apply(&mut self, claim: &ClaimEvent) {
        let amount = match parse_amount(&claim.amount, self.denom) {
            Ok(amount) => amount,
            Err(e) => {
                tracing::warn!(
                    "Skipping {} claim of {} at height {}: {}",
                    claim.action,
                    claim.sender,
                    claim.height,
                    e
                );
                self.stats.unparsable_amounts += 1;
                return;
            }
        };

        let existing = self.records.get(&claim.sender);
        let previous = existing.and_then(|r| r.action(claim.action));
        let claimed_so_far = existing.map_or(U256::ZERO, |r| r.total_claimed);

        let slot = match previous {
            None => amount,
            Some(previous) => {
                tracing::warn!(
                    "Double claim of {} for address {} at height {}",
                    claim.action,
                    claim.sender,
                    claim.height
                );
                self.stats.double_claims += 1;
                match self.policy {
                    DoubleClaimPolicy::Overwrite => amount,
                    DoubleClaimPolicy::Reject => {
                        self.stats.rejected_claims += 1;
                        return;
                    }
                    DoubleClaimPolicy::Sum => match previous.checked_add(amount) {
                        Some(sum) => sum,
                        None => {
                            tracing::warn!("Summed {} claims of {} overflow", claim.action, claim.sender);
                            self.stats.unparsable_amounts += 1;
                            return;
                        }
                    },
                }
            }
        };

        let Some(total_claimed) = claimed_so_far.checked_add(amount) else {
            tracing::warn!("Total claimed by {} overflows", claim.sender);
            self.stats.unparsable_amounts += 1;
            return;
        };

        if !self.records.contains_key(&claim.sender) {
            let initial = self.initial_claimable_amount(&claim.sender);
            self.records.insert(
                claim.sender.clone(),
                DecayRecord::new(claim.sender.clone(), initial),
            );
        }
        let Some(record) = self.records.get_mut(&claim.sender) else {
            return;
        };

        *record.action_mut(claim.action) = Some(slot);
        record.total_claimed = total_claimed;

        // Reflects only the event just processed
        if let Some(initial) = record.initial_claimable_amount {
            match loss_for_action(initial, amount) {
                Some(lost) => record.total_lost = Some(lost),
                None => tracing::warn!("Loss of {} is out of range", claim.sender),
            }
        }

        self.stats.claims_processed += 1;
    }

    fn initial_claimable_amount(&mut self, sender: &str) -> Option<U256> {
        let genesis = self.genesis;
        let Some(raw) = genesis.initial_claimable_amount(sender) else {
            tracing::warn!("Address {} not found in genesis to calculate losses", sender);
            self.stats.unknown_senders += 1;
            return None;
        };
        match parse_units(raw) {
            Ok(initial) => Some(initial),
            Err(e) => {
                tracing::warn!("Invalid initial claimable amount for {}: {}", sender, e);
                None
            }
        }
    }

    /// Records ordered by sender address.
    pub fn finish(self) -> (Vec<DecayRecord>, DecayStats) {
        (self.records.into_values().collect(), self.stats)
    }
}

pub fn aggregate<'c>(
    genesis: &GenesisSnapshot,
    denom: &str,
    policy: DoubleClaimPolicy,
    claims: impl IntoIterator<Item = &'c ClaimEvent>,
) -> (Vec<DecayRecord>, DecayStats) {
    let mut aggregator = DecayAggregator::new(genesis, denom, policy);
    for claim in claims {
        aggregator.apply(claim);
    }
    aggregator.finish()
}
