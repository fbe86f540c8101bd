pub mod aggregator;
pub mod genesis;

use thiserror::Error;

pub use aggregator::{aggregate, DecayStats};
pub use genesis::GenesisSnapshot;

use crate::db::{DbError, EventStore};
use crate::types::config::decay::DecayConfig;

#[derive(Debug, Error)]
pub enum DecayError {
    #[error("Failed to read claim events: {0}")]
    Load(#[source] DbError),

    #[error("Failed to store decay records: {0}")]
    Store(#[source] DbError),
}

/// Rebuilds the decay table from every persisted claim event.
pub async fn calculate_decay_loss(
    store: &dyn EventStore,
    genesis: &GenesisSnapshot,
    denom: &str,
    config: &DecayConfig,
) -> Result<DecayStats, DecayError> {
    let claims = store.claim_events().await.map_err(DecayError::Load)?;
    tracing::info!(
        "Aggregating {} claim events (double claim policy: {:?})",
        claims.len(),
        config.double_claim_policy
    );

    let (records, stats) = aggregate(
        genesis,
        denom,
        config.double_claim_policy,
        claims.iter().map(|c| &c.event),
    );

    store
        .replace_decay_records(&records)
        .await
        .map_err(DecayError::Store)?;

    tracing::info!(
        "Stored decay records for {} senders: {} claims applied, {} double claims ({} rejected), {} senders missing from genesis, {} unparsable amounts",
        records.len(),
        stats.claims_processed,
        stats.double_claims,
        stats.rejected_claims,
        stats.unknown_senders,
        stats.unparsable_amounts
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use alloy_primitives::U256;

    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::types::config::decay::DoubleClaimPolicy;
    use crate::types::records::{ClaimAction, ClaimEvent};

    fn claim(sender: &str, action: ClaimAction, amount: &str) -> ClaimEvent {
        ClaimEvent {
            height: 1,
            sender: sender.to_string(),
            action,
            amount: amount.to_string(),
        }
    }

    #[tokio::test]
    async fn test_rerun_replaces_records() {
        let store = MemoryStore::with_claim_events(vec![
            claim("evmos1a", ClaimAction::Vote, "100aevmos"),
            claim("evmos1b", ClaimAction::Evm, "40aevmos"),
            claim("evmos1a", ClaimAction::Delegate, "200aevmos"),
        ]);
        let genesis = GenesisSnapshot::from_records([("evmos1a", "4000"), ("evmos1b", "160")]);
        let config = DecayConfig::default();

        let first = calculate_decay_loss(&store, &genesis, "aevmos", &config)
            .await
            .unwrap();
        let after_first = store.decay();
        let second = calculate_decay_loss(&store, &genesis, "aevmos", &config)
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(after_first, store.decay());
        assert_eq!(store.decay().len(), 2);
        assert_eq!(store.decay()[0].total_claimed, U256::from(300u64));
        assert_eq!(store.transactions(), 2);
    }

    #[tokio::test]
    async fn test_policy_comes_from_config() {
        let store = MemoryStore::with_claim_events(vec![
            claim("evmos1a", ClaimAction::Vote, "100aevmos"),
            claim("evmos1a", ClaimAction::Vote, "5aevmos"),
        ]);
        let genesis = GenesisSnapshot::from_records([("evmos1a", "4000")]);
        let config = DecayConfig {
            double_claim_policy: DoubleClaimPolicy::Reject,
        };

        let stats = calculate_decay_loss(&store, &genesis, "aevmos", &config)
            .await
            .unwrap();

        assert_eq!(stats.rejected_claims, 1);
        assert_eq!(
            store.decay()[0].action(ClaimAction::Vote),
            Some(U256::from(100u64))
        );
    }
}
