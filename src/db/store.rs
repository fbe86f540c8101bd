use async_trait::async_trait;

use super::error::DbError;
use super::pool::DbPool;
use super::records::{
    claim_event_from_row, clear_decay_records, insert_claim_event, insert_decay_record,
    insert_error, insert_merge_event, merge_event_from_row, update_merge_sender, SenderUpdate,
    SELECT_CLAIM_EVENTS, SELECT_UNRESOLVED_MERGE_EVENTS,
};
use super::types::DbOperation;
use crate::types::records::{
    ClaimEvent, DecayRecord, ErrorRecord, MergeEvent, StoredClaimEvent, StoredMergeEvent,
};

/// Everything one height batch produced.
#[derive(Debug, Clone, Default)]
pub struct EventBatch {
    pub merges: Vec<MergeEvent>,
    pub claims: Vec<ClaimEvent>,
    pub errors: Vec<ErrorRecord>,
}

impl EventBatch {
    fn into_operations(self) -> Vec<DbOperation> {
        self.merges
            .iter()
            .map(insert_merge_event)
            .chain(self.claims.iter().map(insert_claim_event))
            .chain(self.errors.iter().map(insert_error))
            .collect()
    }
}

/// Persistence seam of the pipeline. Each write method is one transaction.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Writes all rows of a batch atomically.
    async fn write_batch(&self, batch: EventBatch) -> Result<(), DbError>;

    /// Appends ledger entries in their own transaction.
    async fn append_errors(&self, errors: &[ErrorRecord]) -> Result<(), DbError>;

    /// Merge events whose sender is still unknown, in insertion order.
    async fn unresolved_merge_events(&self) -> Result<Vec<StoredMergeEvent>, DbError>;

    /// Backfills senders; rows that already have one are left untouched.
    /// Returns the number of rows updated.
    async fn set_merge_senders(&self, updates: &[SenderUpdate]) -> Result<u64, DbError>;

    /// All claim events, in insertion order.
    async fn claim_events(&self) -> Result<Vec<StoredClaimEvent>, DbError>;

    /// Replaces the whole decay table.
    async fn replace_decay_records(&self, records: &[DecayRecord]) -> Result<(), DbError>;
}

#[async_trait]
impl EventStore for DbPool {
    async fn write_batch(&self, batch: EventBatch) -> Result<(), DbError> {
        self.execute_transaction(batch.into_operations()).await?;
        Ok(())
    }

    async fn append_errors(&self, errors: &[ErrorRecord]) -> Result<(), DbError> {
        self.execute_transaction(errors.iter().map(insert_error).collect())
            .await?;
        Ok(())
    }

    async fn unresolved_merge_events(&self) -> Result<Vec<StoredMergeEvent>, DbError> {
        let rows = self.query(SELECT_UNRESOLVED_MERGE_EVENTS, &[]).await?;
        rows.iter().map(merge_event_from_row).collect()
    }

    async fn set_merge_senders(&self, updates: &[SenderUpdate]) -> Result<u64, DbError> {
        self.execute_transaction(updates.iter().map(update_merge_sender).collect())
            .await
    }

    async fn claim_events(&self) -> Result<Vec<StoredClaimEvent>, DbError> {
        let rows = self.query(SELECT_CLAIM_EVENTS, &[]).await?;
        let mut events = Vec::with_capacity(rows.len());
        for row in &rows {
            match claim_event_from_row(row) {
                Ok(event) => events.push(event),
                Err(e @ DbError::InvalidRow { .. }) => {
                    tracing::warn!("Skipping claim event row: {}", e);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(events)
    }

    async fn replace_decay_records(&self, records: &[DecayRecord]) -> Result<(), DbError> {
        let mut operations = Vec::with_capacity(records.len() + 1);
        operations.push(clear_decay_records());
        operations.extend(records.iter().map(insert_decay_record));
        self.execute_transaction(operations).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::records::ClaimAction;

    #[test]
    fn test_batch_operation_order() {
        let batch = EventBatch {
            merges: vec![MergeEvent {
                height: 1,
                recipient: "evmos1r".to_string(),
                claimed_coins: "1aevmos".to_string(),
                fund_community_pool_coins: "0aevmos".to_string(),
            }],
            claims: vec![ClaimEvent {
                height: 1,
                sender: "evmos1s".to_string(),
                action: ClaimAction::Vote,
                amount: "5aevmos".to_string(),
            }],
            errors: vec![ErrorRecord::event(1, "claim", 0, 3)],
        };

        let tables: Vec<String> = batch
            .into_operations()
            .into_iter()
            .map(|op| match op {
                DbOperation::Insert { table, .. } => table,
                other => panic!("expected insert, got {:?}", other),
            })
            .collect();
        assert_eq!(tables, ["merge_event", "claim_event", "error"]);
    }

    /// Needs a scratch database: `TEST_DATABASE_URL=postgres://... cargo test -- --ignored`
    #[tokio::test]
    #[ignore]
    async fn test_failing_row_rolls_back_whole_batch() {
        let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL not set");
        let pool = DbPool::new(&url, 2).await.unwrap();
        pool.run_migrations(std::path::Path::new("migrations"))
            .await
            .unwrap();

        let marker = format!("rollback-{}", std::process::id());
        let merge = |recipient: String| MergeEvent {
            height: 7,
            recipient,
            claimed_coins: "1aevmos".to_string(),
            fund_community_pool_coins: "0aevmos".to_string(),
        };

        // PostgreSQL rejects NUL bytes in TEXT, failing the second row
        let batch = EventBatch {
            merges: vec![merge(marker.clone()), merge(format!("{}\0", marker))],
            ..Default::default()
        };
        assert!(pool.write_batch(batch).await.is_err());

        let rows = pool
            .query(
                "SELECT COUNT(*) FROM merge_event WHERE recipient = $1",
                &[&marker],
            )
            .await
            .unwrap();
        let count: i64 = rows[0].get(0);
        assert_eq!(count, 0);
    }

    /// Needs a scratch database; clears `decay_amount`.
    #[tokio::test]
    #[ignore]
    async fn test_decay_rows_with_null_amounts_are_stored() {
        use alloy_primitives::U256;

        let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL not set");
        let pool = DbPool::new(&url, 2).await.unwrap();
        pool.run_migrations(std::path::Path::new("migrations"))
            .await
            .unwrap();

        let mut partial = DecayRecord::new("evmos1partial", None);
        *partial.action_mut(ClaimAction::Vote) = Some(U256::from(100u64));
        partial.total_claimed = U256::from(100u64);
        let genesis_only = DecayRecord::new("evmos1genesis", Some(U256::from(400u64)));

        pool.replace_decay_records(&[partial, genesis_only])
            .await
            .unwrap();

        let rows = pool
            .query(
                "SELECT sender, vote_action::text, delegate_action::text, total_lost::text, \
                 initial_claimable_amount::text FROM decay_amount ORDER BY sender",
                &[],
            )
            .await
            .unwrap();
        let stored: Vec<(String, Option<String>, Option<String>, Option<String>, Option<String>)> =
            rows.iter()
                .map(|row| (row.get(0), row.get(1), row.get(2), row.get(3), row.get(4)))
                .collect();
        assert_eq!(
            stored,
            vec![
                ("evmos1genesis".to_string(), None, None, None, Some("400".to_string())),
                ("evmos1partial".to_string(), Some("100".to_string()), None, None, None),
            ]
        );
    }
}
