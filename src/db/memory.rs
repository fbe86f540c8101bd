//! In-memory `EventStore` for pipeline tests.
//!
//! Any row whose text contains [`POISON`] fails the transaction it belongs
//! to, which leaves the store exactly as it was before the call.

use std::sync::Mutex;

use async_trait::async_trait;

use super::error::DbError;
use super::records::SenderUpdate;
use super::store::{EventBatch, EventStore};
use crate::types::records::{
    ClaimEvent, DecayRecord, ErrorRecord, MergeEvent, StoredClaimEvent, StoredMergeEvent,
};

pub const POISON: &str = "\u{0}poison";

#[derive(Debug, Default)]
struct Tables {
    next_id: i64,
    merges: Vec<StoredMergeEvent>,
    claims: Vec<StoredClaimEvent>,
    errors: Vec<ErrorRecord>,
    decay: Vec<DecayRecord>,
    transactions: usize,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

fn rejected(what: &str) -> DbError {
    DbError::IoError(std::io::Error::other(format!("rejected {} row", what)))
}

fn check_merge(event: &MergeEvent) -> Result<(), DbError> {
    if event.recipient.contains(POISON) {
        return Err(rejected("merge_event"));
    }
    Ok(())
}

fn check_claim(event: &ClaimEvent) -> Result<(), DbError> {
    if event.sender.contains(POISON) {
        return Err(rejected("claim_event"));
    }
    Ok(())
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_merge_events(events: Vec<StoredMergeEvent>) -> Self {
        let store = Self::default();
        {
            let mut tables = store.lock();
            tables.next_id = events.iter().map(|e| e.id).max().unwrap_or(0);
            tables.merges = events;
        }
        store
    }

    pub fn with_claim_events(events: Vec<ClaimEvent>) -> Self {
        let store = Self::default();
        {
            let mut tables = store.lock();
            for event in events {
                let id = tables.next_id();
                tables.claims.push(StoredClaimEvent { id, event });
            }
        }
        store
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().unwrap()
    }

    pub fn merges(&self) -> Vec<StoredMergeEvent> {
        self.lock().merges.clone()
    }

    pub fn claims(&self) -> Vec<StoredClaimEvent> {
        self.lock().claims.clone()
    }

    pub fn errors(&self) -> Vec<ErrorRecord> {
        self.lock().errors.clone()
    }

    pub fn decay(&self) -> Vec<DecayRecord> {
        self.lock().decay.clone()
    }

    /// Number of committed transactions.
    pub fn transactions(&self) -> usize {
        self.lock().transactions
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn write_batch(&self, batch: EventBatch) -> Result<(), DbError> {
        batch.merges.iter().try_for_each(check_merge)?;
        batch.claims.iter().try_for_each(check_claim)?;

        let mut tables = self.lock();
        for event in batch.merges {
            let id = tables.next_id();
            tables.merges.push(StoredMergeEvent {
                id,
                sender: None,
                event,
            });
        }
        for event in batch.claims {
            let id = tables.next_id();
            tables.claims.push(StoredClaimEvent { id, event });
        }
        tables.errors.extend(batch.errors);
        tables.transactions += 1;
        Ok(())
    }

    async fn append_errors(&self, errors: &[ErrorRecord]) -> Result<(), DbError> {
        let mut tables = self.lock();
        tables.errors.extend_from_slice(errors);
        tables.transactions += 1;
        Ok(())
    }

    async fn unresolved_merge_events(&self) -> Result<Vec<StoredMergeEvent>, DbError> {
        let tables = self.lock();
        Ok(tables
            .merges
            .iter()
            .filter(|m| m.sender.is_none())
            .cloned()
            .collect())
    }

    async fn set_merge_senders(&self, updates: &[SenderUpdate]) -> Result<u64, DbError> {
        if updates.iter().any(|u| u.sender.contains(POISON)) {
            return Err(rejected("merge_event"));
        }

        let mut tables = self.lock();
        let mut updated = 0;
        for update in updates {
            if let Some(row) = tables
                .merges
                .iter_mut()
                .find(|m| m.id == update.id && m.sender.is_none())
            {
                row.sender = Some(update.sender.clone());
                updated += 1;
            }
        }
        tables.transactions += 1;
        Ok(updated)
    }

    async fn claim_events(&self) -> Result<Vec<StoredClaimEvent>, DbError> {
        Ok(self.claims())
    }

    async fn replace_decay_records(&self, records: &[DecayRecord]) -> Result<(), DbError> {
        let mut tables = self.lock();
        tables.decay = records.to_vec();
        tables.transactions += 1;
        Ok(())
    }
}
