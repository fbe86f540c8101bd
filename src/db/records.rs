//! Mapping between domain records and table rows.

use tokio_postgres::Row;

use super::error::DbError;
use super::types::{DbOperation, DbValue, WhereClause};
use crate::types::records::{
    ClaimAction, ClaimEvent, DecayRecord, ErrorRecord, MergeEvent, StoredClaimEvent,
    StoredMergeEvent, UnknownClaimAction,
};

pub const MERGE_EVENT_TABLE: &str = "merge_event";
pub const CLAIM_EVENT_TABLE: &str = "claim_event";
pub const DECAY_TABLE: &str = "decay_amount";
pub const ERROR_TABLE: &str = "error";

/// Largest height a BIGINT column can hold.
pub const MAX_HEIGHT: u64 = i64::MAX as u64;

/// Decay columns for each action, in `ClaimAction::ALL` order.
const ACTION_COLUMNS: [&str; 4] = ["vote_action", "delegate_action", "evm_action", "ibc_action"];

/// A backfilled sender for the merge event row `id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderUpdate {
    pub id: i64,
    pub sender: String,
}

fn insert(table: &str, row: Vec<(&str, DbValue)>) -> DbOperation {
    let (columns, values) = row
        .into_iter()
        .map(|(column, value)| (column.to_string(), value))
        .unzip();
    DbOperation::Insert {
        table: table.to_string(),
        columns,
        values,
    }
}

fn height_value(height: u64) -> DbValue {
    // Ranges above MAX_HEIGHT are rejected before any row is built
    DbValue::Int64(i64::try_from(height).unwrap_or(i64::MAX))
}

pub fn insert_merge_event(event: &MergeEvent) -> DbOperation {
    insert(
        MERGE_EVENT_TABLE,
        vec![
            ("recipient", DbValue::Text(event.recipient.clone())),
            ("height", height_value(event.height)),
            ("claimed_coins", DbValue::Text(event.claimed_coins.clone())),
            (
                "fund_community_pool_coins",
                DbValue::Text(event.fund_community_pool_coins.clone()),
            ),
        ],
    )
}

pub fn insert_claim_event(event: &ClaimEvent) -> DbOperation {
    insert(
        CLAIM_EVENT_TABLE,
        vec![
            ("sender", DbValue::Text(event.sender.clone())),
            ("height", height_value(event.height)),
            ("amount", DbValue::Text(event.amount.clone())),
            ("claim_action", DbValue::Text(event.action.as_str().to_string())),
        ],
    )
}

pub fn insert_error(record: &ErrorRecord) -> DbOperation {
    insert(
        ERROR_TABLE,
        vec![
            ("height", height_value(record.height)),
            ("event_type", DbValue::opt_text(record.event_type.as_deref())),
            (
                "tx_index",
                record.tx_index.map_or(DbValue::Null, |i| DbValue::Int64(i as i64)),
            ),
            (
                "event_index",
                record.event_index.map_or(DbValue::Null, |i| DbValue::Int64(i as i64)),
            ),
        ],
    )
}

pub fn insert_decay_record(record: &DecayRecord) -> DbOperation {
    let mut row = vec![("sender", DbValue::Text(record.sender.clone()))];
    for (column, action) in ACTION_COLUMNS.into_iter().zip(ClaimAction::ALL) {
        row.push((column, DbValue::opt_numeric(record.action(action))));
    }
    row.push(("total_claimed", DbValue::Numeric(record.total_claimed.to_string())));
    row.push(("total_lost", DbValue::opt_numeric(record.total_lost)));
    row.push((
        "initial_claimable_amount",
        DbValue::opt_numeric(record.initial_claimable_amount),
    ));
    insert(DECAY_TABLE, row)
}

/// Sets the sender of a merge event, only if it is still unset.
pub fn update_merge_sender(update: &SenderUpdate) -> DbOperation {
    DbOperation::Update {
        table: MERGE_EVENT_TABLE.to_string(),
        set_columns: vec![("sender".to_string(), DbValue::Text(update.sender.clone()))],
        where_clause: WhereClause::And(vec![
            ("id".to_string(), DbValue::Int64(update.id)),
            ("sender".to_string(), DbValue::Null),
        ]),
    }
}

pub fn clear_decay_records() -> DbOperation {
    DbOperation::RawSql {
        query: format!("DELETE FROM \"{}\"", DECAY_TABLE),
        params: Vec::new(),
    }
}

pub const SELECT_UNRESOLVED_MERGE_EVENTS: &str = "SELECT id, sender, recipient, height, claimed_coins, fund_community_pool_coins \
     FROM merge_event WHERE sender IS NULL ORDER BY id";

pub const SELECT_CLAIM_EVENTS: &str =
    "SELECT id, sender, height, amount, claim_action FROM claim_event ORDER BY id";

fn row_height(row: &Row, table: &'static str) -> Result<u64, DbError> {
    let height: i64 = row.try_get("height")?;
    u64::try_from(height).map_err(|_| DbError::InvalidRow {
        table,
        column: "height",
        message: format!("negative height {}", height),
    })
}

pub fn merge_event_from_row(row: &Row) -> Result<StoredMergeEvent, DbError> {
    Ok(StoredMergeEvent {
        id: row.try_get("id")?,
        sender: row.try_get("sender")?,
        event: MergeEvent {
            height: row_height(row, MERGE_EVENT_TABLE)?,
            recipient: row.try_get("recipient")?,
            claimed_coins: row.try_get("claimed_coins")?,
            fund_community_pool_coins: row.try_get("fund_community_pool_coins")?,
        },
    })
}

pub fn claim_event_from_row(row: &Row) -> Result<StoredClaimEvent, DbError> {
    let action: String = row.try_get("claim_action")?;
    let action = action.parse().map_err(|e: UnknownClaimAction| {
        DbError::InvalidRow {
            table: CLAIM_EVENT_TABLE,
            column: "claim_action",
            message: e.to_string(),
        }
    })?;

    Ok(StoredClaimEvent {
        id: row.try_get("id")?,
        event: ClaimEvent {
            height: row_height(row, CLAIM_EVENT_TABLE)?,
            sender: row.try_get("sender")?,
            action,
            amount: row.try_get("amount")?,
        },
    })
}
