//! Second pass: recover the sender of every merge event from the
//! `recv_packet` event relayed in the same transaction.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use super::workers::{WorkerError, WorkerPool};
use crate::db::{DbError, EventStore, SenderUpdate};
use crate::decoding::{read_event, ClassifiedEvent, EventKind};
use crate::rpc::{BlockResults, BlockSource};
use crate::types::config::collection::CollectionConfig;
use crate::types::records::{MergeEvent, StoredMergeEvent};

#[derive(Debug, Error)]
pub enum SenderResolutionError {
    #[error("Failed to load unresolved merge events: {0}")]
    Load(#[from] DbError),

    #[error(transparent)]
    Worker(#[from] WorkerError),
}

/// Why a merge event keeps a null sender. Misses are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ResolutionMiss {
    #[error("no transaction in the block carries a matching merge_claims_records event")]
    NoMatchingTx,
    #[error("the matching transaction has no readable recv_packet event")]
    NoPacketReceipt,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolutionSummary {
    pub pending: u64,
    pub resolved: u64,
    pub missed: u64,
    pub fetch_failures: u64,
    pub write_failures: u64,
}

#[derive(Debug, Default)]
struct Counters {
    resolved: AtomicU64,
    missed: AtomicU64,
    fetch_failures: AtomicU64,
    write_failures: AtomicU64,
}

struct ChunkContext {
    source: Arc<dyn BlockSource>,
    store: Arc<dyn EventStore>,
    counters: Counters,
}

/// The merge events and packet senders of one block, decoded once and
/// shared by every pending row at that height.
#[derive(Debug, Default)]
struct BlockIndex {
    txs: Vec<TxEntry>,
}

#[derive(Debug, Default)]
struct TxEntry {
    merges: Vec<MergeEvent>,
    /// Sender of the first readable `recv_packet`.
    sender: Option<String>,
}

impl BlockIndex {
    /// Only merge and packet events are decoded; packets after the first
    /// readable one in a transaction are not looked at.
    fn new(block: &BlockResults, height: u64) -> Self {
        let txs = block
            .txs()
            .iter()
            .map(|tx| {
                let mut entry = TxEntry::default();
                for raw in tx.events() {
                    match EventKind::from_tag(&raw.kind) {
                        Some(EventKind::MergeClaimsRecords) => {}
                        Some(EventKind::RecvPacket) if entry.sender.is_none() => {}
                        _ => continue,
                    }
                    match read_event(raw, height) {
                        Some(Ok(ClassifiedEvent::Merge(merge))) => entry.merges.push(merge),
                        Some(Ok(ClassifiedEvent::PacketReceipt(packet))) => {
                            entry.sender = Some(packet.sender);
                        }
                        Some(Err(e)) => {
                            tracing::debug!("Unreadable {} at height {}: {}", raw.kind, height, e);
                        }
                        _ => {}
                    }
                }
                entry
            })
            .collect();
        Self { txs }
    }

    /// The first transaction holding a merge event with the same attribute
    /// tuple wins; its first readable `recv_packet` supplies the sender.
    fn resolve_sender(&self, merge: &MergeEvent) -> Result<String, ResolutionMiss> {
        let tx = self
            .txs
            .iter()
            .find(|tx| tx.merges.iter().any(|found| found.same_claims(merge)))
            .ok_or(ResolutionMiss::NoMatchingTx)?;
        tx.sender.clone().ok_or(ResolutionMiss::NoPacketReceipt)
    }
}

/// Backfills the sender of every merge event that does not have one yet.
pub async fn collect_merge_senders(
    source: Arc<dyn BlockSource>,
    store: Arc<dyn EventStore>,
    config: &CollectionConfig,
    cancel: CancellationToken,
) -> Result<ResolutionSummary, SenderResolutionError> {
    let pending = store.unresolved_merge_events().await?;
    if pending.is_empty() {
        tracing::info!("No merge events with an unknown sender");
        return Ok(ResolutionSummary::default());
    }

    let chunk_size = usize::try_from(config.batch_size).unwrap_or(usize::MAX).max(1);
    tracing::info!(
        "Resolving senders for {} merge events in chunks of {}",
        pending.len(),
        chunk_size
    );

    let chunks: Vec<Vec<StoredMergeEvent>> =
        pending.chunks(chunk_size).map(|c| c.to_vec()).collect();

    let context = Arc::new(ChunkContext {
        source,
        store,
        counters: Counters::default(),
    });

    let pool = WorkerPool::new(config.max_workers, config.queue_capacity(), cancel);
    let handler_context = context.clone();
    pool.run(chunks, move |chunk| {
        let context = handler_context.clone();
        async move { resolve_chunk(&context, chunk).await }
    })
    .await?;

    let counters = &context.counters;
    let summary = ResolutionSummary {
        pending: pending.len() as u64,
        resolved: counters.resolved.load(Ordering::Relaxed),
        missed: counters.missed.load(Ordering::Relaxed),
        fetch_failures: counters.fetch_failures.load(Ordering::Relaxed),
        write_failures: counters.write_failures.load(Ordering::Relaxed),
    };
    tracing::info!(
        "Sender resolution finished: {} of {} resolved, {} missed, {} fetch failures, {} not written",
        summary.resolved,
        summary.pending,
        summary.missed,
        summary.fetch_failures,
        summary.write_failures
    );
    Ok(summary)
}

async fn resolve_chunk(context: &ChunkContext, chunk: Vec<StoredMergeEvent>) {
    let counters = &context.counters;
    let mut cached: Option<(u64, BlockIndex)> = None;
    let mut updates = Vec::with_capacity(chunk.len());

    for stored in chunk {
        let height = stored.event.height;

        if cached.as_ref().map(|(h, _)| *h) != Some(height) {
            cached = match context.source.block_results(height).await {
                Ok(block) => Some((height, BlockIndex::new(&block, height))),
                Err(e) => {
                    tracing::warn!("Merge event {} keeps no sender: {}", stored.id, e);
                    counters.fetch_failures.fetch_add(1, Ordering::Relaxed);
                    None
                }
            };
        }
        let Some((_, index)) = &cached else {
            continue;
        };

        match index.resolve_sender(&stored.event) {
            Ok(sender) => updates.push(SenderUpdate {
                id: stored.id,
                sender,
            }),
            Err(miss) => {
                tracing::warn!(
                    "Merge event {} at height {} (recipient {}): {}",
                    stored.id,
                    height,
                    stored.event.recipient,
                    miss
                );
                counters.missed.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    if updates.is_empty() {
        return;
    }

    match context.store.set_merge_senders(&updates).await {
        Ok(updated) => {
            counters.resolved.fetch_add(updated, Ordering::Relaxed);
        }
        Err(e) => {
            tracing::error!("Failed to write {} resolved senders: {}", updates.len(), e);
            counters
                .write_failures
                .fetch_add(updates.len() as u64, Ordering::Relaxed);
        }
    }
}
