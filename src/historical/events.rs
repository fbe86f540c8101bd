//! First pass: scan a height range for merge and claim events.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use super::ranges::{partition, BlockBatch};
use super::workers::{WorkerError, WorkerPool};
use crate::db::records::MAX_HEIGHT;
use crate::db::{EventBatch, EventStore};
use crate::decoding::{read_event, ClassifiedEvent};
use crate::rpc::{BlockResults, BlockSource};
use crate::types::config::collection::CollectionConfig;
use crate::types::records::ErrorRecord;

#[derive(Debug, Error)]
pub enum CollectionError {
    #[error("Invalid height range: from {from} is greater than to {to}")]
    InvalidRange { from: u64, to: u64 },

    #[error("Height {0} does not fit a BIGINT height column")]
    HeightOutOfRange(u64),

    #[error(transparent)]
    Worker(#[from] WorkerError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectionSummary {
    pub batches: u64,
    pub failed_batches: u64,
    pub heights_scanned: u64,
    pub heights_failed: u64,
    pub merge_events: u64,
    pub claim_events: u64,
    pub skipped_events: u64,
}

#[derive(Debug, Default)]
struct Counters {
    batches: AtomicU64,
    failed_batches: AtomicU64,
    heights_scanned: AtomicU64,
    heights_failed: AtomicU64,
    merge_events: AtomicU64,
    claim_events: AtomicU64,
    skipped_events: AtomicU64,
}

impl Counters {
    fn summary(&self) -> CollectionSummary {
        CollectionSummary {
            batches: self.batches.load(Ordering::Relaxed),
            failed_batches: self.failed_batches.load(Ordering::Relaxed),
            heights_scanned: self.heights_scanned.load(Ordering::Relaxed),
            heights_failed: self.heights_failed.load(Ordering::Relaxed),
            merge_events: self.merge_events.load(Ordering::Relaxed),
            claim_events: self.claim_events.load(Ordering::Relaxed),
            skipped_events: self.skipped_events.load(Ordering::Relaxed),
        }
    }
}

struct BatchContext {
    source: Arc<dyn BlockSource>,
    store: Arc<dyn EventStore>,
    record_event_failures: bool,
    counters: Counters,
}

/// Scans `[from, to]` and persists every merge and claim event found.
///
/// Every height ends up either with its events persisted or with exactly one
/// height-only ledger entry.
pub async fn collect_events(
    source: Arc<dyn BlockSource>,
    store: Arc<dyn EventStore>,
    config: &CollectionConfig,
    cancel: CancellationToken,
    from: u64,
    to: u64,
) -> Result<CollectionSummary, CollectionError> {
    if from > to {
        return Err(CollectionError::InvalidRange { from, to });
    }
    if to > MAX_HEIGHT {
        return Err(CollectionError::HeightOutOfRange(to));
    }

    tracing::info!(
        "Collecting events for heights {}-{} (batch size {}, {} workers)",
        from,
        to,
        config.batch_size,
        config.max_workers
    );

    let context = Arc::new(BatchContext {
        source,
        store,
        record_event_failures: config.record_event_failures,
        counters: Counters::default(),
    });

    let pool = WorkerPool::new(config.max_workers, config.queue_capacity(), cancel);
    let handler_context = context.clone();
    pool.run(partition(from, to, config.batch_size), move |batch| {
        let context = handler_context.clone();
        async move { process_batch(&context, batch).await }
    })
    .await?;

    let summary = context.counters.summary();
    tracing::info!(
        "Event collection finished: {} batches ({} rolled back), {} heights scanned, {} heights failed, {} merge events, {} claim events, {} events skipped",
        summary.batches,
        summary.failed_batches,
        summary.heights_scanned,
        summary.heights_failed,
        summary.merge_events,
        summary.claim_events,
        summary.skipped_events
    );
    Ok(summary)
}

async fn process_batch(context: &BatchContext, batch: BlockBatch) {
    tracing::debug!("Processing heights {}", batch);

    let mut rows = EventBatch::default();
    let mut heights_failed = 0;
    let mut skipped = 0;

    for height in batch.heights() {
        match context.source.block_results(height).await {
            Ok(block) => {
                skipped += extract_events(&block, height, context.record_event_failures, &mut rows);
            }
            Err(e) => {
                tracing::error!("{}", e);
                rows.errors.push(ErrorRecord::height(height));
                heights_failed += 1;
            }
        }
    }

    let merges = rows.merges.len() as u64;
    let claims = rows.claims.len() as u64;
    let counters = &context.counters;
    counters.batches.fetch_add(1, Ordering::Relaxed);
    counters.heights_scanned.fetch_add(batch.len(), Ordering::Relaxed);
    counters.skipped_events.fetch_add(skipped, Ordering::Relaxed);

    match context.store.write_batch(rows).await {
        Ok(()) => {
            counters.merge_events.fetch_add(merges, Ordering::Relaxed);
            counters.claim_events.fetch_add(claims, Ordering::Relaxed);
            counters.heights_failed.fetch_add(heights_failed, Ordering::Relaxed);
            tracing::info!(
                "Heights {}: {} merge events, {} claim events",
                batch,
                merges,
                claims
            );
        }
        Err(e) => {
            tracing::error!("Batch {} rolled back: {}", batch, e);
            counters.failed_batches.fetch_add(1, Ordering::Relaxed);
            counters.heights_failed.fetch_add(batch.len(), Ordering::Relaxed);

            let ledger: Vec<ErrorRecord> = batch.heights().map(ErrorRecord::height).collect();
            if let Err(e) = context.store.append_errors(&ledger).await {
                tracing::error!("Failed to record heights {} in the error ledger: {}", batch, e);
            }
        }
    }
}

/// Classifies every event of `block` into `rows`. Returns the number of
/// events of interest that had to be skipped.
pub fn extract_events(
    block: &BlockResults,
    height: u64,
    record_failures: bool,
    rows: &mut EventBatch,
) -> u64 {
    let mut skipped = 0;

    for (tx_index, tx) in block.txs().iter().enumerate() {
        for (event_index, raw) in tx.events().iter().enumerate() {
            match read_event(raw, height) {
                None => {}
                Some(Ok(ClassifiedEvent::Merge(event))) => rows.merges.push(event),
                Some(Ok(ClassifiedEvent::Claim(event))) => rows.claims.push(event),
                // Packet receipts only matter to sender resolution
                Some(Ok(ClassifiedEvent::PacketReceipt(_))) => {}
                Some(Err(e)) => {
                    tracing::warn!(
                        "Skipping '{}' event at height {} (tx {}, event {}): {}",
                        raw.kind,
                        height,
                        tx_index,
                        event_index,
                        e
                    );
                    skipped += 1;
                    if record_failures {
                        rows.errors
                            .push(ErrorRecord::event(height, &raw.kind, tx_index, event_index));
                    }
                }
            }
        }
    }

    skipped
}
