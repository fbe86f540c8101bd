use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CollectionConfig {
    /// Heights per batch (and merge events per batch in the sender pass).
    pub batch_size: u64,
    pub max_workers: usize,
    /// Bounded queue length between the scheduler and the workers.
    /// Defaults to `max_workers`.
    pub queue_capacity: Option<usize>,
    /// Ledger events that fail decoding or classification, with their coordinates.
    pub record_event_failures: bool,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            max_workers: 5,
            queue_capacity: None,
            record_event_failures: false,
        }
    }
}

impl CollectionConfig {
    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity.unwrap_or(self.max_workers)
    }
}
