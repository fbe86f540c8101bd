pub mod error;
#[cfg(test)]
pub mod memory;
pub mod migrations;
pub mod pool;
pub mod records;
pub mod store;
pub mod types;

pub use error::DbError;
pub use pool::DbPool;
pub use records::SenderUpdate;
pub use store::{EventBatch, EventStore};
