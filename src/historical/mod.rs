pub mod events;
pub mod merge_senders;
pub mod ranges;
pub mod workers;

pub use events::collect_events;
pub use merge_senders::collect_merge_senders;
