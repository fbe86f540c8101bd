pub mod attributes;
pub mod classify;

pub use classify::{read_event, ClassifiedEvent, EventKind};
