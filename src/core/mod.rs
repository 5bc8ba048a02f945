pub mod error;
pub mod types;

pub use error::{Result, SyncError};
pub use types::{Command, CommandConditions, DueQueue, PendingEntry, QueueMeta};
