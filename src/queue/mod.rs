//! Remote reward queue access.
//!
//! [`QueueClient`] is the seam between the reconciler and the Tebex plugin
//! API. Implementations report failures as errors; the reconciler decides
//! how to degrade.

pub mod http;
pub mod memory;

use crate::core::{Command, DueQueue, Result};
use async_trait::async_trait;

pub use http::HttpQueueClient;
pub use memory::{QueueOperation, StaticQueueClient};

pub const SECRET_HEADER: &str = "X-Tebex-Secret";

#[async_trait]
pub trait QueueClient: Send + Sync {
    /// Lists entries that are due, with queue metadata.
    async fn fetch_due(&self) -> Result<DueQueue>;

    /// Lists the online commands belonging to one entry.
    async fn fetch_commands_for(&self, entry_id: i64) -> Result<Vec<Command>>;

    /// Marks commands as executed. An empty batch sends nothing.
    async fn acknowledge(&self, command_ids: &[i64]) -> Result<()>;
}
