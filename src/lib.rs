// ============================================================================
// Tebex Sync Library
// ============================================================================

pub mod config;
pub mod core;
pub mod host;
pub mod identity;
pub mod queue;
pub mod reconcile;
pub mod scheduler;

// Re-export main types for convenience
pub use config::SyncConfig;
pub use crate::core::{Command, CommandConditions, DueQueue, PendingEntry, QueueMeta, Result, SyncError};

// Re-export collaborator surface
pub use host::{
    CommandExecutor, HostDirectory, Occupant, Realm,
    in_memory::{RecordingExecutor, StaticHost, StaticOccupant, StaticRealm},
};
pub use identity::{IdentitySnapshot, IdentityTracker, OnlineIdentity};
pub use queue::{HttpQueueClient, QueueClient, QueueOperation, StaticQueueClient};

// Re-export reconcile API
pub use reconcile::{
    CycleReport, ExecutionResult, PendingSet, Reconciler, RetentionPolicy,
    completed_command_ids, render_command, slots_notice,
};
pub use scheduler::{Cadence, RewardSyncService, ScheduledTask, SyncStats};
