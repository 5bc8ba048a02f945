//! Host collaborator surface.
//!
//! The reconciler never touches game objects directly. Hosts expose their
//! realms and connected occupants through these traits, and perform reward
//! commands through a [`CommandExecutor`].

pub mod in_memory;

use crate::core::Result;
use crate::identity::OnlineIdentity;
use async_trait::async_trait;
use std::sync::Arc;

pub use in_memory::{RecordingExecutor, StaticHost, StaticOccupant, StaticRealm};

/// A connected occupant as seen by the host.
pub trait Occupant: Send + Sync {
    /// Stable key correlating this occupant with remote queue entries.
    fn subject_key(&self) -> &str;

    fn display_name(&self) -> &str;

    /// Number of empty inventory slots right now.
    fn free_slots(&self) -> u32;

    /// Sends a text notice to the occupant.
    fn send_notice(&self, message: &str);
}

/// A host-managed area holding connected occupants.
pub trait Realm: Send + Sync {
    fn name(&self) -> &str;

    fn occupants(&self) -> Vec<Arc<dyn Occupant>>;
}

/// Enumerates the host's active realms.
pub trait HostDirectory: Send + Sync {
    fn realms(&self) -> Vec<Arc<dyn Realm>>;
}

/// Performs a rendered reward command for an occupant.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(&self, identity: &OnlineIdentity, command: &str) -> Result<()>;
}
