use crate::host::{HostDirectory, Occupant};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A connected occupant captured during one refresh.
#[derive(Clone)]
pub struct OnlineIdentity {
    pub subject_key: String,
    pub display_name: String,
    pub session: Arc<dyn Occupant>,
}

impl OnlineIdentity {
    pub fn from_occupant(session: Arc<dyn Occupant>) -> Self {
        Self {
            subject_key: session.subject_key().to_string(),
            display_name: session.display_name().to_string(),
            session,
        }
    }

    pub fn free_slots(&self) -> u32 {
        self.session.free_slots()
    }

    pub fn send_notice(&self, message: &str) {
        self.session.send_notice(message);
    }
}

impl fmt::Debug for OnlineIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnlineIdentity")
            .field("subject_key", &self.subject_key)
            .field("display_name", &self.display_name)
            .finish()
    }
}

/// Owned copy of the tracked identities at one point in time.
pub type IdentitySnapshot = HashMap<String, OnlineIdentity>;

/// Tracks which occupants are connected, keyed by subject key.
#[derive(Debug, Default)]
pub struct IdentityTracker {
    online: IdentitySnapshot,
}

impl IdentityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears the tracked set and rebuilds it from every realm the host reports.
    pub fn refresh(&mut self, host: &dyn HostDirectory) {
        self.online.clear();
        for realm in host.realms() {
            for occupant in realm.occupants() {
                let identity = OnlineIdentity::from_occupant(occupant);
                self.online.insert(identity.subject_key.clone(), identity);
            }
        }
    }

    pub fn get(&self, subject_key: &str) -> Option<&OnlineIdentity> {
        self.online.get(subject_key)
    }

    pub fn len(&self) -> usize {
        self.online.len()
    }

    pub fn is_empty(&self) -> bool {
        self.online.is_empty()
    }

    pub fn snapshot(&self) -> IdentitySnapshot {
        self.online.clone()
    }
}
