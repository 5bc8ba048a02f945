use super::{CommandExecutor, HostDirectory, Occupant, Realm};
use crate::core::{Result, SyncError};
use crate::identity::OnlineIdentity;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, RwLock};

/// An occupant backed by plain memory, for embedding and tests.
#[derive(Debug)]
pub struct StaticOccupant {
    subject_key: String,
    display_name: String,
    free_slots: AtomicU32,
    notices: Mutex<Vec<String>>,
}

impl StaticOccupant {
    pub fn new(subject_key: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            subject_key: subject_key.into(),
            display_name: display_name.into(),
            free_slots: AtomicU32::new(0),
            notices: Mutex::new(Vec::new()),
        }
    }

    pub fn with_free_slots(self, slots: u32) -> Self {
        self.free_slots.store(slots, Ordering::SeqCst);
        self
    }

    pub fn set_free_slots(&self, slots: u32) {
        self.free_slots.store(slots, Ordering::SeqCst);
    }

    /// Notices received so far, oldest first.
    pub fn notices(&self) -> Vec<String> {
        self.notices
            .lock()
            .map(|notices| notices.clone())
            .unwrap_or_default()
    }
}

impl Occupant for StaticOccupant {
    fn subject_key(&self) -> &str {
        &self.subject_key
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    fn free_slots(&self) -> u32 {
        self.free_slots.load(Ordering::SeqCst)
    }

    fn send_notice(&self, message: &str) {
        if let Ok(mut notices) = self.notices.lock() {
            notices.push(message.to_string());
        }
    }
}

/// A realm whose occupants connect and disconnect on demand.
#[derive(Debug)]
pub struct StaticRealm {
    name: String,
    occupants: RwLock<Vec<Arc<StaticOccupant>>>,
}

impl StaticRealm {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            occupants: RwLock::new(Vec::new()),
        }
    }

    pub fn connect(&self, occupant: Arc<StaticOccupant>) -> Result<()> {
        let mut occupants = self.occupants.write()?;
        occupants.retain(|existing| existing.subject_key != occupant.subject_key);
        occupants.push(occupant);
        Ok(())
    }

    /// Returns true if an occupant with `subject_key` was connected.
    pub fn disconnect(&self, subject_key: &str) -> Result<bool> {
        let mut occupants = self.occupants.write()?;
        let before = occupants.len();
        occupants.retain(|existing| existing.subject_key != subject_key);
        Ok(occupants.len() != before)
    }
}

impl Realm for StaticRealm {
    fn name(&self) -> &str {
        &self.name
    }

    fn occupants(&self) -> Vec<Arc<dyn Occupant>> {
        self.occupants
            .read()
            .map(|occupants| {
                occupants
                    .iter()
                    .map(|occupant| occupant.clone() as Arc<dyn Occupant>)
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Default)]
pub struct StaticHost {
    realms: RwLock<Vec<Arc<StaticRealm>>>,
}

impl StaticHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_realm(&self, realm: Arc<StaticRealm>) -> Result<()> {
        self.realms.write()?.push(realm);
        Ok(())
    }

    pub fn remove_realm(&self, name: &str) -> Result<()> {
        self.realms.write()?.retain(|realm| realm.name != name);
        Ok(())
    }
}

impl HostDirectory for StaticHost {
    fn realms(&self) -> Vec<Arc<dyn Realm>> {
        self.realms
            .read()
            .map(|realms| {
                realms
                    .iter()
                    .map(|realm| realm.clone() as Arc<dyn Realm>)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Executor that records every command it is asked to run.
///
/// Commands containing a registered failure pattern are rejected instead.
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    executed: Mutex<Vec<(String, String)>>,
    failure_patterns: Mutex<Vec<String>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_commands_containing(&self, pattern: impl Into<String>) -> Result<()> {
        self.failure_patterns.lock()?.push(pattern.into());
        Ok(())
    }

    /// `(subject_key, rendered command)` pairs, in execution order.
    pub fn executed(&self) -> Vec<(String, String)> {
        self.executed
            .lock()
            .map(|executed| executed.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl CommandExecutor for RecordingExecutor {
    async fn execute(&self, identity: &OnlineIdentity, command: &str) -> Result<()> {
        let rejected = self
            .failure_patterns
            .lock()?
            .iter()
            .any(|pattern| command.contains(pattern.as_str()));
        if rejected {
            return Err(SyncError::Execution(format!(
                "command '{}' rejected for '{}'",
                command, identity.display_name
            )));
        }

        self.executed
            .lock()?
            .push((identity.subject_key.clone(), command.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn realm_connect_replaces_same_subject() {
        let realm = StaticRealm::new("overworld");
        realm
            .connect(Arc::new(StaticOccupant::new("a", "Alice")))
            .unwrap();
        realm
            .connect(Arc::new(StaticOccupant::new("a", "Alice2")))
            .unwrap();

        let occupants = realm.occupants();
        assert_eq!(occupants.len(), 1);
        assert_eq!(occupants[0].display_name(), "Alice2");

        assert!(realm.disconnect("a").unwrap());
        assert!(!realm.disconnect("a").unwrap());
        assert!(realm.occupants().is_empty());
    }

    #[test]
    fn occupant_records_notices() {
        let occupant = StaticOccupant::new("a", "Alice").with_free_slots(3);
        occupant.send_notice("hello");
        occupant.set_free_slots(1);

        assert_eq!(occupant.free_slots(), 1);
        assert_eq!(occupant.notices(), vec!["hello".to_string()]);
    }

    #[tokio::test]
    async fn recording_executor_rejects_matching_commands() {
        let occupant: Arc<dyn Occupant> = Arc::new(StaticOccupant::new("a", "Alice"));
        let identity = OnlineIdentity::from_occupant(occupant);
        let executor = RecordingExecutor::new();
        executor.fail_commands_containing("ban").unwrap();

        executor.execute(&identity, "give Alice 1").await.unwrap();
        assert!(executor.execute(&identity, "ban Alice").await.is_err());
        assert_eq!(
            executor.executed(),
            vec![("a".to_string(), "give Alice 1".to_string())]
        );
    }
}
