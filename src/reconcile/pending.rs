use crate::core::PendingEntry;

/// Due entries held between fetches, at most one per subject key.
///
/// Iteration follows fetch order. A later entry for an already-present key
/// overwrites it in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingSet {
    entries: Vec<PendingEntry>,
}

impl PendingSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<PendingEntry>) -> Self {
        let mut set = Self::new();
        set.replace_all(entries);
        set
    }

    /// Drops everything held and keeps exactly `entries`, keyed by subject.
    pub fn replace_all(&mut self, entries: Vec<PendingEntry>) {
        self.entries.clear();
        for entry in entries {
            match self
                .entries
                .iter_mut()
                .find(|existing| existing.subject_key == entry.subject_key)
            {
                Some(existing) => *existing = entry,
                None => self.entries.push(entry),
            }
        }
    }

    pub fn remove(&mut self, subject_key: &str) -> Option<PendingEntry> {
        let index = self
            .entries
            .iter()
            .position(|entry| entry.subject_key == subject_key)?;
        Some(self.entries.remove(index))
    }

    pub fn get(&self, subject_key: &str) -> Option<&PendingEntry> {
        self.entries
            .iter()
            .find(|entry| entry.subject_key == subject_key)
    }

    pub fn contains(&self, subject_key: &str) -> bool {
        self.get(subject_key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
