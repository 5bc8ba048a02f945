use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A due reward reported by the remote queue, bound to one subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingEntry {
    #[serde(rename = "id")]
    pub entry_id: i64,
    #[serde(rename = "uuid")]
    pub subject_key: String,
    #[serde(rename = "name", default)]
    pub display_name: String,
    /// Remaining wire fields, kept as received.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl PendingEntry {
    pub fn new(entry_id: i64, subject_key: impl Into<String>) -> Self {
        Self {
            entry_id,
            subject_key: subject_key.into(),
            display_name: String::new(),
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }
}

/// Preconditions gating a single command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandConditions {
    /// Seconds the remote side asked to wait before running. Recorded only.
    #[serde(rename = "delay", default)]
    pub delay_seconds: u64,
    /// Free inventory slots the occupant must have; 0 means no requirement.
    #[serde(rename = "slots", default)]
    pub min_empty_slots: u32,
}

impl CommandConditions {
    pub fn requires_slots(&self) -> bool {
        self.min_empty_slots > 0
    }

    /// Returns true when `free_slots` satisfies the slot requirement.
    pub fn slots_satisfied(&self, free_slots: u32) -> bool {
        !self.requires_slots() || free_slots >= self.min_empty_slots
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    #[serde(rename = "id")]
    pub command_id: i64,
    #[serde(rename = "command")]
    pub template: String,
    #[serde(rename = "package", default)]
    pub package_id: i64,
    #[serde(rename = "payment", default)]
    pub payment_id: i64,
    #[serde(default)]
    pub conditions: CommandConditions,
}

impl Command {
    pub fn new(command_id: i64, template: impl Into<String>) -> Self {
        Self {
            command_id,
            template: template.into(),
            package_id: 0,
            payment_id: 0,
            conditions: CommandConditions::default(),
        }
    }

    pub fn min_empty_slots(mut self, slots: u32) -> Self {
        self.conditions.min_empty_slots = slots;
        self
    }

    pub fn delay_seconds(mut self, delay: u64) -> Self {
        self.conditions.delay_seconds = delay;
        self
    }

    pub fn package(mut self, package_id: i64, payment_id: i64) -> Self {
        self.package_id = package_id;
        self.payment_id = payment_id;
        self
    }
}

/// Advisory metadata returned alongside the due queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueMeta {
    #[serde(rename = "execute_offline", default)]
    pub execute_offline: bool,
    #[serde(default)]
    pub more: bool,
    /// Seconds until the remote side expects the next check.
    #[serde(default)]
    pub next_check: u64,
}

impl QueueMeta {
    pub fn next_check_after(&self) -> Duration {
        Duration::from_secs(self.next_check)
    }
}

/// Result of one `GET /queue`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DueQueue {
    #[serde(default)]
    pub meta: QueueMeta,
    #[serde(rename = "players", default)]
    pub entries: Vec<PendingEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn due_queue_reads_remote_field_names() {
        let queue: DueQueue = serde_json::from_value(json!({
            "meta": {"execute_offline": true, "next_check": 120, "more": false},
            "players": [{"id": 7, "name": "Steve", "uuid": "abc-123"}]
        }))
        .unwrap();

        assert!(queue.meta.execute_offline);
        assert_eq!(queue.meta.next_check_after(), Duration::from_secs(120));
        assert_eq!(
            queue.entries,
            vec![PendingEntry::new(7, "abc-123").with_display_name("Steve")]
        );
    }

    #[test]
    fn pending_entry_keeps_unknown_fields() {
        let entry: PendingEntry = serde_json::from_value(json!({
            "id": 7,
            "name": "Steve",
            "uuid": "abc-123",
            "server": "lobby"
        }))
        .unwrap();

        assert_eq!(entry.extra.get("server"), Some(&json!("lobby")));
        assert!(!entry.extra.contains_key("uuid"));
        assert_eq!(serde_json::to_value(&entry).unwrap()["server"], "lobby");
    }

    #[test]
    fn command_conditions_default_when_absent() {
        let command: Command = serde_json::from_value(json!({
            "id": 10,
            "command": "give {username} diamond 1",
            "package": 3,
            "payment": 4
        }))
        .unwrap();

        assert_eq!(command.conditions, CommandConditions::default());
        assert!(!command.conditions.requires_slots());
    }

    #[test]
    fn slot_condition_blocks_only_below_requirement() {
        let none = CommandConditions::default();
        assert!(none.slots_satisfied(0));

        let five = Command::new(1, "x").min_empty_slots(5).conditions;
        assert!(!five.slots_satisfied(4));
        assert!(five.slots_satisfied(5));
        assert!(five.slots_satisfied(36));
    }
}
