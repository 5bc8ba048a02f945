use super::QueueClient;
use crate::core::{Command, DueQueue, PendingEntry, QueueMeta, Result, SyncError};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueOperation {
    FetchDue,
    FetchCommands,
    Acknowledge,
}

#[derive(Debug, Default)]
struct StaticQueueState {
    due: DueQueue,
    commands: HashMap<i64, Vec<Command>>,
    failing: HashSet<QueueOperation>,
    due_fetches: usize,
    command_fetches: Vec<i64>,
    acknowledged: Vec<Vec<i64>>,
}

/// An in-memory `QueueClient` with scripted responses.
///
/// Acknowledged commands are removed from their entries, so later command
/// fetches behave like the remote service would.
#[derive(Debug, Default)]
pub struct StaticQueueClient {
    state: Mutex<StaticQueueState>,
}

impl StaticQueueClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the due queue served by `fetch_due`.
    pub async fn set_due(&self, entries: Vec<PendingEntry>, meta: QueueMeta) {
        let mut state = self.state.lock().await;
        state.due = DueQueue { meta, entries };
    }

    pub async fn set_commands(&self, entry_id: i64, commands: Vec<Command>) {
        let mut state = self.state.lock().await;
        state.commands.insert(entry_id, commands);
    }

    /// Makes every call of `operation` fail until cleared.
    pub async fn fail(&self, operation: QueueOperation, failing: bool) {
        let mut state = self.state.lock().await;
        if failing {
            state.failing.insert(operation);
        } else {
            state.failing.remove(&operation);
        }
    }

    pub async fn due_fetches(&self) -> usize {
        self.state.lock().await.due_fetches
    }

    /// Entry ids passed to `fetch_commands_for`, in call order.
    pub async fn command_fetches(&self) -> Vec<i64> {
        self.state.lock().await.command_fetches.clone()
    }

    /// Every successfully acknowledged batch, in call order.
    pub async fn acknowledged(&self) -> Vec<Vec<i64>> {
        self.state.lock().await.acknowledged.clone()
    }

    fn check(state: &StaticQueueState, operation: QueueOperation) -> Result<()> {
        if state.failing.contains(&operation) {
            return Err(SyncError::Transport(format!(
                "{:?} failure injected",
                operation
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl QueueClient for StaticQueueClient {
    async fn fetch_due(&self) -> Result<DueQueue> {
        let mut state = self.state.lock().await;
        state.due_fetches += 1;
        Self::check(&state, QueueOperation::FetchDue)?;
        Ok(state.due.clone())
    }

    async fn fetch_commands_for(&self, entry_id: i64) -> Result<Vec<Command>> {
        let mut state = self.state.lock().await;
        state.command_fetches.push(entry_id);
        Self::check(&state, QueueOperation::FetchCommands)?;
        Ok(state.commands.get(&entry_id).cloned().unwrap_or_default())
    }

    async fn acknowledge(&self, command_ids: &[i64]) -> Result<()> {
        if command_ids.is_empty() {
            return Ok(());
        }

        let mut state = self.state.lock().await;
        Self::check(&state, QueueOperation::Acknowledge)?;
        for commands in state.commands.values_mut() {
            commands.retain(|command| !command_ids.contains(&command.command_id));
        }
        state.acknowledged.push(command_ids.to_vec());
        Ok(())
    }
}
