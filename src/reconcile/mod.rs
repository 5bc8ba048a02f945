//! Matching due entries against connected identities.
//!
//! A cycle fetches the due queue, runs the commands of every entry whose
//! subject is online, and acknowledges the commands that actually ran.
//! Remote failures never abort the cycle; they are logged and the cycle
//! carries on with whatever data it has.

pub mod pending;
pub mod template;

use crate::config::SyncConfig;
use crate::core::{Command, PendingEntry, QueueMeta};
use crate::host::CommandExecutor;
use crate::identity::{IdentitySnapshot, OnlineIdentity};
use crate::queue::QueueClient;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::{Instrument, Level, event, info_span};
use uuid::Uuid;

pub use pending::PendingSet;
pub use template::{render_command, slots_notice};

/// What happens to a matched entry once its commands have been attempted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RetentionPolicy {
    /// Remove the entry after any attempt, even if some commands were deferred.
    #[default]
    DropAfterAttempt,
    /// Keep the entry while any of its commands was deferred or failed.
    RetainUnfinished,
}

/// Outcome of one identity's commands in a single cycle.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub subject_key: String,
    pub identity: OnlineIdentity,
    /// Commands that ran; these are acknowledged.
    pub completed: Vec<i64>,
    /// Commands skipped because a condition was not met.
    pub deferred: Vec<i64>,
    /// Commands the executor rejected.
    pub failed: Vec<i64>,
}

impl ExecutionResult {
    fn new(identity: &OnlineIdentity) -> Self {
        Self {
            subject_key: identity.subject_key.clone(),
            identity: identity.clone(),
            completed: Vec::new(),
            deferred: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.deferred.is_empty() && self.failed.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    /// Entries returned by the fetch, or `None` if the fetch failed.
    pub fetched: Option<usize>,
    pub results: Vec<ExecutionResult>,
    /// Ids sent in the acknowledgment, empty if none was sent.
    pub acknowledged: Vec<i64>,
    pub ack_error: Option<String>,
}

impl CycleReport {
    pub fn executed_count(&self) -> usize {
        self.results.iter().map(|r| r.completed.len()).sum()
    }

    pub fn deferred_count(&self) -> usize {
        self.results.iter().map(|r| r.deferred.len()).sum()
    }

    pub fn failed_count(&self) -> usize {
        self.results.iter().map(|r| r.failed.len()).sum()
    }
}

/// Flattens completed ids across results, first occurrence wins.
pub fn completed_command_ids(results: &[ExecutionResult]) -> Vec<i64> {
    let mut seen = HashSet::new();
    results
        .iter()
        .flat_map(|result| result.completed.iter().copied())
        .filter(|id| seen.insert(*id))
        .collect()
}

/// Owns the pending set between fetches and runs reconcile passes over it.
#[derive(Debug, Default)]
pub struct Reconciler {
    pending: PendingSet,
    retention: RetentionPolicy,
    log_queue_activity: bool,
    last_meta: Option<QueueMeta>,
    last_fetch_at: Option<DateTime<Utc>>,
}

impl Reconciler {
    pub fn new(retention: RetentionPolicy) -> Self {
        Self {
            retention,
            ..Self::default()
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            retention: config.retention,
            log_queue_activity: config.log_queue_activity,
            ..Self::default()
        }
    }

    pub fn pending(&self) -> &PendingSet {
        &self.pending
    }

    pub fn retention(&self) -> RetentionPolicy {
        self.retention
    }

    /// Metadata of the last successful fetch.
    pub fn last_meta(&self) -> Option<QueueMeta> {
        self.last_meta
    }

    pub fn last_fetch_at(&self) -> Option<DateTime<Utc>> {
        self.last_fetch_at
    }

    /// Whether the remote side allows offline commands, per the last fetch.
    pub fn offline_commands_allowed(&self) -> bool {
        self.last_meta.is_some_and(|meta| meta.execute_offline)
    }

    /// Replaces the pending set with the remote due queue.
    ///
    /// On failure the previous set is kept and `None` is returned.
    pub async fn refresh_pending(&mut self, client: &dyn QueueClient) -> Option<usize> {
        match client.fetch_due().await {
            Ok(queue) => {
                let fetched = queue.entries.len();
                if self.log_queue_activity {
                    event!(
                        Level::INFO,
                        entries = fetched,
                        execute_offline = queue.meta.execute_offline,
                        "found {} players awaiting rewards with{} offline commands",
                        fetched,
                        if queue.meta.execute_offline { "" } else { " NO" }
                    );
                }
                self.pending.replace_all(queue.entries);
                self.last_meta = Some(queue.meta);
                self.last_fetch_at = Some(Utc::now());
                Some(fetched)
            }
            Err(err) => {
                event!(
                    Level::ERROR,
                    error = %err,
                    pending = self.pending.len(),
                    "failed to fetch the due queue, keeping previous entries"
                );
                None
            }
        }
    }

    /// Runs the commands of every pending entry whose subject is online.
    pub async fn reconcile(
        &mut self,
        client: &dyn QueueClient,
        executor: &dyn CommandExecutor,
        identities: &IdentitySnapshot,
    ) -> Vec<ExecutionResult> {
        let due: Vec<PendingEntry> = self.pending.iter().cloned().collect();
        let mut results = Vec::new();

        for entry in due {
            let Some(identity) = identities.get(&entry.subject_key) else {
                continue;
            };

            let commands = match client.fetch_commands_for(entry.entry_id).await {
                Ok(commands) => Some(commands),
                Err(err) => {
                    event!(
                        Level::WARN,
                        error = %err,
                        entry_id = entry.entry_id,
                        subject = %entry.subject_key,
                        "failed to fetch commands"
                    );
                    None
                }
            };
            let fetch_failed = commands.is_none();
            let commands = commands.unwrap_or_default();

            let result = Self::execute_commands(executor, identity, &commands).await;

            let finished = !fetch_failed && result.is_finished();
            if self.retention == RetentionPolicy::DropAfterAttempt || finished {
                self.pending.remove(&entry.subject_key);
            }

            if !commands.is_empty() {
                results.push(result);
            }
        }

        results
    }

    async fn execute_commands(
        executor: &dyn CommandExecutor,
        identity: &OnlineIdentity,
        commands: &[Command],
    ) -> ExecutionResult {
        let mut result = ExecutionResult::new(identity);
        let mut seen = HashSet::new();

        for command in commands {
            if !seen.insert(command.command_id) {
                event!(
                    Level::DEBUG,
                    command_id = command.command_id,
                    "skipping repeated command in the same pass"
                );
                continue;
            }

            let rendered = template::render_for(&command.template, identity);
            let required = command.conditions.min_empty_slots;

            if !command.conditions.slots_satisfied(identity.free_slots()) {
                identity.send_notice(&slots_notice(required));
                event!(
                    Level::DEBUG,
                    command_id = command.command_id,
                    required_slots = required,
                    "command deferred, not enough free slots"
                );
                result.deferred.push(command.command_id);
                continue;
            }

            match executor.execute(identity, &rendered).await {
                Ok(()) => result.completed.push(command.command_id),
                Err(err) => {
                    event!(
                        Level::ERROR,
                        error = %err,
                        command_id = command.command_id,
                        "command execution failed"
                    );
                    result.failed.push(command.command_id);
                }
            }
        }

        if !commands.is_empty() {
            event!(
                Level::INFO,
                subject = %identity.subject_key,
                completed = ?result.completed,
                "completed commands for {}",
                identity.display_name
            );
        }

        result
    }

    /// Sends one acknowledgment for everything completed in `results`.
    ///
    /// Returns the ids sent and the error message if the call failed.
    pub async fn acknowledge(
        client: &dyn QueueClient,
        results: &[ExecutionResult],
    ) -> (Vec<i64>, Option<String>) {
        let ids = completed_command_ids(results);
        if ids.is_empty() {
            return (ids, None);
        }

        match client.acknowledge(&ids).await {
            Ok(()) => {
                for result in results.iter().filter(|r| !r.completed.is_empty()) {
                    event!(
                        Level::INFO,
                        subject = %result.subject_key,
                        "completed {}'s transactions",
                        result.identity.display_name
                    );
                }
                (ids, None)
            }
            Err(err) => {
                event!(
                    Level::ERROR,
                    error = %err,
                    count = ids.len(),
                    "failed to mark commands as complete"
                );
                (ids, Some(err.to_string()))
            }
        }
    }

    /// Fetch, reconcile and acknowledge, in that order.
    pub async fn run_cycle(
        &mut self,
        client: &dyn QueueClient,
        executor: &dyn CommandExecutor,
        identities: &IdentitySnapshot,
    ) -> CycleReport {
        let cycle_id = Uuid::new_v4();
        let span = info_span!("sync.cycle", cycle_id = %cycle_id);

        async move {
            let fetched = self.refresh_pending(client).await;
            let results = self.reconcile(client, executor, identities).await;
            let (acknowledged, ack_error) = Self::acknowledge(client, &results).await;

            CycleReport {
                cycle_id,
                fetched,
                results,
                acknowledged,
                ack_error,
            }
        }
        .instrument(span)
        .await
    }
}
