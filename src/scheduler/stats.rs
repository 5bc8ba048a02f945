use crate::reconcile::CycleReport;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Point-in-time view of the service counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub ticks: u64,
    pub online_identities: usize,
    pub cycles_run: u64,
    pub cycles_skipped: u64,
    pub fetch_failures: u64,
    pub commands_executed: u64,
    pub commands_deferred: u64,
    pub commands_failed: u64,
    pub commands_acknowledged: u64,
    pub ack_failures: u64,
    pub last_fetch_at: Option<DateTime<Utc>>,
}

impl fmt::Display for SyncStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Sync Stats: {} ticks, {} online, {} cycles ({} skipped), {} executed, {} deferred, {} acknowledged",
            self.ticks,
            self.online_identities,
            self.cycles_run,
            self.cycles_skipped,
            self.commands_executed,
            self.commands_deferred,
            self.commands_acknowledged
        )
    }
}

#[derive(Debug, Default)]
pub(crate) struct SyncCounters {
    ticks: AtomicU64,
    online_identities: AtomicUsize,
    cycles_run: AtomicU64,
    cycles_skipped: AtomicU64,
    fetch_failures: AtomicU64,
    commands_executed: AtomicU64,
    commands_deferred: AtomicU64,
    commands_failed: AtomicU64,
    commands_acknowledged: AtomicU64,
    ack_failures: AtomicU64,
    last_fetch_at: Mutex<Option<DateTime<Utc>>>,
}

impl SyncCounters {
    pub(crate) fn record_tick(&self, online: usize) {
        self.ticks.fetch_add(1, Ordering::SeqCst);
        self.online_identities.store(online, Ordering::SeqCst);
    }

    pub(crate) fn record_skip(&self) {
        self.cycles_skipped.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_cycle(&self, report: &CycleReport, last_fetch_at: Option<DateTime<Utc>>) {
        self.cycles_run.fetch_add(1, Ordering::SeqCst);
        if report.fetched.is_none() {
            self.fetch_failures.fetch_add(1, Ordering::SeqCst);
        }
        self.commands_executed
            .fetch_add(report.executed_count() as u64, Ordering::SeqCst);
        self.commands_deferred
            .fetch_add(report.deferred_count() as u64, Ordering::SeqCst);
        self.commands_failed
            .fetch_add(report.failed_count() as u64, Ordering::SeqCst);
        if report.ack_error.is_some() {
            self.ack_failures.fetch_add(1, Ordering::SeqCst);
        } else {
            self.commands_acknowledged
                .fetch_add(report.acknowledged.len() as u64, Ordering::SeqCst);
        }
        if let (Some(at), Ok(mut slot)) = (last_fetch_at, self.last_fetch_at.lock()) {
            *slot = Some(at);
        }
    }

    pub(crate) fn snapshot(&self) -> SyncStats {
        SyncStats {
            ticks: self.ticks.load(Ordering::SeqCst),
            online_identities: self.online_identities.load(Ordering::SeqCst),
            cycles_run: self.cycles_run.load(Ordering::SeqCst),
            cycles_skipped: self.cycles_skipped.load(Ordering::SeqCst),
            fetch_failures: self.fetch_failures.load(Ordering::SeqCst),
            commands_executed: self.commands_executed.load(Ordering::SeqCst),
            commands_deferred: self.commands_deferred.load(Ordering::SeqCst),
            commands_failed: self.commands_failed.load(Ordering::SeqCst),
            commands_acknowledged: self.commands_acknowledged.load(Ordering::SeqCst),
            ack_failures: self.ack_failures.load(Ordering::SeqCst),
            last_fetch_at: self.last_fetch_at.lock().map(|slot| *slot).unwrap_or(None),
        }
    }
}
