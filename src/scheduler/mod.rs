//! Two-speed driver embedding the reconciler in a host lifecycle.
//!
//! One background task polls two independent intervals: a fast one that
//! rebuilds the identity snapshot and a slow one that starts a reconcile
//! cycle. Cycles run on their own task and at most one is in flight; a
//! cycle that comes due while the previous one still holds the reconciler
//! is skipped.

pub mod cadence;
pub mod stats;

use crate::config::SyncConfig;
use crate::core::{QueueMeta, Result, SyncError};
use crate::host::{CommandExecutor, HostDirectory};
use crate::identity::IdentityTracker;
use crate::queue::{HttpQueueClient, QueueClient};
use crate::reconcile::{CycleReport, PendingSet, Reconciler};
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;

pub use cadence::{Cadence, ScheduledTask};
pub use stats::SyncStats;
use stats::SyncCounters;

/// State shared between the service handle, the driver and cycle tasks.
struct SyncShared {
    client: Arc<dyn QueueClient>,
    host: Arc<dyn HostDirectory>,
    executor: Arc<dyn CommandExecutor>,
    tracker: Mutex<IdentityTracker>,
    reconciler: Arc<Mutex<Reconciler>>,
    counters: SyncCounters,
}

impl SyncShared {
    async fn refresh_identities(&self) {
        let mut tracker = self.tracker.lock().await;
        tracker.refresh(self.host.as_ref());
        self.counters.record_tick(tracker.len());
    }

    async fn run_cycle_locked(&self, reconciler: &mut Reconciler) -> CycleReport {
        let identities = self.tracker.lock().await.snapshot();
        let report = reconciler
            .run_cycle(self.client.as_ref(), self.executor.as_ref(), &identities)
            .await;
        self.counters
            .record_cycle(&report, reconciler.last_fetch_at());
        report
    }

    fn try_claim_cycle(&self) -> Option<OwnedMutexGuard<Reconciler>> {
        match self.reconciler.clone().try_lock_owned() {
            Ok(guard) => Some(guard),
            Err(_) => {
                self.counters.record_skip();
                warn!("reconcile cycle still in flight, skipping this one");
                None
            }
        }
    }

    fn spawn_cycle(self: &Arc<Self>) {
        let Some(mut guard) = self.try_claim_cycle() else {
            return;
        };
        let shared = Arc::clone(self);
        tokio::spawn(async move {
            shared.run_cycle_locked(&mut guard).await;
        });
    }
}

async fn drive(shared: Arc<SyncShared>, cadence: Cadence, mut stop_rx: oneshot::Receiver<()>) {
    let start = Instant::now();
    let mut refresh = cadence.interval_for(ScheduledTask::RefreshIdentities, start);
    let mut reconcile = cadence.interval_for(ScheduledTask::Reconcile, start);

    loop {
        tokio::select! {
            biased;
            _ = &mut stop_rx => {
                break;
            }
            _ = refresh.tick() => {
                shared.refresh_identities().await;
            }
            _ = reconcile.tick() => {
                shared.spawn_cycle();
            }
        }
    }
}

/// Handle to the running driver task.
struct DriverHandle {
    stop_tx: Option<oneshot::Sender<()>>,
    join_handle: Option<JoinHandle<()>>,
}

impl DriverHandle {
    fn is_active(&self) -> bool {
        self.join_handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn shutdown(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(join_handle) = self.join_handle.take() {
            join_handle.abort();
        }
    }
}

impl Drop for DriverHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Reward sync service with a `start()`/`stop()` lifecycle.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use tebex_sync::{RecordingExecutor, RewardSyncService, StaticHost, SyncConfig};
///
/// # tokio_test::block_on(async {
/// let config = SyncConfig::new("store-secret");
/// let service = RewardSyncService::with_http(
///     config,
///     Arc::new(StaticHost::new()),
///     Arc::new(RecordingExecutor::new()),
/// )
/// .unwrap();
///
/// service.start().unwrap();
/// // ... host runs ...
/// service.stop().unwrap();
/// # });
/// ```
pub struct RewardSyncService {
    cadence: Cadence,
    shared: Arc<SyncShared>,
    driver: std::sync::Mutex<Option<DriverHandle>>,
}

impl RewardSyncService {
    pub fn new(
        config: SyncConfig,
        client: Arc<dyn QueueClient>,
        host: Arc<dyn HostDirectory>,
        executor: Arc<dyn CommandExecutor>,
    ) -> Result<Self> {
        config.validate().map_err(SyncError::Config)?;

        let shared = SyncShared {
            client,
            host,
            executor,
            tracker: Mutex::new(IdentityTracker::new()),
            reconciler: Arc::new(Mutex::new(Reconciler::from_config(&config))),
            counters: SyncCounters::default(),
        };

        Ok(Self {
            cadence: Cadence::from_config(&config),
            shared: Arc::new(shared),
            driver: std::sync::Mutex::new(None),
        })
    }

    /// Builds the service on top of [`HttpQueueClient`].
    pub fn with_http(
        config: SyncConfig,
        host: Arc<dyn HostDirectory>,
        executor: Arc<dyn CommandExecutor>,
    ) -> Result<Self> {
        let client = HttpQueueClient::new(&config)?;
        Self::new(config, Arc::new(client), host, executor)
    }

    /// Starts the driver. Does nothing if it is already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) -> Result<()> {
        let mut driver = self.driver.lock()?;
        if driver.as_ref().is_some_and(DriverHandle::is_active) {
            debug!("reward sync already running");
            return Ok(());
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|err| SyncError::Execution(format!("no tokio runtime: {}", err)))?;
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let join_handle = runtime.spawn(drive(self.shared.clone(), self.cadence, stop_rx));

        *driver = Some(DriverHandle {
            stop_tx: Some(stop_tx),
            join_handle: Some(join_handle),
        });
        info!(
            "reward sync started (tick {:?}, reconcile {:?})",
            self.cadence.tick_period, self.cadence.reconcile_period
        );
        Ok(())
    }

    /// Stops the driver. Safe to call repeatedly.
    ///
    /// A cycle already in flight is left to finish on its own task.
    pub fn stop(&self) -> Result<()> {
        let mut driver = self.driver.lock()?;
        if let Some(mut handle) = driver.take() {
            handle.shutdown();
            info!("reward sync stopped");
        }
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.driver
            .lock()
            .map(|driver| driver.as_ref().is_some_and(DriverHandle::is_active))
            .unwrap_or(false)
    }

    /// Refreshes identities and runs one cycle in-line.
    ///
    /// Returns `None` when another cycle is already in flight.
    pub async fn run_once(&self) -> Option<CycleReport> {
        self.shared.refresh_identities().await;
        let mut guard = self.shared.try_claim_cycle()?;
        Some(self.shared.run_cycle_locked(&mut guard).await)
    }

    pub fn stats(&self) -> SyncStats {
        self.shared.counters.snapshot()
    }

    pub fn cadence(&self) -> Cadence {
        self.cadence
    }

    /// Copy of the entries currently awaiting a connected subject.
    pub async fn pending(&self) -> PendingSet {
        self.shared.reconciler.lock().await.pending().clone()
    }

    pub async fn last_meta(&self) -> Option<QueueMeta> {
        self.shared.reconciler.lock().await.last_meta()
    }
}

impl Drop for RewardSyncService {
    fn drop(&mut self) {
        if let Ok(mut driver) = self.driver.lock() {
            driver.take();
        }
    }
}
