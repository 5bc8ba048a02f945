use crate::config::SyncConfig;
use std::time::Duration;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};

/// The two periodic tasks driven by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduledTask {
    /// Rebuild the identity snapshot.
    RefreshIdentities,
    /// Fetch the due queue and reconcile it.
    Reconcile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    pub tick_period: Duration,
    pub reconcile_period: Duration,
}

impl Cadence {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            tick_period: config.tick_period,
            reconcile_period: config.reconcile_period,
        }
    }

    pub fn period_of(&self, task: ScheduledTask) -> Duration {
        match task {
            ScheduledTask::RefreshIdentities => self.tick_period,
            ScheduledTask::Reconcile => self.reconcile_period,
        }
    }

    /// Interval whose first tick fires one full period after `start`.
    pub fn interval_for(&self, task: ScheduledTask, start: Instant) -> Interval {
        let period = self.period_of(task);
        let mut interval = interval_at(start + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn intervals_fire_on_their_own_period() {
        let cadence = Cadence::from_config(&SyncConfig::new("secret"));
        let start = Instant::now();
        let mut refresh = cadence.interval_for(ScheduledTask::RefreshIdentities, start);
        let mut reconcile = cadence.interval_for(ScheduledTask::Reconcile, start);

        assert_eq!(refresh.tick().await - start, Duration::from_secs(1));
        assert_eq!(refresh.tick().await - start, Duration::from_secs(2));
        assert_eq!(reconcile.tick().await - start, Duration::from_secs(5));
        assert_eq!(reconcile.tick().await - start, Duration::from_secs(10));
    }
}
