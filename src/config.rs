use crate::reconcile::RetentionPolicy;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://plugin.tebex.io";

/// Reward sync configuration
///
/// The store secret has no default and must be supplied by the embedding host.
#[derive(Clone)]
pub struct SyncConfig {
    /// Store secret sent as `X-Tebex-Secret`
    pub secret: String,

    /// Remote API root, without trailing slash
    pub base_url: String,

    /// Per-request timeout for remote calls
    pub request_timeout: Duration,

    /// Identity refresh cadence
    pub tick_period: Duration,

    /// Fetch + reconcile cadence
    pub reconcile_period: Duration,

    /// What happens to an entry whose commands were not all executed
    pub retention: RetentionPolicy,

    /// Log a summary of every successful queue fetch
    pub log_queue_activity: bool,
}

impl SyncConfig {
    /// Create a new configuration for the given store secret
    pub fn new(secret: &str) -> Self {
        Self {
            secret: secret.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(10),
            tick_period: Duration::from_secs(1),
            reconcile_period: Duration::from_secs(5),
            retention: RetentionPolicy::default(),
            log_queue_activity: false,
        }
    }

    /// Set the remote API root
    pub fn base_url(mut self, base_url: &str) -> Self {
        let mut base = base_url.trim().to_string();
        while base.ends_with('/') {
            base.pop();
        }
        self.base_url = base;
        self
    }

    /// Set request timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set identity refresh cadence
    pub fn tick_period(mut self, period: Duration) -> Self {
        self.tick_period = period;
        self
    }

    /// Set fetch + reconcile cadence
    pub fn reconcile_period(mut self, period: Duration) -> Self {
        self.reconcile_period = period;
        self
    }

    pub fn retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }

    pub fn log_queue_activity(mut self, enabled: bool) -> Self {
        self.log_queue_activity = enabled;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.secret.trim().is_empty() {
            return Err("Secret cannot be empty".to_string());
        }

        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err("base_url must start with http:// or https://".to_string());
        }

        if self.request_timeout.is_zero() {
            return Err("request_timeout must be > 0".to_string());
        }

        if self.tick_period.is_zero() {
            return Err("tick_period must be > 0".to_string());
        }

        if self.reconcile_period.is_zero() {
            return Err("reconcile_period must be > 0".to_string());
        }

        if self.reconcile_period < self.tick_period {
            return Err("reconcile_period cannot be shorter than tick_period".to_string());
        }

        Ok(())
    }
}

impl fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncConfig")
            .field("secret", &"***")
            .field("base_url", &self.base_url)
            .field("request_timeout", &self.request_timeout)
            .field("tick_period", &self.tick_period)
            .field("reconcile_period", &self.reconcile_period)
            .field("retention", &self.retention)
            .field("log_queue_activity", &self.log_queue_activity)
            .finish()
    }
}
