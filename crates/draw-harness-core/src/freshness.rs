//! Freshness policy for automatic refreshes.
//!
//! Decides whether the cached datasets are old enough to warrant a network
//! round trip. A manual refresh never consults this policy.

use chrono::{DateTime, Duration, Utc};

use crate::endpoint::Environment;

pub const DEFAULT_THRESHOLD_HOURS: i64 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessPolicy {
    threshold: Duration,
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self::new(Duration::hours(DEFAULT_THRESHOLD_HOURS))
    }
}

impl FreshnessPolicy {
    pub fn new(threshold: Duration) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    /// `true` when an automatic refresh should hit the network.
    ///
    /// Managed hosting always refreshes. Otherwise a missing timestamp, or one
    /// at least `threshold` old, requires a refresh. A timestamp in the future
    /// counts as fresh.
    pub fn needs_refresh(
        &self,
        last_saved: Option<DateTime<Utc>>,
        env: &Environment,
        now: DateTime<Utc>,
    ) -> bool {
        if env.managed_hosting {
            return true;
        }
        match last_saved {
            None => true,
            Some(saved) => now - saved >= self.threshold,
        }
    }

    /// `true` when cache contents must never be read in this environment.
    pub fn bypasses_cache(&self, env: &Environment) -> bool {
        env.managed_hosting
    }
}
