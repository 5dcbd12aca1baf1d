//! Remote synchronization section

use crate::validation::{ConfigSection, ValidationError, Validator};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Where and how the rating store is synchronized
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RemoteConfig {
    /// Sync with the remote store at all
    pub enabled: bool,

    /// Base URL; `/push` and `/pull` are appended
    pub endpoint: String,

    /// Per-request timeout
    pub request_timeout_secs: u64,

    /// Background pull+push interval, 0 disables it
    pub reconcile_interval_secs: u64,

    /// Consecutive transport failures before sync pauses
    pub failure_threshold: u32,

    /// How long sync stays paused after tripping
    pub cooldown_secs: u64,
}

impl RemoteConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn reconcile_interval(&self) -> Option<Duration> {
        (self.reconcile_interval_secs > 0)
            .then(|| Duration::from_secs(self.reconcile_interval_secs))
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: "http://localhost:8080/api/rankings".to_string(),
            request_timeout_secs: 10,
            reconcile_interval_secs: 0,
            failure_threshold: 3,
            cooldown_secs: 30,
        }
    }
}

impl ConfigSection for RemoteConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut results = vec![
            Validator::in_range(
                self.request_timeout_secs,
                1,
                300,
                "remote.request_timeout_secs",
            ),
            Validator::in_range(
                self.reconcile_interval_secs,
                0,
                86_400,
                "remote.reconcile_interval_secs",
            ),
            Validator::in_range(self.failure_threshold, 1, 100, "remote.failure_threshold"),
            Validator::in_range(self.cooldown_secs, 1, 3_600, "remote.cooldown_secs"),
        ];

        // A disabled remote may keep a placeholder endpoint
        if self.enabled {
            results.push(Validator::http_url(&self.endpoint, "remote.endpoint"));
        }

        Validator::collect_errors(results)
    }

    fn merge(&mut self, other: Self) {
        self.enabled = other.enabled;
        self.endpoint = other.endpoint;
        self.request_timeout_secs = other.request_timeout_secs;
        self.reconcile_interval_secs = other.reconcile_interval_secs;
        self.failure_threshold = other.failure_threshold;
        self.cooldown_secs = other.cooldown_secs;
    }

    fn section_name(&self) -> &'static str {
        "remote"
    }
}
