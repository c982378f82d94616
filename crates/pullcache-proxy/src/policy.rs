//! Timing policy for the cache writer.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How long and how often the cache writer waits for dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitPolicy {
    /// Polling budget for single manifests.
    pub max_attempts: u32,

    /// Number of intervals a manifest list waits before it is pushed.
    pub manifest_list_delay_attempts: u32,

    /// Sleep before each dependency check, in seconds.
    pub interval_secs: u64,

    /// Sleep after force-copying missing blobs, in seconds.
    pub force_copy_settle_secs: u64,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            manifest_list_delay_attempts: 20,
            interval_secs: 10,
            force_copy_settle_secs: 10,
        }
    }
}

impl WaitPolicy {
    /// Creates a policy builder.
    pub fn builder() -> WaitPolicyBuilder {
        WaitPolicyBuilder::default()
    }

    /// Sleep before each dependency check.
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// One-shot delay before pushing a manifest list.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use pullcache_proxy::WaitPolicy;
    ///
    /// assert_eq!(WaitPolicy::default().manifest_list_delay(), Duration::from_secs(200));
    /// ```
    pub fn manifest_list_delay(&self) -> Duration {
        self.interval() * self.manifest_list_delay_attempts
    }

    /// Sleep after a force copy.
    pub const fn force_copy_settle(&self) -> Duration {
        Duration::from_secs(self.force_copy_settle_secs)
    }

    /// Attempt count at which missing blobs are copied from the origin.
    ///
    /// `None` when the budget is too small to ever reach it.
    pub const fn force_copy_attempt(&self) -> Option<u32> {
        self.max_attempts.checked_sub(1)
    }
}

/// Builder for `WaitPolicy`.
#[derive(Debug, Default)]
pub struct WaitPolicyBuilder {
    max_attempts: Option<u32>,
    manifest_list_delay_attempts: Option<u32>,
    interval_secs: Option<u64>,
    force_copy_settle_secs: Option<u64>,
}

impl WaitPolicyBuilder {
    /// Sets the polling budget.
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// Sets the manifest list delay, in intervals.
    pub fn manifest_list_delay_attempts(mut self, attempts: u32) -> Self {
        self.manifest_list_delay_attempts = Some(attempts);
        self
    }

    /// Sets the polling interval.
    pub fn interval_secs(mut self, secs: u64) -> Self {
        self.interval_secs = Some(secs);
        self
    }

    /// Sets the post-copy settle time.
    pub fn force_copy_settle_secs(mut self, secs: u64) -> Self {
        self.force_copy_settle_secs = Some(secs);
        self
    }

    /// Builds the policy.
    pub fn build(self) -> WaitPolicy {
        let defaults = WaitPolicy::default();
        WaitPolicy {
            max_attempts: self.max_attempts.unwrap_or(defaults.max_attempts),
            manifest_list_delay_attempts: self
                .manifest_list_delay_attempts
                .unwrap_or(defaults.manifest_list_delay_attempts),
            interval_secs: self.interval_secs.unwrap_or(defaults.interval_secs),
            force_copy_settle_secs: self
                .force_copy_settle_secs
                .unwrap_or(defaults.force_copy_settle_secs),
        }
    }
}
