//! FanoutConfig - Config Loader output
//!
//! Describes where destinations live and how batches are dispatched.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use validator::Validate;

use crate::{DEFAULT_CONCURRENCY, DEFAULT_DEADLINE};

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete fanout configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct FanoutConfig {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Destination store settings
    #[serde(default)]
    #[validate(nested)]
    pub store: StoreConfig,

    /// Dispatch settings
    #[serde(default)]
    #[validate(nested)]
    pub dispatch: DispatchConfig,
}

/// Destination store: one directory per destination
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StoreConfig {
    /// Root directory of per-destination session state
    #[serde(default = "default_store_path")]
    pub path: PathBuf,

    /// Only treat sub-directories as candidates
    #[serde(default = "default_dirs_only")]
    pub dirs_only: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            dirs_only: default_dirs_only(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("./sessions")
}

fn default_dirs_only() -> bool {
    true
}

/// Dispatch settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DispatchConfig {
    /// Default concurrency bound (`th`)
    #[serde(default = "default_concurrency")]
    #[validate(range(min = 1, max = 10_000))]
    pub concurrency: usize,

    /// Global batch deadline in seconds
    #[serde(default = "default_deadline_secs")]
    #[validate(range(min = 1))]
    pub deadline_secs: u64,

    /// Work queue capacity; 0 means twice the concurrency bound
    #[serde(default)]
    pub queue_capacity: usize,

    /// Behavior when a batch is triggered while another is active
    #[serde(default)]
    pub admission: AdmissionPolicy,

    /// Emit a progress line every N successes
    #[serde(default = "default_progress_every")]
    #[validate(range(min = 1))]
    pub progress_every: u64,
}

impl DispatchConfig {
    /// Global deadline as a Duration
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            deadline_secs: default_deadline_secs(),
            queue_capacity: 0,
            admission: AdmissionPolicy::default(),
            progress_every: default_progress_every(),
        }
    }
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

fn default_deadline_secs() -> u64 {
    DEFAULT_DEADLINE.as_secs()
}

fn default_progress_every() -> u64 {
    100
}

/// Policy for a batch triggered while another batch is running
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionPolicy {
    /// Wait for the active batch to report, then run
    #[default]
    Queue,
    /// Refuse immediately
    Reject,
}
