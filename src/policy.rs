//! Policy limits for the media job engine.
//!
//! These values are owned by the surrounding configuration; the engine only
//! reads them. Defaults match the reference deployment.

use std::path::PathBuf;
use std::time::Duration;

/// One mebibyte in bytes.
pub const MIB: u64 = 1024 * 1024;

/// One gibibyte in bytes.
pub const GIB: u64 = 1024 * MIB;

/// Largest artifact delivered as a direct attachment (25 MiB).
pub const DEFAULT_INLINE_SIZE_CAP: u64 = 25 * MIB;

/// Largest artifact accepted by the remote temporary host (1 GiB).
pub const DEFAULT_REMOTE_SIZE_CAP: u64 = GIB;

/// Longest media (or trim selection) a job may produce (1 hour).
pub const DEFAULT_MAX_DURATION: Duration = Duration::from_secs(3600);

/// Per-requester cooldown between admitted jobs.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(30);

/// Progress monitor sampling interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Retention requested from the remote temporary host.
pub const DEFAULT_RETENTION_HOURS: u32 = 24;

/// Socket-level timeout handed to the extraction tool for metadata resolution.
pub const DEFAULT_SOCKET_TIMEOUT: Duration = Duration::from_secs(5);

/// Default scratch directory, relative to the working directory.
pub const DEFAULT_SCRATCH_DIR: &str = "data/temp";

/// Default extraction tool binary name (looked up on `PATH`).
pub const DEFAULT_TOOL_PATH: &str = "yt-dlp";

/// Limits and knobs the engine enforces for every job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnginePolicy {
    /// Inclusive upper bound for inline delivery.
    pub inline_size_cap: u64,
    /// Inclusive upper bound for remote temporary delivery (and pre-flight size checks).
    pub remote_size_cap: u64,
    /// Maximum media duration, also the maximum trim selection length.
    pub max_duration: Duration,
    /// Per-requester cooldown.
    pub cooldown: Duration,
    /// Progress monitor sampling interval.
    pub poll_interval: Duration,
    /// Remote host retention in hours.
    pub retention_hours: u32,
    /// Extraction tool socket timeout.
    pub socket_timeout: Duration,
    /// Directory the executor writes artifacts into.
    pub scratch_dir: PathBuf,
    /// Path or name of the extraction tool binary.
    pub tool_path: PathBuf,
    /// Identity allowed to bypass the constraint evaluator.
    pub operator_id: Option<String>,
}

impl Default for EnginePolicy {
    fn default() -> Self {
        Self {
            inline_size_cap: DEFAULT_INLINE_SIZE_CAP,
            remote_size_cap: DEFAULT_REMOTE_SIZE_CAP,
            max_duration: DEFAULT_MAX_DURATION,
            cooldown: DEFAULT_COOLDOWN,
            poll_interval: DEFAULT_POLL_INTERVAL,
            retention_hours: DEFAULT_RETENTION_HOURS,
            socket_timeout: DEFAULT_SOCKET_TIMEOUT,
            scratch_dir: PathBuf::from(DEFAULT_SCRATCH_DIR),
            tool_path: PathBuf::from(DEFAULT_TOOL_PATH),
            operator_id: None,
        }
    }
}

impl EnginePolicy {
    /// Returns true when `requester` is the configured operator.
    #[must_use]
    pub fn is_operator(&self, requester: &str) -> bool {
        self.operator_id
            .as_deref()
            .is_some_and(|operator| operator == requester)
    }
}
