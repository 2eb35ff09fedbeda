//! Admission control: one global job slot plus per-requester cooldowns.
//!
//! The slot is an explicit `Option<ActiveJob>` taken with a compare-and-set
//! under a mutex; a second admission while it is occupied is rejected, never
//! queued. Cooldowns live in a [`DashMap`] keyed by requester. A
//! [`JobPermit`] releases the slot when finished or dropped, and a failed
//! job clears its requester's cooldown.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::{debug, info};

use crate::error::AdmissionError;

#[derive(Debug, Clone)]
struct ActiveJob {
    id: u64,
    requester: String,
}

/// Owns the global job slot and the cooldown table.
#[derive(Debug)]
pub struct JobManager {
    cooldown: Duration,
    active: Mutex<Option<ActiveJob>>,
    cooldowns: DashMap<String, Instant>,
    next_id: AtomicU64,
}

impl JobManager {
    /// Creates a manager applying `cooldown` between a requester's jobs.
    #[must_use]
    pub fn new(cooldown: Duration) -> Arc<Self> {
        Arc::new(Self {
            cooldown,
            active: Mutex::new(None),
            cooldowns: DashMap::new(),
            next_id: AtomicU64::new(1),
        })
    }

    fn slot(&self) -> MutexGuard<'_, Option<ActiveJob>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Time left on `requester`'s cooldown, if any.
    #[must_use]
    pub fn cooldown_remaining(&self, requester: &str) -> Option<Duration> {
        let last = *self.cooldowns.get(requester)?;
        self.cooldown
            .checked_sub(last.elapsed())
            .filter(|left| !left.is_zero())
    }

    /// Whether a job currently holds the slot.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.slot().is_some()
    }

    /// Id of the job holding the slot.
    #[must_use]
    pub fn active_job_id(&self) -> Option<u64> {
        self.slot().as_ref().map(|job| job.id)
    }

    /// Admits a job for `requester`.
    ///
    /// The cooldown is checked first and only recorded once the slot is
    /// taken, so a `Busy` rejection does not start a cooldown.
    ///
    /// # Errors
    ///
    /// - [`AdmissionError::CooldownActive`] if the requester is cooling down
    /// - [`AdmissionError::Busy`] if another job holds the slot
    pub fn admit(self: &Arc<Self>, requester: &str) -> Result<JobPermit, AdmissionError> {
        if let Some(retry_after) = self.cooldown_remaining(requester) {
            debug!(requester, retry_after_ms = retry_after.as_millis(), "admission rejected: cooldown");
            return Err(AdmissionError::CooldownActive { retry_after });
        }

        let id = {
            let mut slot = self.slot();
            if let Some(active) = slot.as_ref() {
                debug!(requester, active_job = active.id, active_requester = %active.requester, "admission rejected: busy");
                return Err(AdmissionError::Busy);
            }
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            *slot = Some(ActiveJob {
                id,
                requester: requester.to_string(),
            });
            id
        };

        self.cooldowns
            .retain(|_, last| last.elapsed() < self.cooldown);
        self.cooldowns.insert(requester.to_string(), Instant::now());
        info!(job_id = id, requester, "job admitted");
        Ok(JobPermit {
            manager: Arc::clone(self),
            id,
            requester: requester.to_string(),
            released: false,
        })
    }

    fn release(&self, id: u64, requester: &str, succeeded: bool) {
        if !succeeded {
            self.cooldowns.remove(requester);
        }
        let mut slot = self.slot();
        if slot.as_ref().is_some_and(|job| job.id == id) {
            *slot = None;
        }
        debug!(job_id = id, requester, succeeded, "job slot released");
    }
}

/// Proof of admission. Holds the global slot until finished or dropped.
#[derive(Debug)]
pub struct JobPermit {
    manager: Arc<JobManager>,
    id: u64,
    requester: String,
    released: bool,
}

impl JobPermit {
    /// Job id assigned at admission.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Requester the job was admitted for.
    #[must_use]
    pub fn requester(&self) -> &str {
        &self.requester
    }

    /// Releases the slot. A failed job also clears the requester's cooldown.
    pub fn finish(mut self, succeeded: bool) {
        self.manager.release(self.id, &self.requester, succeeded);
        self.released = true;
    }
}

impl Drop for JobPermit {
    fn drop(&mut self) {
        if !self.released {
            self.manager.release(self.id, &self.requester, false);
        }
    }
}
