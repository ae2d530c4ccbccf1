use log::info;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::app_config::LimitsConfig;
use crate::errors::AdmissionError;

/// Size and duration ceilings checked before expensive work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionLimits {
    pub max_file_bytes: u64,
    pub max_duration_secs: u64,
}

impl From<&LimitsConfig> for AdmissionLimits {
    fn from(config: &LimitsConfig) -> Self {
        Self {
            max_file_bytes: config.max_file_bytes,
            max_duration_secs: config.max_duration_secs,
        }
    }
}

impl AdmissionLimits {
    /// A file of exactly the ceiling is accepted
    pub fn check_size(&self, size_bytes: u64) -> Result<(), AdmissionError> {
        if size_bytes > self.max_file_bytes {
            return Err(AdmissionError::TooLarge {
                size_bytes,
                limit_bytes: self.max_file_bytes,
            });
        }
        Ok(())
    }

    /// A video of exactly the ceiling is accepted
    pub fn check_duration(&self, duration_secs: f64) -> Result<(), AdmissionError> {
        if !duration_secs.is_finite() || duration_secs > self.max_duration_secs as f64 {
            return Err(AdmissionError::TooLong {
                duration_secs,
                limit_secs: self.max_duration_secs,
            });
        }
        Ok(())
    }
}

/// Process-wide cap on jobs running at once
#[derive(Debug, Clone)]
pub struct AdmissionControl {
    permits: Arc<Semaphore>,
    capacity: usize,
}

impl AdmissionControl {
    pub fn new(max_concurrent_jobs: usize) -> Self {
        let capacity = max_concurrent_jobs.max(1);
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Wait for a slot; the slot frees when the permit drops
    pub async fn acquire(&self, job_id: &str) -> Option<OwnedSemaphorePermit> {
        if self.permits.available_permits() == 0 {
            info!("Job {} queued, {} jobs already running", job_id, self.capacity);
        }
        Arc::clone(&self.permits).acquire_owned().await.ok()
    }
}
