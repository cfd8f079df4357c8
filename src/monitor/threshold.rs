use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use thiserror::Error;

pub const DEFAULT_IDLE_TIME: Duration = Duration::from_secs(600);
pub const MIN_IDLE_TIME: Duration = Duration::from_secs(15);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ThresholdError {
    #[error("idle_time below minimum threshold")]
    BelowMinimum {
        requested: Duration,
        minimum: Duration,
    },
}

/// Idle time after which the user is considered away. Shared between the monitor thread and
/// whoever handles configuration commands. Readers see writes on their next [ThresholdStore::get],
/// nothing is notified.
///
/// The threshold has whole-second granularity, any sub-second part of a new value is dropped.
#[derive(Debug)]
pub struct ThresholdStore {
    secs: AtomicU64,
}

impl ThresholdStore {
    pub fn new() -> Self {
        Self {
            secs: AtomicU64::new(DEFAULT_IDLE_TIME.as_secs()),
        }
    }

    pub fn get(&self) -> Duration {
        Duration::from_secs(self.secs.load(Ordering::Acquire))
    }

    pub fn set(&self, threshold: Duration) -> Result<(), ThresholdError> {
        if threshold < MIN_IDLE_TIME {
            return Err(ThresholdError::BelowMinimum {
                requested: threshold,
                minimum: MIN_IDLE_TIME,
            });
        }
        self.secs.store(threshold.as_secs(), Ordering::Release);
        Ok(())
    }
}

impl Default for ThresholdStore {
    fn default() -> Self {
        Self::new()
    }
}
