//! The idle monitor decides when presence flips. Each cycle samples the idle time, compares it
//! with the threshold and picks how long to sleep:
//!  - While away it polls every [POLL_RESOLUTION] to notice the user coming back.
//!  - While active it sleeps until the threshold could first be crossed, plus one resolution.
//!
//! Threshold changes are read once per cycle, so a lowered threshold only applies after the
//! current sleep finishes.

pub mod handle;
pub mod threshold;

use std::{sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    idle_api::IdleProbe,
    presence::{PresenceState, SharedGateway},
    utils::clock::Clock,
};

use threshold::ThresholdStore;

pub const POLL_RESOLUTION: Duration = Duration::from_secs(5);

/// Used when a sleep would overflow the clock.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Everything the monitor shares with the rest of the plugin.
#[derive(Clone)]
pub struct MonitorContext {
    pub threshold: Arc<ThresholdStore>,
    pub gateway: SharedGateway,
}

impl MonitorContext {
    pub fn new(gateway: SharedGateway) -> Self {
        Self {
            threshold: Arc::new(ThresholdStore::new()),
            gateway,
        }
    }
}

/// Outcome of a single poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollCycle {
    pub idle: Duration,
    pub sleep: Duration,
}

pub struct IdleMonitor {
    context: MonitorContext,
    probe: Box<dyn IdleProbe + Send>,
    clock: Box<dyn Clock>,
    shutdown: CancellationToken,
    state: PresenceState,
}

impl IdleMonitor {
    /// Seeds the presence state from the gateway.
    pub fn new(
        context: MonitorContext,
        probe: Box<dyn IdleProbe + Send>,
        clock: Box<dyn Clock>,
        shutdown: CancellationToken,
    ) -> Self {
        let state = context.gateway.get_status();
        info!("Idle monitor starts {state}");
        Self {
            context,
            probe,
            clock,
            shutdown,
            state,
        }
    }

    pub fn state(&self) -> PresenceState {
        self.state
    }

    fn sample_idle(&mut self) -> Duration {
        self.probe.idle_time().unwrap_or_else(|e| {
            warn!("Treating user as active, {e}");
            Duration::ZERO
        })
    }

    fn transition(&mut self, target: PresenceState) {
        match self.context.gateway.set_status(target) {
            Ok(()) => {
                info!("Now {target}");
                self.state = target;
            }
            Err(e) if e.is_partial() => {
                warn!("Now {target}, but {e}");
                self.state = target;
            }
            Err(e) => error!("Staying {}, will retry next cycle: {e}", self.state),
        }
    }

    /// Runs one sample/decide step and returns how long to wait before the next one.
    pub fn poll(&mut self) -> PollCycle {
        let idle = self.sample_idle();
        let threshold = self.context.threshold.get();
        debug!("Current idle time {idle:?}, threshold {threshold:?}");

        let sleep = if idle > threshold {
            if self.state == PresenceState::Active {
                self.transition(PresenceState::Away);
            }
            POLL_RESOLUTION
        } else {
            if self.state == PresenceState::Away {
                self.transition(PresenceState::Active);
            }
            POLL_RESOLUTION.saturating_add(threshold - idle)
        };

        PollCycle { idle, sleep }
    }

    /// Executes the monitor event loop until the shutdown token is cancelled.
    pub async fn run(mut self) {
        while !self.shutdown.is_cancelled() {
            let cycle = self.poll();
            let now = self.clock.instant();
            let wake_at = now
                .checked_add(cycle.sleep)
                .unwrap_or_else(|| now + FAR_FUTURE);
            debug!("Sleeping for {:?}", cycle.sleep);

            tokio::select! {
                // Cancellation interrupts the sleep, so shutdown never waits for a long
                // active-phase interval.
                _ = self.shutdown.cancelled() => break,
                _ = self.clock.sleep_until(wake_at) => ()
            }
        }
        info!("Idle monitor stopped");
    }
}
