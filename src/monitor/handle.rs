use std::thread::{self, JoinHandle};

use anyhow::{anyhow, Result};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::utils::runtime::single_thread_runtime;

use super::IdleMonitor;

/// Owns the dedicated thread an [IdleMonitor] runs on. Dropping a live handle stops the monitor
/// and waits for the thread.
pub struct MonitorHandle {
    shutdown: CancellationToken,
    thread: Option<JoinHandle<Result<()>>>,
}

impl MonitorHandle {
    /// `shutdown` must be the token the monitor was built with.
    pub fn spawn(monitor: IdleMonitor, shutdown: CancellationToken) -> std::io::Result<Self> {
        let thread = thread::Builder::new()
            .name("idle-monitor".into())
            .spawn(move || {
                single_thread_runtime()
                    .inspect_err(|e| error!("Failed to create monitor runtime {e:?}"))?
                    .block_on(monitor.run());
                Ok(())
            })?;
        info!("Idle loop thread created");

        Ok(Self {
            shutdown,
            thread: Some(thread),
        })
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|thread| !thread.is_finished())
    }

    /// Cancels the monitor, interrupting any sleep, and joins its thread.
    pub fn stop(mut self) -> Result<()> {
        self.stop_inner()
    }

    fn stop_inner(&mut self) -> Result<()> {
        let Some(thread) = self.thread.take() else {
            return Ok(());
        };
        info!("Cancelling idle loop thread");
        self.shutdown.cancel();
        let result = thread
            .join()
            .map_err(|_| anyhow!("Idle loop thread panicked"))?;
        info!("Idle thread cancelled");
        result
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        if let Err(e) = self.stop_inner() {
            error!("Idle monitor did not stop cleanly {e:?}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::Arc,
        time::{Duration, Instant},
    };

    use super::*;
    use crate::{
        idle_api::MockIdleProbe,
        monitor::{MonitorContext, POLL_RESOLUTION},
        presence::{MockPresenceGateway, PresenceState},
        utils::clock::DefaultClock,
    };

    fn spawn_sleeping_monitor() -> MonitorHandle {
        let mut probe = MockIdleProbe::new();
        probe.expect_idle_time().returning(|| Ok(Duration::ZERO));
        let mut gateway = MockPresenceGateway::new();
        gateway
            .expect_get_status()
            .return_const(PresenceState::Active);

        let shutdown = CancellationToken::new();
        let monitor = IdleMonitor::new(
            MonitorContext::new(Arc::new(gateway)),
            Box::new(probe),
            Box::new(DefaultClock),
            shutdown.clone(),
        );
        MonitorHandle::spawn(monitor, shutdown).unwrap()
    }

    #[test]
    fn stop_interrupts_a_long_sleep() {
        // Default threshold with zero idle time schedules a 605 second sleep.
        let handle = spawn_sleeping_monitor();
        std::thread::sleep(Duration::from_millis(100));
        assert!(handle.is_running());

        let started = Instant::now();
        handle.stop().unwrap();
        assert!(started.elapsed() < POLL_RESOLUTION);
    }

    #[test]
    fn drop_joins_the_thread() {
        let handle = spawn_sleeping_monitor();
        let started = Instant::now();
        drop(handle);
        assert!(started.elapsed() < POLL_RESOLUTION);
    }
}
