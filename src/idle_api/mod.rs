//! Contains logic for asking the operating system how long the user has been idle.
//! [GenericIdleProbe] is the main artifact of this module that abstracts
//! the platforms.

#[cfg(feature = "macos")]
pub mod macos;
#[cfg(feature = "win")]
pub mod win;
#[cfg(feature = "x11")]
pub mod x11;

#[cfg(feature = "win")]
extern crate windows;

#[cfg(feature = "x11")]
extern crate xcb;

use std::time::Duration;

use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("idle time source is unavailable: {0}")]
    Unavailable(#[from] anyhow::Error),
}

/// Intended to serve as a contract windows and linux systems must implement.
#[cfg_attr(test, mockall::automock)]
pub trait IdleProbe {
    /// Retrieve amount of time elapsed since the last user input event.
    fn idle_time(&mut self) -> Result<Duration, ProbeError>;
}

/// Used when no platform source could be started. Every sample fails, which the monitor
/// treats as "user is active".
pub struct UnavailableProbe;

impl IdleProbe for UnavailableProbe {
    fn idle_time(&mut self) -> Result<Duration, ProbeError> {
        Err(anyhow::anyhow!("no idle time source could be started").into())
    }
}

/// Serves as a cross-compatible IdleProbe implementation.
pub struct GenericIdleProbe {
    inner: Box<dyn IdleProbe + Send>,
}

impl GenericIdleProbe {
    /// Never fails. A platform source that cannot be started is replaced by [UnavailableProbe].
    pub fn new() -> Self {
        Self::or_unavailable(platform_probe())
    }

    fn or_unavailable(probe: anyhow::Result<Box<dyn IdleProbe + Send>>) -> Self {
        let inner: Box<dyn IdleProbe + Send> = match probe {
            Ok(probe) => probe,
            Err(e) => {
                warn!("Idle time source failed to start, user will always appear active: {e:?}");
                Box::new(UnavailableProbe)
            }
        };
        Self { inner }
    }
}

impl Default for GenericIdleProbe {
    fn default() -> Self {
        Self::new()
    }
}

fn platform_probe() -> anyhow::Result<Box<dyn IdleProbe + Send>> {
    cfg_if::cfg_if! {
        if #[cfg(feature = "win")] {
            Ok(Box::new(win::WindowsIdleProbe::new()))
        }
        else if #[cfg(feature = "x11")] {
            Ok(Box::new(x11::X11IdleProbe::new()?))
        }
        else if #[cfg(feature = "macos")] {
            Ok(Box::new(macos::MacosIdleProbe::new()?))
        }
        else {
            Err(anyhow::anyhow!("no idle time source was specified"))
        }
    }
}

impl IdleProbe for GenericIdleProbe {
    fn idle_time(&mut self) -> Result<Duration, ProbeError> {
        self.inner.idle_time()
    }
}
