//! Facade the host talks to. Every entry point reports a status value instead of returning an
//! error, so nothing fails across the host boundary.

pub mod command;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::{
    idle_api::IdleProbe,
    monitor::{handle::MonitorHandle, IdleMonitor, MonitorContext},
    presence::connections::ConnectionId,
    utils::clock::DefaultClock,
};

use command::Command;

pub struct PluginInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub api_version: i32,
    pub author: &'static str,
    pub description: &'static str,
    pub command_keyword: &'static str,
    pub request_autoload: bool,
}

pub const PLUGIN_INFO: PluginInfo = PluginInfo {
    name: "AFKPlugin",
    version: env!("CARGO_PKG_VERSION"),
    api_version: 20,
    author: "oopsies49",
    description: "This plugin toggles the away status after a set amount of idle time.",
    command_keyword: "afk",
    request_autoload: true,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum InitStatus {
    Success = 0,
    Failure = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum CommandStatus {
    Handled = 0,
    NotHandled = 1,
}

/// Whether the plugin claims a host-reported error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ErrorHandling {
    NotHandled = 0,
    Handled = 1,
}

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("failed creating idle loop thread")]
    ThreadStart(#[source] std::io::Error),
    #[error("idle monitor is running or was already started by this plugin instance")]
    AlreadyRunning,
}

/// Host output, the equivalent of printing into the current chat tab.
pub trait Console {
    fn print_message(&self, message: &str);
}

pub struct AfkPlugin {
    context: MonitorContext,
    probe: Option<Box<dyn IdleProbe + Send>>,
    console: Box<dyn Console>,
    monitor: Option<MonitorHandle>,
}

impl AfkPlugin {
    pub fn new(
        context: MonitorContext,
        probe: Box<dyn IdleProbe + Send>,
        console: Box<dyn Console>,
    ) -> Self {
        Self {
            context,
            probe: Some(probe),
            console,
            monitor: None,
        }
    }

    pub fn context(&self) -> &MonitorContext {
        &self.context
    }

    pub fn is_running(&self) -> bool {
        self.monitor.as_ref().is_some_and(MonitorHandle::is_running)
    }

    /// Called right after the host loads the plugin. On failure the host unloads it again.
    pub fn init(&mut self) -> InitStatus {
        info!("Plugin init");
        match self.start_monitor() {
            Ok(()) => InitStatus::Success,
            Err(e) => {
                error!("Plugin init failed: {e:?}");
                InitStatus::Failure
            }
        }
    }

    fn start_monitor(&mut self) -> Result<(), PluginError> {
        if self.monitor.is_some() {
            return Err(PluginError::AlreadyRunning);
        }
        let probe = self.probe.take().ok_or(PluginError::AlreadyRunning)?;

        let shutdown = CancellationToken::new();
        let monitor = IdleMonitor::new(
            self.context.clone(),
            probe,
            Box::new(DefaultClock),
            shutdown.clone(),
        );
        let handle = MonitorHandle::spawn(monitor, shutdown).map_err(PluginError::ThreadStart)?;
        self.monitor = Some(handle);
        Ok(())
    }

    /// Called right before the host unloads the plugin. Returns once the monitor thread is gone.
    /// Does nothing when no monitor is running, so an explicit call followed by drop is fine.
    pub fn shutdown(&mut self) -> bool {
        let Some(monitor) = self.monitor.take() else {
            return false;
        };
        info!("Plugin shutdown");
        if let Err(e) = monitor.stop() {
            error!("Idle monitor did not stop cleanly {e:?}");
        }
        true
    }

    /// Handles `/<keyword> ...` with the keyword already stripped by the host.
    pub fn process_command(&self, command: &str) -> CommandStatus {
        info!("Process command: '{command}'");
        for line in Command::parse(command).execute(&self.context) {
            self.console.print_message(&line);
        }
        CommandStatus::Handled
    }

    pub fn on_server_error(
        &self,
        connection: ConnectionId,
        message: &str,
        error: u32,
        return_code: Option<&str>,
    ) -> ErrorHandling {
        info!(
            "Server error event {connection} {message} {error} {}",
            return_code.unwrap_or_default()
        );
        // Only errors raised for our own return codes are ours to swallow.
        match return_code {
            Some(_) => ErrorHandling::Handled,
            None => ErrorHandling::NotHandled,
        }
    }
}

impl Drop for AfkPlugin {
    fn drop(&mut self) {
        if self.shutdown() {
            debug!("Plugin dropped while its monitor was running");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{Arc, Mutex},
        time::Duration,
    };

    use super::*;
    use crate::{
        idle_api::MockIdleProbe,
        presence::{MockPresenceGateway, PresenceState},
        utils::logging::TEST_LOGGING,
    };

    #[derive(Clone, Default)]
    struct RecordingConsole {
        lines: Arc<Mutex<Vec<String>>>,
    }

    impl Console for RecordingConsole {
        fn print_message(&self, message: &str) {
            self.lines.lock().unwrap().push(message.to_string());
        }
    }

    fn plugin(console: RecordingConsole) -> AfkPlugin {
        let mut probe = MockIdleProbe::new();
        probe.expect_idle_time().returning(|| Ok(Duration::ZERO));
        let mut gateway = MockPresenceGateway::new();
        gateway
            .expect_get_status()
            .return_const(PresenceState::Active);
        AfkPlugin::new(
            MonitorContext::new(Arc::new(gateway)),
            Box::new(probe),
            Box::new(console),
        )
    }

    #[test]
    fn init_and_shutdown_manage_the_monitor() {
        *TEST_LOGGING;
        let mut plugin = plugin(RecordingConsole::default());
        assert_eq!(plugin.init(), InitStatus::Success);
        assert!(plugin.is_running());

        assert!(plugin.shutdown());
        assert!(!plugin.is_running());
        assert!(!plugin.shutdown());
    }

    #[test]
    fn shutdown_without_monitor_does_nothing() {
        let mut plugin = plugin(RecordingConsole::default());
        assert!(!plugin.shutdown());
        assert!(!plugin.is_running());
        // The probe is still available, so the plugin can start afterwards.
        assert_eq!(plugin.init(), InitStatus::Success);
        assert!(plugin.shutdown());
    }

    #[test]
    fn second_start_reports_already_running() {
        let mut plugin = plugin(RecordingConsole::default());
        plugin.start_monitor().unwrap();
        assert!(matches!(
            plugin.start_monitor(),
            Err(PluginError::AlreadyRunning)
        ));
        plugin.shutdown();
        assert!(matches!(
            plugin.start_monitor(),
            Err(PluginError::AlreadyRunning)
        ));
    }

    #[test]
    fn second_init_fails() {
        let mut plugin = plugin(RecordingConsole::default());
        assert_eq!(plugin.init(), InitStatus::Success);
        assert_eq!(plugin.init(), InitStatus::Failure);
        assert!(plugin.is_running());

        plugin.shutdown();
        assert_eq!(plugin.init(), InitStatus::Failure);
    }

    #[test]
    fn commands_print_to_console() {
        let console = RecordingConsole::default();
        let plugin = plugin(console.clone());

        assert_eq!(plugin.process_command("idle_time 20"), CommandStatus::Handled);
        assert_eq!(plugin.process_command("idle_time"), CommandStatus::Handled);
        assert_eq!(plugin.process_command("bogus"), CommandStatus::Handled);

        assert_eq!(
            *console.lines.lock().unwrap(),
            vec![
                "max idle time: 20",
                command::HELP[0],
                command::HELP[1],
            ]
        );
        assert_eq!(plugin.context().threshold.get(), Duration::from_secs(20));
    }

    #[test]
    fn server_errors_are_claimed_only_with_return_code() {
        let plugin = plugin(RecordingConsole::default());
        assert_eq!(
            plugin.on_server_error(1, "insufficient permissions", 2568, Some("afk-1")),
            ErrorHandling::Handled
        );
        assert_eq!(
            plugin.on_server_error(1, "insufficient permissions", 2568, None),
            ErrorHandling::NotHandled
        );
    }

    #[test]
    fn plugin_info_matches_command_keyword() {
        assert_eq!(PLUGIN_INFO.command_keyword, "afk");
        assert_eq!(PLUGIN_INFO.version, env!("CARGO_PKG_VERSION"));
        assert!(PLUGIN_INFO.request_autoload);
    }
}
