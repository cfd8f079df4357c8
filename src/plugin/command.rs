use std::time::Duration;

use tracing::{info, warn};

use crate::monitor::MonitorContext;

pub const HELP: [&str; 2] = [
    "AFKPlugin help:",
    "/afk idle_time [seconds] | set_away #gets or sets the max idle time, or toggles away",
];

/// A console command addressed to the plugin keyword, without the keyword itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    /// `idle_time [seconds]`
    IdleTime(Option<&'a str>),
    /// `set_away`
    SetAway,
    /// Anything unrecognized, including an empty command.
    Help,
}

impl<'a> Command<'a> {
    pub fn parse(input: &'a str) -> Self {
        let mut words = input.split_whitespace();
        match words.next() {
            Some("idle_time") => Command::IdleTime(words.next()),
            Some("set_away") => Command::SetAway,
            _ => Command::Help,
        }
    }

    /// Runs the command and returns the lines to show the user.
    pub fn execute(self, context: &MonitorContext) -> Vec<String> {
        match self {
            Command::IdleTime(None) => {
                vec![format!(
                    "max idle time: {}",
                    context.threshold.get().as_secs()
                )]
            }
            Command::IdleTime(Some(seconds)) => {
                let Ok(seconds) = seconds.parse::<u64>() else {
                    return vec!["idle_time expects a whole number of seconds".into()];
                };
                match context.threshold.set(Duration::from_secs(seconds)) {
                    Ok(()) => {
                        info!("Max idle time set to {seconds}s");
                        vec![]
                    }
                    Err(e) => vec![e.to_string()],
                }
            }
            Command::SetAway => {
                let target = !context.gateway.get_status();
                match context.gateway.set_status(target) {
                    Ok(()) => vec![format!("presence set to {target}")],
                    Err(e) => {
                        warn!("Manual toggle to {target} incomplete: {e}");
                        vec![format!("could not set presence to {target}: {e}")]
                    }
                }
            }
            Command::Help => HELP.iter().map(|line| line.to_string()).collect(),
        }
    }
}
