use std::path::PathBuf;

use clap::Parser;
use tracing::level_filters::LevelFilter;

#[derive(Parser, Debug)]
#[command(name = "afk-presence", version)]
#[command(about = "Console host for the AFK plugin. Type /afk commands, /status or /quit.", long_about = None)]
pub struct HostArgs {
    #[arg(long = "idle-time", default_value_t = 600, help = "Initial max idle time in seconds")]
    pub idle_time: u64,
    #[arg(long, default_value_t = 1, help = "Number of simulated server connections")]
    pub connections: usize,
    #[arg(
        long,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    pub dir: Option<PathBuf>,
    /// This option is for debugging purposes only.
    #[arg(long = "log-console")]
    pub log_console: bool,
    #[arg(long = "log-filter")]
    pub log: Option<LevelFilter>,
}
