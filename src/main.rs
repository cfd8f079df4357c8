use std::{sync::Arc, time::Duration};

use ansi_term::Colour;
use anyhow::{anyhow, Result};
use clap::Parser;
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tracing::{error, info};

use afk_presence::{
    args::HostArgs,
    idle_api::GenericIdleProbe,
    monitor::MonitorContext,
    plugin::{AfkPlugin, Console, InitStatus, PLUGIN_INFO},
    presence::{connections::ConnectionGateway, local::LocalConnections},
    utils::{
        dir::create_application_default_path,
        logging::{enable_logging, HOST_PREFIX},
        runtime::single_thread_runtime,
    },
};

struct StdoutConsole;

impl Console for StdoutConsole {
    fn print_message(&self, message: &str) {
        println!("{}", Colour::Cyan.paint(message));
    }
}

fn main() -> Result<()> {
    let args = HostArgs::parse();
    let app_dir = args.dir.map_or_else(create_application_default_path, Ok)?;
    enable_logging(HOST_PREFIX, &app_dir, args.log, args.log_console)?;
    info!("Loading {} v{}", PLUGIN_INFO.name, PLUGIN_INFO.version);

    let connections = Arc::new(LocalConnections::new(args.connections));
    let context = MonitorContext::new(Arc::new(ConnectionGateway::new(connections.clone())));
    context
        .threshold
        .set(Duration::from_secs(args.idle_time))
        .map_err(|e| anyhow!("--idle-time {}: {e}", args.idle_time))?;

    let mut plugin = AfkPlugin::new(
        context,
        Box::new(GenericIdleProbe::new()),
        Box::new(StdoutConsole),
    );
    if plugin.init() == InitStatus::Failure {
        return Err(anyhow!("{} failed to initialize", PLUGIN_INFO.name));
    }

    let runtime = single_thread_runtime()?;
    let result = runtime.block_on(run_console(&plugin, &connections));
    // A pending stdin read would otherwise keep the runtime alive.
    runtime.shutdown_background();
    plugin.shutdown();
    result.inspect_err(|e| error!("Console host stopped with an error {e:?}"))
}

async fn run_console(plugin: &AfkPlugin, connections: &LocalConnections) -> Result<()> {
    let prefix = format!("/{} ", PLUGIN_INFO.command_keyword);
    let mut lines = BufReader::new(io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => return Ok(()),
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            return Ok(());
        };
        let line = line.trim();

        match line {
            "/quit" => return Ok(()),
            "/status" => {
                for (id, status) in connections.statuses() {
                    println!("connection {id}: {status}");
                }
            }
            keyword if keyword == prefix.trim_end() => {
                plugin.process_command("");
            }
            command if command.starts_with(&prefix) => {
                plugin.process_command(&command[prefix.len()..]);
            }
            "" => (),
            other => println!(
                "{}",
                Colour::Red.paint(format!("Unknown command {other}, try {prefix}help"))
            ),
        }
    }
}
