use clap::{Parser, Subcommand};
use planit_core::config::ServerConfig;

/// Deadline notification scheduler.
///
/// Polls the task store on a fixed interval and posts a notification to the
/// messaging queue whenever a task crosses one of the configured thresholds.
#[derive(Parser, Debug)]
#[command(name = "planit-scheduler", version, about = "Deadline notification scheduler")]
pub struct CliArgs {
    /// Environment profile; keys are looked up as `<PROFILE>_<KEY>` first
    #[arg(long, env = "PLANIT_PROFILE")]
    pub profile: Option<String>,

    /// Bind host (overrides HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Bind port (overrides SCHEDULER_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Run the periodic scheduler and the HTTP API (default)
    Serve,
    /// Run a single notification cycle, print its report as JSON and exit
    RunOnce,
}

impl CliArgs {
    pub fn command(&self) -> Command {
        self.command.unwrap_or(Command::Serve)
    }

    pub fn apply_overrides(&self, server: &mut ServerConfig) {
        if let Some(host) = &self.host {
            server.host = host.clone();
        }
        if let Some(port) = self.port {
            server.port = port;
        }
    }
}
