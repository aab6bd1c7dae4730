//! CLI command definitions and dispatch.

pub mod port;
pub mod probe;
pub mod start;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use runm_common::config::{LauncherLocation, ShimConfig};

/// runm-ctl: Drive the runm created-state controller by hand.
#[derive(Parser, Debug)]
#[command(name = "runm-ctl", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// JSON shim configuration file.
    #[arg(long, global = true, env = "RUNM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the port broker endpoint.
    #[arg(long, global = true, env = "RUNM_BROKER_ENDPOINT")]
    pub broker_endpoint: Option<String>,

    /// Override the auxiliary launcher binary.
    #[arg(long, global = true, env = "RUNM_LAUNCHER")]
    pub launcher: Option<PathBuf>,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

/// Log line format written to stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per line.
    Json,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start a bundle: launch the auxiliary service if the marker is present.
    Start(start::StartArgs),
    /// Check a root filesystem for the marker.
    Probe(probe::ProbeArgs),
    /// Request a port from the broker for a sandbox.
    Port(port::PortArgs),
}

impl Cli {
    /// Builds the shim configuration from the file and flag overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be loaded or the
    /// result is invalid.
    pub fn shim_config(&self) -> anyhow::Result<ShimConfig> {
        let mut config = match &self.config {
            Some(path) => ShimConfig::load(path).map_err(|e| anyhow::anyhow!("{e}"))?,
            None => ShimConfig::default(),
        };
        if let Some(endpoint) = &self.broker_endpoint {
            config.broker_endpoint.clone_from(endpoint);
        }
        if let Some(path) = &self.launcher {
            config.launcher = LauncherLocation::Explicit { path: path.clone() };
        }
        config.validate().map_err(|e| anyhow::anyhow!("{e}"))?;
        Ok(config)
    }
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let config = cli.shim_config()?;
    tracing::debug!(?config, "resolved shim configuration");
    match cli.command {
        Command::Start(args) => start::execute(args, config),
        Command::Probe(args) => probe::execute(args, &config),
        Command::Port(args) => port::execute(args, &config),
    }
}
