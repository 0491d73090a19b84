//! Clap derive structures for the `tcc` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use tcc_core::{DeviceId, FanMode, SystemMode};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// tcc -- poll and control Total Connect Comfort thermostats
#[derive(Debug, Parser)]
#[command(
    name = "tcc",
    version,
    about = "Poll and control Total Connect Comfort thermostats",
    long_about = "Drives the portal through a resilient session: expired cookies are\n\
        renewed, transient server errors are retried with backoff, and a\n\
        device is only reported unavailable after repeated failed fetches.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Account profile to use
    #[arg(long, short = 'p', env = "TCC_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "TCC_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "TCC_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List locations and their thermostats
    #[command(alias = "ls")]
    Locations,

    /// Fetch and show the current state of each thermostat
    Status {
        /// Only show this device
        device: Option<DeviceId>,
    },

    /// Poll continuously until interrupted, printing every outcome
    Watch,

    /// Change setpoints, system mode or fan mode
    Set(SetArgs),

    /// Hold the away setpoints, or resume the schedule
    Away {
        device: DeviceId,
        state: AwayState,
    },

    /// Inspect configuration
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
#[command(arg_required_else_help = true)]
pub struct SetArgs {
    pub device: DeviceId,

    /// Heat setpoint (the low end in auto mode)
    #[arg(long)]
    pub heat: Option<f64>,

    /// Cool setpoint (the high end in auto mode)
    #[arg(long)]
    pub cool: Option<f64>,

    /// System mode: emheat, heat, off, cool, auto
    #[arg(long, value_parser = parse_system_mode)]
    pub mode: Option<SystemMode>,

    /// Fan mode: auto, on, circulate, follow-schedule
    #[arg(long, value_parser = parse_fan_mode)]
    pub fan: Option<FanMode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AwayState {
    On,
    Off,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration (passwords masked)
    Show,
    /// Print the config file path
    Path,
}

fn parse_system_mode(raw: &str) -> Result<SystemMode, String> {
    raw.parse()
        .map_err(|_| format!("unknown mode '{raw}' (expected emheat, heat, off, cool, auto)"))
}

fn parse_fan_mode(raw: &str) -> Result<FanMode, String> {
    raw.parse().map_err(|_| {
        format!("unknown fan mode '{raw}' (expected auto, on, circulate, follow-schedule)")
    })
}
