//! Clap derive structures for the `ventaly` CLI.
//!
//! Defines the command tree, global flags, and shared value types.

use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use ventaly_core::LedColour;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// ventaly -- monitor and control Venta appliances on the local network
#[derive(Debug, Parser)]
#[command(
    name = "ventaly",
    version,
    about = "Monitor and control Venta humidifiers and air purifiers",
    long_about = "Talks to Venta appliances directly over the local network.\n\n\
        Detects which API dialect a device speaks (HTTP v2/v3 or raw TCP v0),\n\
        reads its status, and sends control actions.",
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
    /// Device profile to use
    #[arg(long, short = 'p', env = "VENTALY_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Device host or IP address (overrides profile)
    #[arg(long, env = "VENTALY_HOST", global = true)]
    pub host: Option<String>,

    /// Port override for every API dialect
    #[arg(long, env = "VENTALY_PORT", global = true)]
    pub port: Option<u16>,

    /// Output format [default: from config, else table]
    #[arg(long, short = 'o', env = "VENTALY_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Per-attempt timeout in seconds
    #[arg(long, env = "VENTALY_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain key=value lines (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

impl Toggle {
    pub fn is_on(self) -> bool {
        self == Self::On
    }
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Detect which API dialect a device speaks
    Detect(DetectArgs),

    /// Show the current device status
    #[command(alias = "st")]
    Status(StatusArgs),

    /// Send a control action
    Set(SetArgs),

    /// Poll the device and print every update
    Watch(WatchArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Detect ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DetectArgs {
    /// Only try dialects of this API version
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=3))]
    pub api_version: Option<u8>,

    /// Save the host and detected dialect under this profile name
    #[arg(long, value_name = "PROFILE")]
    pub save: Option<String>,
}

// ── Status ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Show only one section of the response
    #[arg(long, short = 's')]
    pub section: Option<Section>,

    /// Show maintenance counters and days left
    #[arg(long, short = 'm')]
    pub maintenance: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Section {
    Header,
    Action,
    Info,
    Measure,
}

// ── Set ──────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SetArgs {
    #[command(subcommand)]
    pub command: SetCommand,
}

#[derive(Debug, Subcommand)]
pub enum SetCommand {
    /// Switch the device on or off
    Power { state: Toggle },

    /// Set the target humidity in percent
    Humidity {
        #[arg(value_parser = clap::value_parser!(u8).range(0..=100))]
        percent: u8,
    },

    /// Set a manual fan level
    Fan {
        #[arg(value_parser = clap::value_parser!(u8).range(1..=5))]
        level: u8,
    },

    /// Enter sleep mode
    Sleep,

    /// Enter automatic mode
    Auto,

    /// Lock or unlock the device buttons
    ChildLock { state: Toggle },

    /// Switch the LED strip, or choose what drives its colour
    LedStrip { setting: LedStripSetting },

    /// Set the LED strip colour
    LedColour {
        /// Hex colour, e.g. '#ff8800'
        colour: LedColour,
    },

    /// Set the switch-off timer
    Timer {
        /// Hours until switch-off: 0 (off), 1, 3, 5, 7 or 9
        #[arg(value_parser = clap::value_parser!(u8).range(0..=9))]
        hours: u8,
    },

    /// Send a raw JSON action body as-is
    Raw {
        /// JSON object, e.g. '{"Action":{"Power":true}}'
        json: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LedStripSetting {
    On,
    Off,
    /// Colour follows the device state
    Internal,
    /// Colour set with `set led-colour`
    External,
    /// Internal, dark while the tank is empty
    InternalNoWater,
    /// External, dark while the tank is empty
    ExternalNoWater,
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Polling interval, e.g. "10s" or "1m" [default: from config]
    #[arg(long, short = 'i', value_parser = humantime::parse_duration)]
    pub interval: Option<Duration>,

    /// Exit after this many updates
    #[arg(long, short = 'n')]
    pub count: Option<u64>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// List the configured profiles
    Show,

    /// Print the config file path
    Path,

    /// Create a profile or point it at a new host
    SetHost {
        /// Hostname or IP address
        host: String,

        /// Make this the default profile
        #[arg(long)]
        default: bool,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
