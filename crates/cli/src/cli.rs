//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Lane Rover - camera lane following with obstacle avoidance
#[derive(Parser, Debug)]
#[command(
    name = "lane-rover",
    author,
    version,
    about = "Lane-following rover control loop",
    long_about = "Real-time perception-to-actuation loop for a lane-following rover.\n\n\
                  Reads camera frames, extracts the lane marking, fuses distance sensor \n\
                  reports, sends steer/speed commands over UDP and streams telemetry \n\
                  to operator stations."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "LANE_ROVER_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "LANE_ROVER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the control loop
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON); defaults apply when absent
    #[arg(short, long, env = "LANE_ROVER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override camera source type
    #[arg(long, value_enum, env = "LANE_ROVER_SOURCE")]
    pub source: Option<SourceArg>,

    /// Override recording directory or snapshot file
    #[arg(long, env = "LANE_ROVER_SOURCE_PATH")]
    pub source_path: Option<PathBuf>,

    /// Override control frequency (Hz)
    #[arg(long, env = "LANE_ROVER_FPS")]
    pub fps: Option<f64>,

    /// Override sensor listen address
    #[arg(long, env = "LANE_ROVER_SENSOR_BIND")]
    pub sensor_bind: Option<String>,

    /// Override actuator peer address
    #[arg(long, env = "LANE_ROVER_ACTUATOR")]
    pub actuator: Option<String>,

    /// Override operator listen address
    #[arg(long, env = "LANE_ROVER_OPERATOR_BIND")]
    pub operator_bind: Option<String>,

    /// Start driving immediately instead of waiting for an operator `start`
    #[arg(long, env = "LANE_ROVER_AUTOSTART")]
    pub autostart: bool,

    /// Maximum number of control ticks (0 = unlimited)
    #[arg(long, default_value = "0", env = "LANE_ROVER_MAX_TICKS")]
    pub max_ticks: u64,

    /// Run timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "LANE_ROVER_TIMEOUT")]
    pub timeout: u64,

    /// Validate configuration and exit without running
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "LANE_ROVER_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "rover.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file; defaults are shown when absent
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output the effective configuration as JSON
    #[arg(long)]
    pub json: bool,

    /// Show vision parameters
    #[arg(long)]
    pub vision: bool,

    /// Show control policy parameters
    #[arg(long)]
    pub control: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}

/// Camera source selectable from the command line
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum SourceArg {
    Synthetic,
    Recording,
    Snapshot,
}

impl From<SourceArg> for contracts::CameraSourceType {
    fn from(source: SourceArg) -> Self {
        match source {
            SourceArg::Synthetic => Self::Synthetic,
            SourceArg::Recording => Self::Recording,
            SourceArg::Snapshot => Self::Snapshot,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_overrides() {
        let cli = Cli::try_parse_from([
            "lane-rover",
            "-v",
            "run",
            "--source",
            "recording",
            "--source-path",
            "/tmp/frames",
            "--fps",
            "15",
            "--max-ticks",
            "100",
            "--autostart",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Run(args) => {
                assert!(matches!(args.source, Some(SourceArg::Recording)));
                assert_eq!(args.fps, Some(15.0));
                assert_eq!(args.max_ticks, 100);
                assert!(args.autostart);
                assert!(args.config.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["lane-rover", "-q", "-v", "info"]).is_err());
    }
}
