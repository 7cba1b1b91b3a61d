//! Command-line interface definitions

use crate::types::{ByteAccounting, Direction};
use clap::{ArgAction, Args, Parser, Subcommand};
use std::net::IpAddr;
use std::path::PathBuf;

/// LAN Speed Tester - measure HTTP throughput between two hosts on a local network
#[derive(Parser, Debug, Clone)]
#[command(name = "lst")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Flags shared by every subcommand
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(long, global = true)]
    pub debug: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the payload server that answers download and upload requests
    Serve(ServeArgs),

    /// Measure download and upload throughput against a payload server
    Measure(MeasureArgs),

    /// Print, write or check `.env` configuration files
    Env(EnvArgs),
}

/// Options for `lst serve`
#[derive(Args, Debug, Clone, Default)]
pub struct ServeArgs {
    /// Address to bind [default: 0.0.0.0]
    #[arg(long, value_name = "ADDR")]
    pub bind: Option<IpAddr>,

    /// Port to listen on [default: 8080]
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Size of each download response, e.g. 10MiB [default: 10MiB]
    #[arg(long, value_name = "SIZE", value_parser = parse_size_arg)]
    pub payload_size: Option<u64>,
}

/// Options for `lst measure`
#[derive(Args, Debug, Clone, Default)]
pub struct MeasureArgs {
    /// Base URL of the payload server [default: http://localhost:8080]
    #[arg(short, long, value_name = "URL")]
    pub server: Option<String>,

    /// Bytes moved by each transfer, e.g. 10MiB [default: 10MiB]
    #[arg(long, value_name = "SIZE", value_parser = parse_size_arg)]
    pub payload_size: Option<u64>,

    /// Sequential trials per direction [default: 5]
    #[arg(short = 'n', long)]
    pub trials: Option<u32>,

    /// Simultaneous transfers per trial [default: 4]
    #[arg(short, long)]
    pub concurrency: Option<u32>,

    /// Per-request timeout in seconds [default: 30]
    #[arg(short, long, value_parser = parse_duration)]
    pub timeout: Option<u64>,

    /// Direction to measure; repeat for both [default: download and upload]
    #[arg(short, long = "direction", value_name = "DIRECTION", action = ArgAction::Append, value_parser = parse_direction)]
    pub directions: Vec<Direction>,

    /// How bytes are counted: configured or observed [default: configured]
    #[arg(long, value_name = "MODE", value_parser = parse_byte_accounting)]
    pub byte_accounting: Option<ByteAccounting>,
}

/// Options for `lst env`
#[derive(Args, Debug, Clone)]
pub struct EnvArgs {
    #[command(subcommand)]
    pub action: EnvAction,
}

#[derive(Subcommand, Debug, Clone)]
pub enum EnvAction {
    /// Print an example .env file, or write it with --output
    Example {
        /// Write the example here instead of stdout; an existing file is never overwritten
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Check an env file for invalid values
    Check {
        /// File to check
        #[arg(default_value = ".env")]
        path: PathBuf,
    },

    /// List the supported environment variables
    Vars,
}

impl Cli {
    /// Check if colors should be enabled
    pub fn use_colors(&self) -> bool {
        if self.global.no_color {
            false
        } else {
            supports_color()
        }
    }
}

/// Parse duration from seconds string; range checks happen in config validation
fn parse_duration(s: &str) -> Result<u64, String> {
    s.trim().parse::<u64>().map_err(|_| format!("Invalid duration: {}", s))
}

fn parse_size_arg(s: &str) -> Result<u64, String> {
    crate::units::parse_size(s).map_err(|e| e.to_string())
}

fn parse_direction(s: &str) -> Result<Direction, String> {
    s.parse::<Direction>().map_err(|e| e.to_string())
}

fn parse_byte_accounting(s: &str) -> Result<ByteAccounting, String> {
    s.parse::<ByteAccounting>().map_err(|e| e.to_string())
}

/// Check if the terminal supports color output
pub fn supports_color() -> bool {
    if let Ok(term) = std::env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }

    #[cfg(target_os = "windows")]
    {
        if std::env::var("ANSICON").is_ok() || std::env::var("ConEmuANSI").is_ok() {
            return true;
        }
    }

    // Default to true on Unix-like systems, false on Windows
    #[cfg(unix)]
    {
        true
    }
    #[cfg(not(unix))]
    {
        false
    }
}
