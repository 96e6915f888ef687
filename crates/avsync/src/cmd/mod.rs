use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use avsync_link::ReceiverEndpoint;
use clap::{Args, Subcommand};

use crate::exit::{endpoint_error, CliError, CliResult, INTERNAL, USAGE};
use crate::output::OutputFormat;

pub mod check;
pub mod monitor;
pub mod run;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Relay the primary receiver's power state to the secondaries.
    Run(RunArgs),
    /// Validate a configuration file and list its receivers.
    Check(CheckArgs),
    /// Send a single ISCP command to a receiver.
    Send(SendArgs),
    /// Print the messages a receiver emits.
    Monitor(MonitorArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Run(args) => run::run(args),
        Command::Check(args) => check::run(args, format),
        Command::Send(args) => send::run(args),
        Command::Monitor(args) => monitor::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Relay configuration file.
    #[arg(long, env = "AVSYNC_CONFIG", default_value = "config.json")]
    pub config: PathBuf,
    /// Interval between power-state queries to the primary (e.g. 10s, 500ms).
    #[arg(long, default_value = "10s")]
    pub probe_interval: String,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Relay configuration file.
    #[arg(long, env = "AVSYNC_CONFIG", default_value = "config.json")]
    pub config: PathBuf,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Receiver endpoint: eiscp://host[:port], tcp://host:port or serial:<device>.
    pub endpoint: String,
    /// ISCP command, e.g. `!1PWR01`. A bare `PWR01` is sent to the main zone.
    pub command: String,
}

#[derive(Args, Debug)]
pub struct MonitorArgs {
    /// Receiver endpoint: eiscp://host[:port], tcp://host:port or serial:<device>.
    pub endpoint: String,
    /// Exit after printing N messages.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub(crate) fn parse_endpoint(input: &str) -> CliResult<ReceiverEndpoint> {
    input.parse().map_err(endpoint_error)
}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

pub(crate) fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("10s").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert!(parse_duration(" ").is_err());
    }

    #[test]
    fn bad_endpoint_is_usage_error() {
        let err = parse_endpoint("udp://10.0.0.2:60128").unwrap_err();
        assert_eq!(err.code, USAGE);
        assert!(parse_endpoint("tcp://10.0.0.2:23").is_ok());
    }
}
