use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod decode;
pub mod version;
pub mod watch;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Subscribe to a channel and print invalidations as they arrive.
    Watch(WatchArgs),
    /// Decode a captured STOMP byte stream and print its frames.
    Decode(DecodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Watch(args) => watch::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Broker address (host:port).
    pub addr: String,
    /// Login sent with CONNECT.
    #[arg(long, env = "STOMPSYNC_LOGIN")]
    pub login: String,
    /// Virtual host sent with CONNECT.
    #[arg(long, env = "STOMPSYNC_VHOST")]
    pub vhost: String,
    /// Destination to subscribe to.
    #[arg(long, env = "STOMPSYNC_CHANNEL")]
    pub channel: String,
    /// Exit after receiving N invalidations.
    #[arg(long)]
    pub count: Option<usize>,
    /// Shortest heartbeat interval to agree to (e.g. 10s, 500ms).
    #[arg(long, default_value = "10s")]
    pub min_heartbeat: String,
    /// Slack allowed past the broker's heartbeat interval.
    #[arg(long, default_value = "5s")]
    pub grace: String,
    /// TCP connect timeout.
    #[arg(long, default_value = "10s")]
    pub connect_timeout: String,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Capture file to read. Reads stdin when omitted.
    pub file: Option<PathBuf>,
    /// Feed the parser this many bytes at a time.
    #[arg(long, default_value = "4096")]
    pub chunk_size: NonZeroUsize,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse `500ms`, `5s`, or a bare number of seconds.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration(" 3 ").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        for input in ["", "0s", "bad", "5m", "-1s"] {
            let err = parse_duration(input).unwrap_err();
            assert_eq!(err.code, USAGE, "{input}");
        }
    }
}
