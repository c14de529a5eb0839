mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "stompsync", version, about = "STOMP sync-invalidation client")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    match cmd::run(cli.command, format) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_watch_subcommand() {
        let cli = Cli::try_parse_from([
            "stompsync",
            "watch",
            "127.0.0.1:61613",
            "--login",
            "user",
            "--vhost",
            "vh",
            "--channel",
            "/topic/sync",
            "--count",
            "3",
        ])
        .expect("watch args should parse");

        let Command::Watch(args) = cli.command else {
            panic!("expected watch");
        };
        assert_eq!(args.count, Some(3));
        assert_eq!(args.min_heartbeat, "10s");
    }

    #[test]
    fn rejects_zero_chunk_size() {
        let err = Cli::try_parse_from(["stompsync", "decode", "--chunk-size", "0"])
            .expect_err("zero chunk size should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn parses_decode_from_stdin() {
        let cli = Cli::try_parse_from(["stompsync", "--format", "pretty", "decode"])
            .expect("decode args should parse");
        assert!(matches!(cli.format, Some(OutputFormat::Pretty)));
        assert!(matches!(cli.command, Command::Decode(ref args) if args.file.is_none()));
    }
}
