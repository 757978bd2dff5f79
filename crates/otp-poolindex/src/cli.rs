//! Command-line argument parsing for the pool index binary.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, ValueEnum};

/// A pool index for the onion transport protocol.
#[derive(Clone, Debug, Parser)]
#[command(author = "The Tor Project Developers")]
#[command(version)]
pub(crate) struct Cli {
    #[command(flatten)]
    pub(crate) global: GlobalArgs,
}

/// Arguments accepted by the pool index binary.
#[derive(Clone, Debug, Args)]
pub(crate) struct GlobalArgs {
    /// Address to accept relay and client connections on.
    #[arg(long, default_value = "127.0.0.1:9000")]
    pub(crate) listen: SocketAddr,

    /// Seconds to tell a relay to wait before its next heartbeat.
    #[arg(long)]
    pub(crate) requested_delay: Option<u8>,

    /// Load configuration (overriding the flags above) from this TOML file
    /// instead.
    #[arg(long, value_name = "FILE")]
    pub(crate) config: Option<PathBuf>,

    /// Override the default log level.
    #[arg(long, short, value_name = "LEVEL")]
    pub(crate) log_level: Option<LogLevel>,
}

/// Log levels allowed by the cli.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub(crate) enum LogLevel {
    /// Only errors.
    Error,
    /// Errors and warnings.
    Warn,
    /// Errors, warnings, and informational messages.
    Info,
    /// Verbose debugging output.
    Debug,
    /// Everything, including per-byte protocol tracing.
    Trace,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Self::ERROR,
            LogLevel::Warn => Self::WARN,
            LogLevel::Info => Self::INFO,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Trace => Self::TRACE,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_parse() {
        let cli = Cli::parse_from(["otp-poolindex"]);
        assert_eq!(
            cli.global.listen,
            "127.0.0.1:9000".parse::<SocketAddr>().unwrap()
        );
        assert!(cli.global.requested_delay.is_none());
    }

    #[test]
    fn overrides_parse() {
        let cli = Cli::parse_from([
            "otp-poolindex",
            "--listen",
            "0.0.0.0:4000",
            "--requested-delay",
            "20",
        ]);
        assert_eq!(
            cli.global.listen,
            "0.0.0.0:4000".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(cli.global.requested_delay, Some(20));
    }
}
