//! A relay binary for the onion transport protocol.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod cli;

use std::io::IsTerminal as _;

use clap::Parser;
use otp_relay::{Relay, RelayConfig};
use tracing::info;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::FmtSubscriber;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    let level: tracing::Level = cli
        .global
        .log_level
        .map(Into::into)
        .unwrap_or(otp_relay::config::DEFAULT_LOG_LEVEL);
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .parse("")
        .expect("empty filter directive should be trivially parsable");
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .finish()
        .init();

    let config = match &cli.global.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            RelayConfig::from_toml(&text)?
        }
        None => RelayConfig::new(cli.global.listen, cli.global.pool_index),
    };

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let relay = Relay::new(config);
        tokio::select! {
            res = relay.start() => res.map_err(anyhow::Error::from),
            _ = tokio::signal::ctrl_c() => {
                info!("received a ctrl-c; stopping the relay");
                Ok(())
            }
        }
    })
}
