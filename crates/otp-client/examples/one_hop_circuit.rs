//! Build a one-hop circuit to a loopback echo server and round-trip a
//! message through it.
//!
//! This assumes an `otp-relay` is already listening on `127.0.0.1:9001`
//! with an echo service (or another relay) reachable at the destination
//! given on the command line.

use std::env;
use std::process::ExitCode;

use otp_client::{Client, IntoDestination};
use rand::rngs::OsRng;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let mut args = env::args().skip(1);
    let relay: String = args.next().unwrap_or_else(|| "127.0.0.1:9001".to_owned());
    let destination: String = args
        .next()
        .unwrap_or_else(|| "127.0.0.1:9002".to_owned());

    let destination = match destination.into_destination() {
        Ok(dest) => dest,
        Err(err) => {
            eprintln!("invalid destination: {err}");
            return ExitCode::FAILURE;
        }
    };
    let relay_addr: std::net::SocketAddr = match relay.parse() {
        Ok(addr) => addr,
        Err(err) => {
            eprintln!("invalid relay address: {err}");
            return ExitCode::FAILURE;
        }
    };

    let mut client = Client::new(relay_addr);
    let record = otp_client::RelayRecord {
        host: relay_addr.ip().to_string(),
        port: relay_addr.port(),
    };

    if let Err(err) = client
        .connect_via(&[record], &destination, &mut OsRng)
        .await
    {
        eprintln!("could not build circuit: {err}");
        return ExitCode::FAILURE;
    }

    if let Err(err) = client.send(b"hello").await {
        eprintln!("send failed: {err}");
        return ExitCode::FAILURE;
    }

    match client.receive(64).await {
        Ok(reply) => println!("received {} bytes: {:?}", reply.len(), reply),
        Err(err) => {
            eprintln!("receive failed: {err}");
            return ExitCode::FAILURE;
        }
    }

    client.close().await;
    ExitCode::SUCCESS
}
