//! Periodic liveness heartbeats to a configured pool index (OTP §2, §4.4).

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, warn};

/// Heartbeat `advertised` to `pool_index` forever, sleeping for whatever
/// delay the pool index requests after each heartbeat. Falls back to
/// `fallback_interval` if a heartbeat attempt fails outright.
pub(crate) async fn heartbeat_loop(
    pool_index: SocketAddr,
    advertised: SocketAddr,
    fallback_interval: Duration,
) {
    loop {
        let delay = match heartbeat_once(pool_index, advertised).await {
            Ok(requested_delay) => requested_delay,
            Err(e) => {
                warn!("heartbeat to pool index {pool_index} failed: {e}");
                fallback_interval
            }
        };
        tokio::time::sleep(delay).await;
    }
}

/// Send a single HEARTBEAT command (`\x01`) and return the requested
/// next-heartbeat delay.
async fn heartbeat_once(pool_index: SocketAddr, advertised: SocketAddr) -> std::io::Result<Duration> {
    let mut stream = TcpStream::connect(pool_index).await?;
    stream.write_all(&[0x01]).await?;
    stream
        .write_all(advertised.ip().to_string().as_bytes())
        .await?;
    stream.write_all(&[0x00]).await?;
    stream.write_all(&advertised.port().to_be_bytes()).await?;

    let mut reply = [0u8; 1];
    stream.read_exact(&mut reply).await?;
    debug!("pool index requested next heartbeat in {}s", reply[0]);
    Ok(Duration::from_secs(u64::from(reply[0])))
}
