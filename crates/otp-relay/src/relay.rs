//! The relay's per-circuit state machine (OTP §4.2).
//!
//! ```text
//! INIT ──accept+handshake ok──▶ HANDSHAKED ──connect next hop ok──▶ ROUTING
//!   │            │                                │
//!   │            └──protocol/timeout err───────────┤
//!   └──any I/O err──▶ CLOSED ◀──EOF either side────┘
//! ```

use std::time::Duration;

use otp_proto::{run_responder, send_error, send_established, Decryptor, Encryptor, WireError};
use rand::rngs::OsRng;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

/// One accepted predecessor connection, driven from INIT through CLOSED.
///
/// There is exactly one `OtpService` per accepted TCP connection (OTP §3
/// invariant 5); it exclusively owns its predecessor stream, and its
/// successor stream once one is opened.
pub struct OtpService {
    /// The connection to whatever is one hop closer to the client.
    predecessor: TcpStream,
    /// Per-step handshake timeout (OTP §4.2).
    handshake_timeout: Duration,
    /// Route-phase read segment size (OTP §4.1).
    segment_size: usize,
}

impl OtpService {
    /// Build a service for a freshly accepted predecessor connection.
    pub fn new(predecessor: TcpStream, handshake_timeout: Duration, segment_size: usize) -> Self {
        Self {
            predecessor,
            handshake_timeout,
            segment_size,
        }
    }

    /// Run this service to completion: handshake, connect to the next hop,
    /// then route until either side closes.
    pub async fn run(mut self) {
        let (hop, destination) =
            match run_responder(&mut self.predecessor, self.handshake_timeout, &mut OsRng).await {
                Ok(result) => result,
                Err(otp_proto::Error::Timeout) => {
                    debug!("handshake timed out waiting on predecessor");
                    let _ = send_error(&mut self.predecessor, WireError::Timeout).await;
                    return;
                }
                Err(e) => {
                    // A bad hello already got its own error byte written by
                    // `run_responder`; any other failure means the
                    // predecessor stream is no longer usable.
                    debug!("handshake failed: {e}");
                    return;
                }
            };

        let dest_host = String::from_utf8_lossy(&destination.host).into_owned();
        let successor = match TcpStream::connect((dest_host.as_str(), destination.port)).await {
            Ok(stream) => stream,
            Err(e) => {
                debug!(
                    "could not connect to next hop {dest_host}:{}: {e}",
                    destination.port
                );
                let _ = send_error(&mut self.predecessor, WireError::DestinationConnection).await;
                return;
            }
        };

        if send_established(&mut self.predecessor).await.is_err() {
            return;
        }

        let (encryptor, decryptor) = hop.split();
        route(self.predecessor, successor, encryptor, decryptor, self.segment_size).await;
    }
}

/// Run the two concurrent forwarders for the route phase (OTP §4.2,
/// "Routing"; §5 "Per-relay forwarders"). Each forwarder owns exactly the
/// cipher half and socket halves it needs; they share no mutable state and
/// synchronize only by the cascading effect of TCP half-closes.
async fn route(
    predecessor: TcpStream,
    successor: TcpStream,
    mut encryptor: Encryptor,
    mut decryptor: Decryptor,
    segment_size: usize,
) {
    let (mut pred_read, mut pred_write) = predecessor.into_split();
    let (mut succ_read, mut succ_write) = successor.into_split();

    let inbound = tokio::spawn(async move {
        let mut buf = vec![0u8; segment_size];
        loop {
            let n = match pred_read.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => n,
            };
            decryptor.decrypt(&mut buf[..n]);
            if succ_write.write_all(&buf[..n]).await.is_err() {
                break;
            }
        }
        let _ = succ_write.shutdown().await;
    });

    let outbound = tokio::spawn(async move {
        let mut buf = vec![0u8; segment_size];
        loop {
            let n = match succ_read.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => n,
            };
            encryptor.encrypt(&mut buf[..n]);
            if pred_write.write_all(&buf[..n]).await.is_err() {
                break;
            }
        }
        let _ = pred_write.shutdown().await;
    });

    let _ = tokio::join!(inbound, outbound);
}
