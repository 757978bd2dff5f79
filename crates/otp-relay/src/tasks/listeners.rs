//! The relay's accept loop.

use std::time::Duration;

use tokio::net::TcpListener;
use tracing::debug;

use crate::relay::OtpService;

/// Accept predecessor connections on `listener` forever, spawning one
/// [`OtpService`] per accepted connection (OTP §3 invariant 5).
pub(crate) async fn accept_loop(
    listener: TcpListener,
    handshake_timeout: Duration,
    segment_size: usize,
) -> std::io::Result<std::convert::Infallible> {
    loop {
        let (stream, remote_addr) = listener.accept().await?;
        let remote_addr = safelog::Sensitive::new(remote_addr);
        debug!("accepted predecessor connection from {remote_addr}");

        tokio::spawn(async move {
            OtpService::new(stream, handshake_timeout, segment_size)
                .run()
                .await;
        });
    }
}
