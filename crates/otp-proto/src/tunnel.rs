//! A stream adapter that tunnels handshake bytes through the already
//! established part of a circuit (OTP §4.1, "Circuit extension").
//!
//! Extending a circuit to hop k+1 means running [`crate::handshake`]'s
//! initiator steps as if hop k+1 were directly connected, while every byte
//! actually crosses hops 1..k first. `TunnelStream` wraps the underlying
//! transport so the handshake code can stay oblivious to how many hops
//! currently sit in front of it: writes get layered through
//! [`CircuitCrypto::encrypt_outbound`] before hitting the wire, and reads get
//! layered through `decrypt_inbound` after coming off it.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use crate::stack::CircuitCrypto;

/// Wraps a transport to a circuit's first hop, transparently layering the
/// established hops' ciphers over every byte written or read.
pub struct TunnelStream<'a, S> {
    inner: S,
    established: &'a mut CircuitCrypto,
    /// An in-flight encrypted write that has not yet been fully accepted by
    /// `inner`, paired with how much of it has been written so far.
    pending_write: Option<(Vec<u8>, usize)>,
}

impl<'a, S> TunnelStream<'a, S> {
    /// Build a tunnel over `inner`, layering through `established`'s hops.
    pub fn new(inner: S, established: &'a mut CircuitCrypto) -> Self {
        Self {
            inner,
            established,
            pending_write: None,
        }
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for TunnelStream<'_, S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let before = buf.filled().len();
        let res = Pin::new(&mut this.inner).poll_read(cx, buf);
        if let Poll::Ready(Ok(())) = res {
            this.established.decrypt_inbound(&mut buf.filled_mut()[before..]);
        }
        res
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for TunnelStream<'_, S> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        if this.pending_write.is_none() {
            let mut encrypted = buf.to_vec();
            this.established.encrypt_outbound(&mut encrypted);
            this.pending_write = Some((encrypted, 0));
        }
        loop {
            let (data, offset) = this
                .pending_write
                .as_mut()
                .expect("just populated above");
            if *offset == data.len() {
                this.pending_write = None;
                return Poll::Ready(Ok(buf.len()));
            }
            match Pin::new(&mut this.inner).poll_write(cx, &data[*offset..]) {
                Poll::Ready(Ok(0)) => {
                    this.pending_write = None;
                    return Poll::Ready(Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "failed to write whole tunnel frame",
                    )));
                }
                Poll::Ready(Ok(n)) => *offset += n,
                Poll::Ready(Err(e)) => {
                    this.pending_write = None;
                    return Poll::Ready(Err(e));
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::hop::HopState;
    use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn tunnel_round_trips_through_one_established_hop() {
        let key = [5u8; 32];
        let iv = [1u8; 16];

        let (near_side, far_side) = duplex(4096);

        // The "far" end plays the already-established hop: it decrypts
        // whatever arrives with the matching decryptor and echoes it back
        // re-encrypted, exactly like a relay's forwarders would.
        let far = tokio::spawn(async move {
            let mut hop = HopState::new(&key, &iv);
            let mut far_side = far_side;
            let mut buf = vec![0u8; 5];
            far_side.read_exact(&mut buf).await.unwrap();
            hop.decrypt(&mut buf);
            hop.encrypt(&mut buf);
            far_side.write_all(&buf).await.unwrap();
        });

        let mut established = CircuitCrypto::new();
        established.push_hop(HopState::new(&key, &iv));
        let mut tunnel = TunnelStream::new(near_side, &mut established);

        tunnel.write_all(b"hello").await.unwrap();
        let mut echoed = [0u8; 5];
        tunnel.read_exact(&mut echoed).await.unwrap();
        assert_eq!(&echoed, b"hello");

        far.await.unwrap();
    }
}
