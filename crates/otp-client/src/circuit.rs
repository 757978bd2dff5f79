//! The client side of a built circuit: the TCP stream to hop 1, and the
//! layered cipher stack built up as the circuit is extended (OTP §3
//! "Circuit", §4.1 "Circuit extension").

use otp_proto::{classify_error_byte, run_initiator, CircuitCrypto, TunnelStream};
use rand::{CryptoRng, RngCore};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::address::Destination;
use crate::err::{Error, Result};

/// An established circuit: a direct TCP connection to hop 1, and the
/// layered cipher stack for every hop established so far, nearest first
/// (OTP §3 invariant 2).
pub struct Circuit {
    stream: TcpStream,
    crypto: CircuitCrypto,
}

impl Circuit {
    /// Open a direct TCP connection to `first_hop` and run the OTP
    /// handshake with it, telling it to route to `next`. This establishes
    /// hop 1 (OTP §6 `connect`).
    pub async fn connect<R: RngCore + CryptoRng>(
        first_hop: (&str, u16),
        next: &Destination,
        rng: &mut R,
    ) -> Result<Self> {
        let mut stream = TcpStream::connect(first_hop)
            .await
            .map_err(otp_proto::Error::Io)?;
        let hop = run_initiator(&mut stream, next.host_bytes(), next.port(), rng).await?;

        let mut crypto = CircuitCrypto::new();
        crypto.push_hop(hop);
        Ok(Self { stream, crypto })
    }

    /// Extend this circuit by one hop: tunnel a fresh OTP handshake through
    /// every already-established hop, telling the new farthest hop to route
    /// to `next` (OTP §4.1 "Circuit extension", OTP §6 `next_destination`).
    pub async fn next_destination<R: RngCore + CryptoRng>(
        &mut self,
        next: &Destination,
        rng: &mut R,
    ) -> Result<()> {
        let mut tunnel = TunnelStream::new(&mut self.stream, &mut self.crypto);
        let hop = run_initiator(&mut tunnel, next.host_bytes(), next.port(), rng).await?;
        self.crypto.push_hop(hop);
        Ok(())
    }

    /// Number of hops established so far.
    pub fn len(&self) -> usize {
        self.crypto.len()
    }

    /// Encrypt `data` through every established hop (farthest first) and
    /// write it to hop 1 (OTP §3 invariant 2, OTP §6 `send`).
    pub async fn send(&mut self, data: &[u8]) -> Result<()> {
        let mut buf = data.to_vec();
        self.crypto.encrypt_outbound(&mut buf);
        self.stream
            .write_all(&buf)
            .await
            .map_err(otp_proto::Error::Io)?;
        Ok(())
    }

    /// Read up to `buf_size` bytes from hop 1 and decrypt them through
    /// every established hop, nearest first (OTP §6 `receive`).
    ///
    /// A clean close with no bytes available is reported as an I/O error;
    /// there is no trailing byte to classify in that case (OTP §4.3).
    pub async fn receive(&mut self, buf_size: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; buf_size];
        let n = self.stream.read(&mut buf).await.map_err(otp_proto::Error::Io)?;
        if n == 0 {
            return Err(otp_proto::Error::Io(std::io::Error::from(
                std::io::ErrorKind::UnexpectedEof,
            ))
            .into());
        }
        buf.truncate(n);
        self.crypto.decrypt_inbound(&mut buf);
        Ok(buf)
    }

    /// Read exactly `n` bytes before decrypting (OTP §6 `receive_exactly`).
    ///
    /// If the stream EOFs before `n` bytes arrive, whatever was read is
    /// still decrypted, and the last decrypted byte is classified as an
    /// error code (OTP §4.3, "Error propagation on receive"): this is how a
    /// relay's in-band error byte, tunneled back through every established
    /// hop's encryptor, is recognized by the client.
    pub async fn receive_exactly(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        let mut read_total = 0;
        while read_total < n {
            let got = self
                .stream
                .read(&mut buf[read_total..])
                .await
                .map_err(otp_proto::Error::Io)?;
            if got == 0 {
                break;
            }
            read_total += got;
        }

        if read_total == n {
            self.crypto.decrypt_inbound(&mut buf);
            return Ok(buf);
        }

        if read_total == 0 {
            return Err(otp_proto::Error::Io(std::io::Error::from(
                std::io::ErrorKind::UnexpectedEof,
            ))
            .into());
        }

        buf.truncate(read_total);
        self.crypto.decrypt_inbound(&mut buf);
        let last = *buf.last().expect("read_total > 0");
        Err(classify_error_byte(last).into())
    }

    /// Close the circuit: shut down the write half, then drop the stream.
    /// Half-closing first lets hop 1 observe EOF and cascade a close down
    /// the rest of the circuit before the socket is actually released (OTP
    /// §5, "Cancellation").
    pub async fn close(mut self) {
        let _ = self.stream.shutdown().await;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use otp_proto::{run_responder, send_error, send_established, WireError};
    use rand::rngs::OsRng;
    use std::time::Duration;
    use tokio::net::TcpListener;

    use crate::address::IntoDestination;

    /// Spin up an echo destination plus a relay that handshakes with its
    /// predecessor and routes to whatever destination the handshake named.
    /// Returns `(relay_addr, echo_addr)`.
    async fn spawn_one_hop_relay() -> (std::net::SocketAddr, std::net::SocketAddr) {
        let echo_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let echo_addr = echo_listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut sock, _) = echo_listener.accept().await.unwrap();
            let mut buf = [0u8; 64];
            loop {
                let n = match sock.read(&mut buf).await {
                    Ok(0) | Err(_) => return,
                    Ok(n) => n,
                };
                if sock.write_all(&buf[..n]).await.is_err() {
                    return;
                }
            }
        });

        let relay_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let relay_addr = relay_listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut predecessor, _) = relay_listener.accept().await.unwrap();
            let (hop, dest) = run_responder(&mut predecessor, Duration::from_secs(5), &mut OsRng)
                .await
                .unwrap();
            let dest_host = String::from_utf8_lossy(&dest.host).into_owned();
            let mut successor = TcpStream::connect((dest_host.as_str(), dest.port))
                .await
                .unwrap();
            send_established(&mut predecessor).await.unwrap();

            let (mut encryptor, mut decryptor) = hop.split();
            let (mut pred_read, mut pred_write) = predecessor.into_split();
            let (mut succ_read, mut succ_write) = successor.into_split();
            let inbound = tokio::spawn(async move {
                let mut buf = [0u8; 32];
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
            });
            let outbound = tokio::spawn(async move {
                let mut buf = [0u8; 32];
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
            });
            let _ = tokio::join!(inbound, outbound);
        });

        (relay_addr, echo_addr)
    }

    #[tokio::test]
    async fn one_hop_round_trip() {
        let (relay_addr, echo_addr) = spawn_one_hop_relay().await;
        let destination = (echo_addr.ip().to_string(), echo_addr.port())
            .into_destination()
            .unwrap();

        let mut circuit = Circuit::connect(
            (relay_addr.ip().to_string().as_str(), relay_addr.port()),
            &destination,
            &mut OsRng,
        )
        .await
        .unwrap();

        circuit.send(b"ping").await.unwrap();
        let reply = circuit.receive_exactly(4).await.unwrap();
        assert_eq!(reply, b"ping");
        circuit.close().await;
    }

    #[tokio::test]
    async fn destination_connection_error_is_classified_during_connect() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut predecessor, _) = listener.accept().await.unwrap();
            let (_hop, _dest) =
                run_responder(&mut predecessor, Duration::from_secs(5), &mut OsRng)
                    .await
                    .unwrap();
            // Simulate a failed next-hop connect (OTP §4.2): an error byte
            // arrives in place of H11's ETB marker.
            send_error(&mut predecessor, WireError::DestinationConnection)
                .await
                .unwrap();
        });

        let destination = ("example.com", 80).into_destination().unwrap();
        let err = Circuit::connect((addr.ip().to_string().as_str(), addr.port()), &destination, &mut OsRng)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Otp(otp_proto::Error::PeerReported(WireError::DestinationConnection))
        ));
    }
}
