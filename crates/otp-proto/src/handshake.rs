//! The OTP handshake, steps H1 through H11 (OTP §4.1).
//!
//! Shaped after `tor-proto`'s split between the pieces of an ntor handshake
//! that run on a raw transport and the layer of key derivation built on top,
//! but OTP's handshake is request/response over whatever stream carries it
//! (a direct TCP socket at the relay, or a [`crate::tunnel::TunnelStream`]
//! when extending a circuit), so every step here is generic over
//! `AsyncRead + AsyncWrite`.

use std::time::Duration;

use otp_llcrypto::kdf::derive_session_key;
use otp_llcrypto::pk::curve25519::{PublicKey, StaticSecret};
use rand_core::{CryptoRng, RngCore};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::err::{classify_error_byte, Error, Result, WireError};
use crate::hop::HopState;

/// The client hello/server hello literal (OTP §4.1, H1/H2).
pub const HELLO: &[u8; 16] = b"Hello TPDP/0.1\r\n";
/// The two-byte ACK sent after installing a cipher, and after the hostname
/// (OTP §4.1, H6/H9).
pub const ACK: [u8; 2] = [0x06, 0x06];
/// The two-byte "circuit established" marker (OTP §4.1, H11).
pub const ETB: [u8; 2] = [0x17, 0x17];

/// Read exactly `buf.len()` bytes, or fail with [`Error::Timeout`] if `dur`
/// elapses first (OTP §4.2, "Handshake timeout").
async fn timed_read_exact<S: AsyncRead + Unpin>(
    stream: &mut S,
    buf: &mut [u8],
    dur: Duration,
) -> Result<()> {
    match tokio::time::timeout(dur, stream.read_exact(buf)).await {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(e)) => Err(Error::Io(e)),
        Err(_) => Err(Error::Timeout),
    }
}

/// Read one byte and confirm it starts `HELLO`, reading and checking the
/// rest if so; otherwise the byte is the start of an error code, and since
/// error codes are always a single byte, classify it directly.
async fn expect_hello<S: AsyncRead + Unpin>(stream: &mut S) -> Result<()> {
    let mut first = [0u8; 1];
    stream.read_exact(&mut first).await?;
    if first[0] != HELLO[0] {
        return Err(classify_error_byte(first[0]));
    }
    let mut rest = [0u8; 15];
    stream.read_exact(&mut rest).await?;
    if rest != HELLO[1..] {
        return Err(Error::Protocol("server hello mismatch"));
    }
    Ok(())
}

/// Read one byte and confirm it starts `expected`, reading and checking the
/// second byte if so; otherwise classify the single byte as an error code.
/// Used for the ACK (H6/H9) and ETB (H11) markers, which are both two bytes
/// wide but collapse to a single error byte on failure.
async fn expect_two_byte_marker<S: AsyncRead + Unpin>(
    stream: &mut S,
    expected: [u8; 2],
) -> Result<()> {
    let mut first = [0u8; 1];
    stream.read_exact(&mut first).await?;
    if first[0] != expected[0] {
        return Err(classify_error_byte(first[0]));
    }
    let mut second = [0u8; 1];
    stream.read_exact(&mut second).await?;
    if second[0] != expected[1] {
        return Err(Error::Protocol("malformed two-byte marker"));
    }
    Ok(())
}

/// Run the initiator side of the OTP handshake (client role) over `stream`,
/// negotiating a fresh hop and telling the responder which destination to
/// reach next.
///
/// `stream` may be a direct TCP connection to the first hop, or a
/// [`crate::tunnel::TunnelStream`] wrapping the already-established part of
/// a circuit (OTP §4.1, "Circuit extension").
pub async fn run_initiator<S, R>(
    stream: &mut S,
    destination_host: &[u8],
    destination_port: u16,
    rng: &mut R,
) -> Result<HopState>
where
    S: AsyncRead + AsyncWrite + Unpin,
    R: RngCore + CryptoRng,
{
    // H1
    stream.write_all(HELLO).await?;
    // H2
    expect_hello(stream).await?;

    // H3
    let my_secret = StaticSecret::random_from_rng(&mut *rng);
    let my_public = PublicKey::from(&my_secret);
    stream.write_all(my_public.as_bytes()).await?;
    // H4
    let mut their_public_bytes = [0u8; 32];
    stream.read_exact(&mut their_public_bytes).await?;
    let their_public = PublicKey::from(their_public_bytes);
    // H5
    let mut iv = [0u8; 16];
    rng.fill_bytes(&mut iv);
    stream.write_all(&iv).await?;
    // H6
    expect_two_byte_marker(stream, ACK).await?;

    let shared = my_secret.diffie_hellman(&their_public);
    let key = derive_session_key(shared.as_bytes());
    let mut hop = HopState::new(&key, &iv);

    // H7: length travels in the clear (OTP §9 open question 2).
    let len = u16::try_from(destination_host.len())
        .map_err(|_| Error::Protocol("destination hostname too long"))?;
    stream.write_all(&len.to_be_bytes()).await?;
    // H8
    let mut host_buf = destination_host.to_vec();
    hop.encrypt(&mut host_buf);
    stream.write_all(&host_buf).await?;
    // H9
    expect_two_byte_marker(stream, ACK).await?;

    // H10
    let mut port_buf = destination_port.to_be_bytes();
    hop.encrypt(&mut port_buf);
    stream.write_all(&port_buf).await?;
    // H11
    expect_two_byte_marker(stream, ETB).await?;

    Ok(hop)
}

/// The destination a responder decoded out of H7/H8/H10: a hostname and
/// port the relay should open its next-hop connection to.
pub struct RequestedDestination {
    /// Decrypted hostname bytes, as sent by the initiator.
    pub host: Vec<u8>,
    /// Decrypted destination port.
    pub port: u16,
}

/// Run the responder side of the OTP handshake (relay role) over `stream`.
///
/// Every receive step is individually subject to `step_timeout`
/// (OTP §4.2). On success, returns the freshly negotiated hop state and the
/// destination the initiator asked for; the caller (the relay's state
/// machine) is responsible for attempting the next-hop connection and then
/// calling [`send_established`] or [`send_error`] to complete H11.
pub async fn run_responder<S, R>(
    stream: &mut S,
    step_timeout: Duration,
    rng: &mut R,
) -> Result<(HopState, RequestedDestination)>
where
    S: AsyncRead + AsyncWrite + Unpin,
    R: RngCore + CryptoRng,
{
    // H1
    let mut hello = [0u8; 16];
    timed_read_exact(stream, &mut hello, step_timeout).await?;
    if hello != *HELLO {
        send_error(stream, WireError::Protocol).await.ok();
        return Err(Error::Protocol("bad client hello"));
    }
    // H2
    stream.write_all(HELLO).await?;

    // H3
    let mut their_public_bytes = [0u8; 32];
    timed_read_exact(stream, &mut their_public_bytes, step_timeout).await?;
    let their_public = PublicKey::from(their_public_bytes);
    // H4
    let my_secret = StaticSecret::random_from_rng(&mut *rng);
    let my_public = PublicKey::from(&my_secret);
    stream.write_all(my_public.as_bytes()).await?;
    // H5
    let mut iv = [0u8; 16];
    timed_read_exact(stream, &mut iv, step_timeout).await?;

    let shared = my_secret.diffie_hellman(&their_public);
    let key = derive_session_key(shared.as_bytes());
    let mut hop = HopState::new(&key, &iv);
    // H6
    stream.write_all(&ACK).await?;

    // H7: length, plaintext (OTP §9 open question 2).
    let mut len_bytes = [0u8; 2];
    timed_read_exact(stream, &mut len_bytes, step_timeout).await?;
    let len = u16::from_be_bytes(len_bytes) as usize;
    // H8
    let mut host_buf = vec![0u8; len];
    timed_read_exact(stream, &mut host_buf, step_timeout).await?;
    hop.decrypt(&mut host_buf);
    // H9
    stream.write_all(&ACK).await?;

    // H10
    let mut port_buf = [0u8; 2];
    timed_read_exact(stream, &mut port_buf, step_timeout).await?;
    hop.decrypt(&mut port_buf);
    let port = u16::from_be_bytes(port_buf);

    Ok((
        hop,
        RequestedDestination {
            host: host_buf,
            port,
        },
    ))
}

/// Complete H11 with the established marker.
pub async fn send_established<S: AsyncWrite + Unpin>(stream: &mut S) -> Result<()> {
    stream.write_all(&ETB).await?;
    Ok(())
}

/// Complete (or abort) a handshake step with an error byte (OTP §4.1,
/// "Error byte codes"). The caller closes the connection afterward.
pub async fn send_error<S: AsyncWrite + Unpin>(stream: &mut S, err: WireError) -> Result<()> {
    stream.write_all(&[err.to_byte()]).await?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::rngs::OsRng;
    use tokio::io::duplex;

    #[tokio::test]
    async fn initiator_and_responder_agree() {
        let (mut client_side, mut relay_side) = duplex(4096);

        let relay = tokio::spawn(async move {
            let (mut hop, dest) =
                run_responder(&mut relay_side, Duration::from_secs(5), &mut OsRng)
                    .await
                    .unwrap();
            send_established(&mut relay_side).await.unwrap();
            // The relay's encryptor half has not been touched by the
            // handshake (only its decryptor decoded H8/H10), so it is a
            // clean probe for "did both sides derive the same key+iv".
            let mut probe = *b"sanity-check-probe";
            hop.encrypt(&mut probe);
            (probe, dest.host, dest.port)
        });

        let mut client_hop =
            run_initiator(&mut client_side, b"example.onion", 443, &mut OsRng)
                .await
                .unwrap();

        let (mut probe, host, port) = relay.await.unwrap();
        assert_eq!(host, b"example.onion");
        assert_eq!(port, 443);
        // Symmetrically, the client's decryptor half was never touched
        // either (the client only ever called `encrypt` for H8/H10).
        client_hop.decrypt(&mut probe);
        assert_eq!(&probe, b"sanity-check-probe");
    }

    #[tokio::test]
    async fn bad_hello_is_rejected() {
        let (mut client_side, mut relay_side) = duplex(4096);

        let relay = tokio::spawn(async move {
            run_responder(&mut relay_side, Duration::from_secs(5), &mut OsRng).await
        });

        client_side.write_all(b"Hello WRONG/9.9\r\n").await.unwrap();
        let err = relay.await.unwrap().unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));

        let mut reply = [0u8; 1];
        client_side.read_exact(&mut reply).await.unwrap();
        assert_eq!(reply[0], WireError::Protocol.to_byte());
    }

    #[tokio::test]
    async fn timeout_reports_timeout_error() {
        let (client_side, mut relay_side) = duplex(4096);
        // Never send H1.
        let result = run_responder(&mut relay_side, Duration::from_millis(20), &mut OsRng).await;
        assert!(matches!(result, Err(Error::Timeout)));
        drop(client_side);
    }
}
