//! Types and traits for converting values into a [`Destination`] a circuit
//! can be built to (OTP §4.3, `random_path_to_destination`).
//!
//! Mirrors `arti-client`'s `TorAddr`/`IntoTorAddr` split: plain hostnames
//! convert safely, but IP addresses are only reachable through
//! [`DangerouslyIntoDestination`], since getting an IP address usually means
//! a local DNS lookup already happened and leaked the target to whoever
//! resolved it.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};
use std::str::FromStr;

use thiserror::Error;

/// An object that can be converted to a [`Destination`] with a minimum of
/// risk: typically a hostname and a port.
///
/// Don't implement this for IP addresses; implement
/// [`DangerouslyIntoDestination`] instead.
pub trait IntoDestination {
    /// Try to make a [`Destination`] from `self`.
    fn into_destination(self) -> Result<Destination, DestinationError>;
}

/// An object that can be converted to a [`Destination`], but which it might
/// be risky to have obtained in the first place (e.g. from a local DNS
/// lookup) if the point was to keep the target hidden from intermediate
/// hops other than the last.
pub trait DangerouslyIntoDestination {
    /// Try to make a [`Destination`] from `self`, asserting that `self` was
    /// obtained safely.
    fn into_destination_dangerously(self) -> Result<Destination, DestinationError>;
}

/// A host and port a client can build a circuit to (OTP §4.3).
///
/// Everything after the last hop's handshake treats this as opaque bytes:
/// the hostname is sent encrypted in H8, the port encrypted in H10 (OTP
/// §4.1).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Destination {
    host: String,
    port: u16,
}

impl Destination {
    /// The hostname or textual IP address this destination names.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The destination port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Hostname bytes, as sent in H8.
    pub(crate) fn host_bytes(&self) -> &[u8] {
        self.host.as_bytes()
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// An error produced when constructing a [`Destination`].
#[derive(Error, Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum DestinationError {
    /// The hostname was empty, too long, or had invalid characters.
    #[error("invalid hostname")]
    InvalidHostname,
    /// A combined `host:port` string didn't split into exactly two parts.
    #[error("could not parse address and port")]
    BadFormat,
}

/// The longest hostname OTP's H7 length prefix can carry (it's a `u16`).
const MAX_HOSTNAME_LEN: usize = u16::MAX as usize;

fn validate_hostname(host: &str) -> Result<(), DestinationError> {
    if host.is_empty() || host.len() > MAX_HOSTNAME_LEN {
        return Err(DestinationError::InvalidHostname);
    }
    if host.parse::<IpAddr>().is_ok() || hostname_validator::is_valid(host) {
        Ok(())
    } else {
        Err(DestinationError::InvalidHostname)
    }
}

impl IntoDestination for Destination {
    fn into_destination(self) -> Result<Destination, DestinationError> {
        Ok(self)
    }
}

impl IntoDestination for (&str, u16) {
    fn into_destination(self) -> Result<Destination, DestinationError> {
        validate_hostname(self.0)?;
        Ok(Destination {
            host: self.0.to_owned(),
            port: self.1,
        })
    }
}

impl IntoDestination for (String, u16) {
    fn into_destination(self) -> Result<Destination, DestinationError> {
        (self.0.as_str(), self.1).into_destination()
    }
}

impl IntoDestination for &str {
    fn into_destination(self) -> Result<Destination, DestinationError> {
        let (host, port) = self.rsplit_once(':').ok_or(DestinationError::BadFormat)?;
        let port: u16 = port.parse().map_err(|_| DestinationError::BadFormat)?;
        (host, port).into_destination()
    }
}

impl IntoDestination for String {
    fn into_destination(self) -> Result<Destination, DestinationError> {
        self.as_str().into_destination()
    }
}

impl<A: IntoDestination + Clone> IntoDestination for &A {
    fn into_destination(self) -> Result<Destination, DestinationError> {
        self.clone().into_destination()
    }
}

impl<T: DangerouslyIntoDestination + Clone> DangerouslyIntoDestination for &T {
    fn into_destination_dangerously(self) -> Result<Destination, DestinationError> {
        self.clone().into_destination_dangerously()
    }
}

impl DangerouslyIntoDestination for (IpAddr, u16) {
    fn into_destination_dangerously(self) -> Result<Destination, DestinationError> {
        Ok(Destination {
            host: self.0.to_string(),
            port: self.1,
        })
    }
}

impl DangerouslyIntoDestination for (Ipv4Addr, u16) {
    fn into_destination_dangerously(self) -> Result<Destination, DestinationError> {
        (IpAddr::V4(self.0), self.1).into_destination_dangerously()
    }
}

impl DangerouslyIntoDestination for (Ipv6Addr, u16) {
    fn into_destination_dangerously(self) -> Result<Destination, DestinationError> {
        (IpAddr::V6(self.0), self.1).into_destination_dangerously()
    }
}

impl DangerouslyIntoDestination for SocketAddr {
    fn into_destination_dangerously(self) -> Result<Destination, DestinationError> {
        (self.ip(), self.port()).into_destination_dangerously()
    }
}

impl DangerouslyIntoDestination for SocketAddrV4 {
    fn into_destination_dangerously(self) -> Result<Destination, DestinationError> {
        SocketAddr::V4(self).into_destination_dangerously()
    }
}

impl DangerouslyIntoDestination for SocketAddrV6 {
    fn into_destination_dangerously(self) -> Result<Destination, DestinationError> {
        SocketAddr::V6(self).into_destination_dangerously()
    }
}

impl FromStr for Destination {
    type Err = DestinationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.into_destination()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn hostname_and_port_pair() {
        let dest = ("example.onion", 443).into_destination().unwrap();
        assert_eq!(dest.host(), "example.onion");
        assert_eq!(dest.port(), 443);
    }

    #[test]
    fn combined_string_splits_on_last_colon() {
        let dest = "example.com:80".into_destination().unwrap();
        assert_eq!(dest.host(), "example.com");
        assert_eq!(dest.port(), 80);
    }

    #[test]
    fn empty_hostname_is_rejected() {
        assert_eq!(
            ("", 80).into_destination().unwrap_err(),
            DestinationError::InvalidHostname
        );
    }

    #[test]
    fn ip_address_requires_dangerous_conversion() {
        let dest = SocketAddr::from(([127, 0, 0, 1], 9000))
            .into_destination_dangerously()
            .unwrap();
        assert_eq!(dest.host(), "127.0.0.1");
        assert_eq!(dest.port(), 9000);
    }
}
