//! Error types for the onion transport protocol.

use thiserror::Error;

/// A single-byte error code sent in the clear in place of an expected
/// handshake response (OTP §4.1, §7).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireError {
    /// A receive step did not complete before the configured deadline.
    #[error("timeout waiting for the next handshake step")]
    Timeout,
    /// The peer's message did not match the protocol (bad hello, bad ACK,
    /// malformed marker).
    #[error("protocol error")]
    Protocol,
    /// The relay could not open a connection to the next hop.
    #[error("could not connect to destination")]
    DestinationConnection,
}

impl WireError {
    /// The byte written on the wire for this error (OTP §4.1 "Error byte codes").
    pub fn to_byte(self) -> u8 {
        match self {
            WireError::Timeout => 0x00,
            WireError::Protocol => 0x01,
            WireError::DestinationConnection => 0x02,
        }
    }

    /// Recognize one of the three defined error bytes.
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x00 => Some(WireError::Timeout),
            0x01 => Some(WireError::Protocol),
            0x02 => Some(WireError::DestinationConnection),
            _ => None,
        }
    }
}

/// Classify a byte received where an error code was expected.
///
/// Any value outside the three defined codes is still reported to the
/// caller, as `UNSPECIFIED` (OTP §4.3, "Error propagation on receive").
pub fn classify_error_byte(b: u8) -> Error {
    match WireError::from_byte(b) {
        Some(code) => Error::PeerReported(code),
        None => Error::PeerReportedUnspecified(b),
    }
}

/// Errors that can occur while running the OTP handshake or routing phase.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The underlying transport failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A receive step did not complete before the deadline.
    #[error("handshake timed out")]
    Timeout,
    /// The peer sent something that does not fit the protocol.
    #[error("protocol violation: {0}")]
    Protocol(&'static str),
    /// The peer sent one of the three defined error codes.
    #[error("peer reported an error: {0}")]
    PeerReported(WireError),
    /// The peer sent an error byte this implementation does not recognize.
    #[error("peer reported an unrecognised error byte 0x{0:02x}")]
    PeerReportedUnspecified(u8),
    /// The relay could not reach the next hop.
    #[error("could not connect to the next hop: {0}")]
    DestinationConnection(std::io::Error),
}

/// Result type used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;
