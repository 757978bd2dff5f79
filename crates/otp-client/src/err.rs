//! Client-side errors: client preconditions, address errors, and the
//! handshake/route-phase errors a circuit can surface (OTP §7).

use thiserror::Error;

pub use crate::address::DestinationError;

/// Errors returned by [`crate::Client`] and [`crate::Circuit`].
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// `random_path_to_destination` was asked for more hops than the
    /// relay list currently holds (OTP §4.3, §7 "Client-side preconditions").
    /// Surfaced before any network I/O happens.
    #[error("insufficient relays: need {wanted}, have {available}")]
    InsufficientRelays {
        /// How many distinct relays were requested.
        wanted: usize,
        /// How many relays the client's relay list currently holds.
        available: usize,
    },
    /// A supplied destination or relay address could not be parsed.
    #[error("invalid destination: {0}")]
    InvalidDestination(#[from] DestinationError),
    /// The OTP handshake or route-phase I/O failed.
    #[error("circuit error: {0}")]
    Otp(#[from] otp_proto::Error),
    /// The underlying relay-list sync connection failed.
    #[error("could not sync relay list from {addr}: {source}")]
    Sync {
        /// The pool index address that was contacted.
        addr: std::net::SocketAddr,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// `send`/`receive`/`receive_exactly` was called with no circuit open.
    #[error("no circuit is open")]
    NoCircuit,
}

/// Result type used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;
