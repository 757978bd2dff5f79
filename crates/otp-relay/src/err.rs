//! Declare relay-specific errors.

use thiserror::Error;

/// Errors a relay can encounter while running.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The relay could not bind its listening socket.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// The address the relay tried to listen on.
        addr: std::net::SocketAddr,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The accept loop failed irrecoverably.
    #[error("accept loop failed: {0}")]
    Accept(#[from] std::io::Error),
}

/// Result type used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;
