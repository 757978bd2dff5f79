//! Declare pool-index specific errors.

use std::net::SocketAddr;

use thiserror::Error;

/// Errors a pool index can encounter while running.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The pool index could not bind its listening socket.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// The address the pool index tried to listen on.
        addr: SocketAddr,
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
