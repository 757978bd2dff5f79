#![warn(missing_docs)]
#![warn(clippy::all)]
//! Client library for building circuits and streaming data over the onion
//! transport protocol.
//!
//! A [`Client`] syncs a [`RelayList`] from a pool index, picks a path
//! through it, and builds a [`Circuit`] one hop at a time: a direct
//! connection to the first hop, then further hops tunneled through the
//! cipher stack established so far.

mod address;
mod circuit;
mod client;
mod err;
mod relaylist;

pub use address::{DangerouslyIntoDestination, Destination, DestinationError, IntoDestination};
pub use circuit::Circuit;
pub use client::Client;
pub use err::{Error, Result};
pub use relaylist::{RelayList, RelayRecord};
