//! The onion transport protocol (OTP): handshake, per-hop cipher state, and
//! the client-side layered cipher stack.
//!
//! This crate implements the protocol itself, independent of who is running
//! it: the relay uses [`handshake::run_responder`] on each accepted
//! connection, and the client uses [`handshake::run_initiator`], tunneling
//! later hops' handshakes through [`tunnel::TunnelStream`] wrapped around the
//! already-established part of the circuit.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod err;
mod handshake;
mod hop;
mod stack;
mod tunnel;

pub use err::{classify_error_byte, Error, Result, WireError};
pub use handshake::{
    run_initiator, run_responder, send_error, send_established, RequestedDestination, ACK, ETB,
    HELLO,
};
pub use hop::{Decryptor, Encryptor, HopState};
pub use stack::CircuitCrypto;
pub use tunnel::TunnelStream;
