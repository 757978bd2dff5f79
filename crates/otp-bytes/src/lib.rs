//! Helpers for encoding and decoding the fixed big-endian wire formats used
//! by the onion transport protocol (OTP) and by the pool index.
//!
//! Every multi-byte integer on the wire is big-endian (see OTP §4.1). This
//! crate supplies a small [`Writer`] trait for building up outbound buffers
//! and a [`Reader`] for pulling fields back out of an in-memory buffer, in
//! the same spirit as a conventional Tor cell parser but scaled down to the
//! handful of fixed-width fields OTP actually needs.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::missing_docs_in_private_items)]

mod err;
mod reader;
mod writer;

pub use err::{EncodeError, Error};
pub use reader::Reader;
pub use writer::Writer;

/// Result type returned by this crate for [`Reader`]-related methods.
pub type Result<T> = std::result::Result<T, Error>;
/// Result type returned by this crate for [`Writer`]-related methods.
pub type EncodeResult<T> = std::result::Result<T, EncodeError>;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn writer_round_trip() {
        let mut v: Vec<u8> = Vec::new();
        v.write_u8(0x57);
        v.write_u16(0x6520);
        v.write_all(b"lcome");
        assert_eq!(&v[..], &b"W\x65\x20lcome"[..]);

        let mut r = Reader::from_slice(&v);
        assert_eq!(r.take_u8().unwrap(), 0x57);
        assert_eq!(r.take_u16().unwrap(), 0x6520);
        assert_eq!(r.take(5).unwrap(), b"lcome");
        r.should_be_exhausted().unwrap();
    }
}
