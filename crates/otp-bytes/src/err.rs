//! Internal: declare the error types for otp-bytes

use thiserror::Error;

/// Error type for decoding OTP objects from bytes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// Tried to read more bytes than remained in the buffer.
    #[error("message too short: wanted {wanted} bytes, only {available} remained")]
    Truncated {
        /// Number of bytes the caller asked for.
        wanted: usize,
        /// Number of bytes actually left in the reader.
        available: usize,
    },
    /// Called [`should_be_exhausted`](crate::Reader::should_be_exhausted), but
    /// found bytes anyway.
    #[error("extra bytes at end of message")]
    ExtraneousBytes,
}

/// Error type for encoding OTP objects to bytes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EncodeError {
    /// The value to encode didn't fit in the declared wire width.
    #[error("value {0} does not fit in the destination field")]
    BadLengthValue(usize),
}
