//! Ciphers used to implement the onion transport protocol.
//!
//! OTP has just one cipher: AES-256 in counter mode (OTP §4.1, "Key
//! derivation"). There is no AEAD: see OTP §9 open question 1 for why.

/// Re-exports of counter-mode AES.
///
/// This type implements the `cipher::StreamCipher` trait, so use the
/// [`cipher`](https://docs.rs/cipher) crate to drive it.
pub mod aes {
    /// AES-256 in counter mode, with a 128-bit big-endian counter, as used
    /// for every HopState half (encryptor and decryptor alike).
    pub type Aes256Ctr = ctr::Ctr128BE<aes::Aes256>;
}
