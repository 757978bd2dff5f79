//! Public-key cryptography used by the onion transport protocol.
//!
//! OTP's handshake (§4.1, steps H3/H4) negotiates a shared secret with raw
//! X25519, the same primitive Tor's ntor handshake is built on.

/// Re-exporting Curve25519 implementations.
///
/// Eventually we might want to recommend using this code via some
/// key-agreement trait, but for now we just re-use the APIs from
/// [`x25519_dalek`].
pub mod curve25519 {
    /// A curve25519 secret key that can be used more than once, and whose
    /// value can be inspected.
    ///
    /// See [`x25519_dalek::StaticSecret`] for more information.
    #[derive(Clone)]
    pub struct StaticSecret(x25519_dalek::StaticSecret);

    /// A curve25519 public key.
    ///
    /// See [`x25519_dalek::PublicKey`] for more information.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct PublicKey(x25519_dalek::PublicKey);

    /// A shared secret negotiated using curve25519.
    ///
    /// See [`x25519_dalek::SharedSecret`] for more information.
    pub struct SharedSecret(x25519_dalek::SharedSecret);

    impl<'a> From<&'a StaticSecret> for PublicKey {
        fn from(secret: &'a StaticSecret) -> Self {
            Self((&secret.0).into())
        }
    }

    impl From<[u8; 32]> for PublicKey {
        fn from(value: [u8; 32]) -> Self {
            Self(value.into())
        }
    }

    impl StaticSecret {
        /// Return a new random secret key, drawn from a cryptographically
        /// strong source (OTP §9, "Randomness").
        pub fn random_from_rng<R: rand_core::RngCore + rand_core::CryptoRng>(csprng: R) -> Self {
            Self(x25519_dalek::StaticSecret::random_from_rng(csprng))
        }

        /// Negotiate a shared secret using this secret key and a public key.
        pub fn diffie_hellman(&self, their_public: &PublicKey) -> SharedSecret {
            SharedSecret(self.0.diffie_hellman(&their_public.0))
        }
    }

    impl SharedSecret {
        /// Return the shared secret as an array of bytes.
        pub fn as_bytes(&self) -> &[u8; 32] {
            self.0.as_bytes()
        }
    }

    impl PublicKey {
        /// Return this public key as a reference to an array of bytes: the
        /// wire encoding used for OTP steps H3/H4.
        pub fn as_bytes(&self) -> &[u8; 32] {
            self.0.as_bytes()
        }

        /// Return this public key as an array of bytes.
        pub fn to_bytes(&self) -> [u8; 32] {
            self.0.to_bytes()
        }
    }
}
