//! Error types for key management and keystream preparation.

use thiserror::Error;

/// Errors from the key table and keystream engines.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// No key material registered under the requested key ID.
    #[error("unknown key id 0x{key_id:04X}")]
    UnknownKey {
        /// The key ID named by the encryption sync word.
        key_id: u16,
    },

    /// Key material length matches no cipher family.
    #[error("key length {len} selects no cipher (expected 5, 8, or 32 octets)")]
    InvalidKeyLength {
        /// Octets of key material supplied.
        len: usize,
    },
}
