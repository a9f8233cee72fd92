//! P25 Phase-1 voice decryption.
//!
//! Three keystream engines share one interface: DES-OFB, AES-256-OFB, and
//! ADP (RC4). An engine is prepared once per encryption sync word (the
//! message indicator usually changes every superframe) and then XORs each
//! 11-octet packed IMBE codeword against a slice of its keystream buffer.
//! The slice offset depends on the cipher, the frame kind (LDU1 vs LDU2),
//! and the engine's 9-step position cursor.
//!
//! Engines are single-call stateful and owned by one decoder; the shared
//! [`KeyTable`] is the only cross-worker structure and is read-only while
//! workers run.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod adp;
pub mod aes;
pub mod des;
pub mod engine;
pub mod keys;

mod error;

pub use adp::AdpRc4;
pub use aes::Aes256Ofb;
pub use des::DesOfb;
pub use engine::{KeystreamEngine, CODEWORD_OCTETS, LDU2_KEYSTREAM_SKIP};
pub use error::CryptoError;
pub use keys::{CipherFamily, KeyTable};
