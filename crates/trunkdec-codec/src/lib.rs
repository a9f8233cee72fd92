//! P25 Phase-1 capture parsing and IMBE codeword handling.
//!
//! This crate covers everything between a raw capture file and the vocoder
//! boundary:
//!
//! - [`framing`] - the capture container (DUID / NAC / length framed data
//!   units) and the [`framing::FrameReader`] iterator over them
//! - [`esw`] - LDU2 encryption sync word recovery (algorithm ID, key ID,
//!   message indicator) from the interleaved link-signaling bits
//! - [`voice`] - per-slot IMBE codeword extraction and header decode into
//!   the eight parameter words the vocoder consumes
//! - [`vocoder`] - the external IMBE synthesis component boundary
//! - [`coding`] - the Hamming and Golay decoders the above are built on
//!
//! Frames are 8 kHz voice; every voice data unit carries nine 144-bit IMBE
//! codewords, each of which synthesizes to 160 signed 16-bit samples.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bits;
pub mod coding;
pub mod esw;
pub mod framing;
pub mod vocoder;
pub mod voice;

mod error;

pub use error::CodecError;
pub use esw::{CryptoAlgorithm, EncryptionSync, ALGID_CLEAR};
pub use framing::{Frame, FrameKind, FrameReader};
pub use vocoder::{NullVocoder, Vocoder, SAMPLES_PER_CODEWORD};
pub use voice::{Codeword, ImbeFrame, CODEWORDS_PER_FRAME, SAMPLES_PER_FRAME};

/// Output sample rate of P25 Phase-1 voice, in hertz.
pub const SAMPLE_RATE: u32 = 8000;
