//! Test fixtures for the trunkdec workspace.
//!
//! [`CaptureBuilder`] synthesizes well-formed capture files, including
//! FEC-encoded voice codewords, embedded encryption sync words, and
//! pre-encrypted parameter blocks, so pipeline and service tests can
//! assert on exact frame counts, sample counts, and decrypted audio.

pub mod capture;
pub mod vocoder;

pub use capture::{sample_params, CaptureBuilder};
pub use vocoder::RampVocoder;
