//! The per-capture decode pipeline.
//!
//! A [`Decoder`] owns its vocoder and cipher engines for its lifetime and
//! serves one capture at a time; reuse across captures reopens the input
//! and resets the vocoder rather than reallocating either. Workers in the
//! ingestion service hold exactly one decoder each, which is why none of
//! this is `Sync`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod dump;
pub mod pipeline;

mod error;

pub use error::DecodeError;
pub use pipeline::{CallSummary, Decoder};
