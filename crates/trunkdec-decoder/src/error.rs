//! Error types for the decode pipeline.

use thiserror::Error;
use trunkdec_codec::CodecError;

/// Errors that abort a decode.
///
/// Payload truncation is not here: the pipeline recovers from it by
/// finalizing the artifacts it has.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Container-level failure (mid-header truncation, I/O).
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Artifact output failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The caller's wall-clock deadline passed mid-decode.
    #[error("decode exceeded its deadline")]
    Timeout,
}
