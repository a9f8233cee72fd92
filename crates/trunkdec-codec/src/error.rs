//! Error types for capture parsing.

use thiserror::Error;

/// Errors produced while reading a capture container.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The capture ended inside a 5-octet frame header.
    #[error("capture ended mid-header ({got} of 5 octets)")]
    TruncatedHeader {
        /// Octets of the header that were present.
        got: usize,
    },

    /// A frame declared more payload than the capture holds.
    #[error("truncated payload (declared {declared}, got {got})")]
    TruncatedPayload {
        /// Octets the frame header declared.
        declared: usize,
        /// Octets actually present.
        got: usize,
    },

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
