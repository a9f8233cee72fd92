//! Error types for artifact output.

use thiserror::Error;

/// Errors from artifact writing and media conversion.
#[derive(Debug, Error)]
pub enum AudioError {
    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A requested output format this build does not produce.
    #[error("unsupported audio format \"{0}\"")]
    Unsupported(String),

    /// The external media converter failed.
    #[error("media converter exited with {status}: {stderr}")]
    ChildProcessFailed {
        /// Exit status reported by the child.
        status: i32,
        /// Captured standard error, truncated for logging.
        stderr: String,
    },
}
