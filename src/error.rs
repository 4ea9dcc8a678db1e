// Error taxonomy for the induction pipeline.
//
// Corrupt input files, a corpus that shares no vocabulary with the embedding
// table, and plain I/O failures each get their own variant so the binary can
// report them distinctly.

use thiserror::Error;

/// Errors produced by the library stages (loading, tokenizing, fitting, persisting).
#[derive(Debug, Error)]
pub enum InductionError {
    /// A stream could not be opened, read, or written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A header or record could not be parsed.
    #[error("format error: {0}")]
    Format(String),

    /// The input leaves nothing to fit or score, e.g. no vocabulary overlap.
    #[error("degenerate input: {0}")]
    Degenerate(String),

    /// Window sizes must be at least one token.
    #[error("invalid window size {0}: must be at least 1")]
    InvalidWindow(usize),

    /// Two inputs disagree on a dimension.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// A tokenizer worker died before returning its document.
    #[error("tokenizer worker failed: {0}")]
    Worker(String),
}

pub type Result<T> = std::result::Result<T, InductionError>;
