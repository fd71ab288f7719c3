//! Error types for the aggregation core.

use thiserror::Error;

/// Errors that abort an aggregation run before any result is produced.
///
/// Row-level data problems (short rows, empty fields, unparseable year or
/// price) are deliberately absent here: noisy rows are dropped during
/// accumulation, never surfaced to the caller.
#[derive(Debug, Error)]
pub enum AggregateError {
    /// The input was empty or yielded no usable header row.
    #[error("input has no header row")]
    NoHeader,

    /// The header is present but lacks a required column.
    #[error("missing required column '{0}' in header")]
    MissingColumn(&'static str),

    /// Failed to open or read the input source.
    #[error("failed to read input")]
    Io(#[from] std::io::Error),
}
