//! Error types for bahr-core.
//!
//! Only contract violations are errors. A verse that cannot be matched, a
//! partial scansion or an undiacritized input all come back as ordinary
//! results.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the prosody pipeline.
#[derive(Error, Debug)]
pub enum ProsodyError {
    /// Text was empty or whitespace only
    #[error("input text is empty")]
    EmptyInput,

    /// A rhythm string contained something other than '/' or 'o'
    #[error("invalid rhythm symbol {symbol:?} at position {position}")]
    InvalidSymbol { symbol: char, position: usize },

    /// A meter key that is not in the meter table
    #[error("unknown meter: {0}")]
    UnknownMeter(String),

    /// Reading a config or pattern file failed
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed JSON in a config or pattern file
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ProsodyError>;
