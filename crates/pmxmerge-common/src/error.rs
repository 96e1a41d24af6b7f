//! Error types for pmxmerge-common.

use thiserror::Error;

/// Common error type for binary stream operations.
#[derive(Debug, Error)]
pub enum Error {
    /// End of buffer reached while reading.
    #[error("unexpected end of buffer: needed {needed} bytes but only {available} available")]
    UnexpectedEof { needed: usize, available: usize },

    /// Length prefix that is negative.
    #[error("negative length prefix: {0}")]
    NegativeLength(i32),

    /// Index width byte that is not 1, 2 or 4.
    #[error("invalid index width: {0} (expected 1, 2 or 4)")]
    InvalidIndexWidth(u8),

    /// Text encoding selector that is not 0 (UTF-16LE) or 1 (UTF-8).
    #[error("invalid text encoding selector: {0}")]
    InvalidEncoding(u8),

    /// Index value does not fit the declared width.
    #[error("index {index} does not fit in {width} byte(s)")]
    IndexOutOfRange { index: usize, width: u8 },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error means the input ran out mid-record.
    pub fn is_eof(&self) -> bool {
        matches!(self, Error::UnexpectedEof { .. })
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
