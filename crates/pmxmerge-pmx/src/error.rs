//! Error types for PMX loading, saving and model editing.

use thiserror::Error;

/// Errors that can occur when working with PMX models.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ran out in the middle of a record.
    #[error("corrupted file: {0}")]
    Corrupted(pmxmerge_common::Error),

    /// Common library error.
    #[error("{0}")]
    Common(pmxmerge_common::Error),

    /// Invalid magic bytes.
    #[error("invalid PMX signature: {0:?}")]
    InvalidMagic([u8; 4]),

    /// Version other than 2.0.
    #[error("unsupported PMX version: {0:.1}")]
    UnsupportedVersion(f32),

    /// Malformed header settings.
    #[error("invalid PMX header: {0}")]
    InvalidHeader(String),

    /// Format feature this codec rejects rather than drops.
    #[error("unsupported PMX feature: {0}")]
    Unsupported(String),

    /// Enumerated field holding an unknown value.
    #[error("invalid value {value} for {field}")]
    InvalidValue { field: &'static str, value: i32 },

    /// Record with an empty name.
    #[error("{kind} name must not be empty")]
    EmptyName { kind: &'static str },

    /// Record whose name is already taken.
    #[error("{kind} '{name}' already exists")]
    DuplicateName { kind: &'static str, name: String },

    /// Lookup by name failed.
    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },

    /// Material face ranges do not cover the face list exactly.
    #[error("materials claim {assigned} faces but the file holds {stored}")]
    FaceCountMismatch { assigned: usize, stored: usize },

    /// A face references a vertex the model does not hold.
    #[error("face references vertex {0} which is not part of the model")]
    DanglingVertex(u32),
}

impl From<pmxmerge_common::Error> for Error {
    fn from(err: pmxmerge_common::Error) -> Self {
        if err.is_eof() {
            Error::Corrupted(err)
        } else {
            Error::Common(err)
        }
    }
}

impl Error {
    /// Whether this error was caused by a truncated stream.
    pub fn is_truncation(&self) -> bool {
        matches!(self, Error::Corrupted(_))
    }
}

/// Result type for PMX operations.
pub type Result<T> = std::result::Result<T, Error>;
