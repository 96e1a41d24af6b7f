//! Error types for merging.

use std::path::PathBuf;

use thiserror::Error;

use crate::validate::{Role, ValidationReport};

/// Errors that can occur while merging models.
#[derive(Debug, Error)]
pub enum Error {
    /// Model error.
    #[error("{0}")]
    Pmx(#[from] pmxmerge_pmx::Error),

    /// One or both inputs hold empty or duplicate names.
    #[error("{0}")]
    Validation(ValidationReport),

    /// Missing or conflicting paths.
    #[error("invalid merge request: {0}")]
    InvalidRequest(String),

    /// An input file could not be loaded.
    #[error("failed to load {role} model '{}': {source}", .path.display())]
    Load {
        role: Role,
        path: PathBuf,
        source: pmxmerge_pmx::Error,
    },

    /// The merged model could not be written.
    #[error("failed to save merged model to '{}': {source}", .path.display())]
    Save {
        path: PathBuf,
        source: pmxmerge_pmx::Error,
    },
}

/// Result type for merge operations.
pub type Result<T> = std::result::Result<T, Error>;
