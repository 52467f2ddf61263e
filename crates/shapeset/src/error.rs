//! Error types for shape-set operations.
//!
//! User-facing failures (malformed input, missing paths, duplicate borders)
//! are returned as [`ShapeSetError`]. Topology invariant violations are logic
//! faults and panic instead; see the [`topology`](crate::topology) module.

use std::path::PathBuf;

use thiserror::Error;

use crate::ids::{BorderId, ShapeId};

/// Result type alias for shape-set operations.
pub type ShapeSetResult<T> = Result<T, ShapeSetError>;

/// Errors that can occur during shape-set operations.
#[derive(Debug, Error)]
pub enum ShapeSetError {
    /// Error reading from a file.
    #[error("failed to read {path}: {source}")]
    IoRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error writing to a file.
    #[error("failed to write {path}: {source}")]
    IoWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error parsing a value or document.
    #[error("could not parse {context}: {details}")]
    Parse { context: String, details: String },

    /// A mesh entry that does not satisfy the format's constraints.
    #[error("malformed mesh {mesh}: {details}")]
    MalformedMesh { mesh: String, details: String },

    /// A border with this description already exists.
    #[error("border already exists: {desc}")]
    DuplicateBorder { desc: String },

    /// A border with this id already exists.
    #[error("border already exists with id {id}")]
    DuplicateBorderId { id: BorderId },

    /// A path that was expected to be a directory.
    #[error("{path} is not a directory")]
    NotADirectory { path: PathBuf },

    /// A shape id with no entry in the label table.
    #[error("unknown shape id {id}")]
    UnknownShape { id: ShapeId },

    /// An indexed border that fails verification.
    #[error("border verification failed: {details}")]
    BorderMismatch { details: String },
}

impl ShapeSetError {
    pub(crate) fn parse(context: impl Into<String>, details: impl Into<String>) -> Self {
        ShapeSetError::Parse {
            context: context.into(),
            details: details.into(),
        }
    }
}
