//! Error types for index operations.
//!
//! [`IndexError`] is the single error type returned by [`Registry`](crate::Registry)
//! lookups and by [`DocumentSet::load`](crate::DocumentSet::load). Variants carry
//! the offending pointer or path so callers can report the fault without
//! parsing messages.

use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by loading and lookup operations.
#[derive(Debug, Error)]
pub enum IndexError {
    /// A file could not be parsed as YAML or JSON.
    #[error("failed to parse {}: {message}", path.display())]
    Parse {
        /// The file that failed to parse.
        path: PathBuf,
        /// Parser message, including line/column when the parser reports one.
        message: String,
    },

    /// A file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// The file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A pointer names a file that is not part of the document set.
    #[error("file not found: {}", path.display())]
    FileNotFound {
        /// The normalized path that was looked up.
        path: PathBuf,
    },

    /// A pointer names a file that was discovered but failed to load.
    #[error("file {} is unavailable: {reason}", path.display())]
    FileUnavailable {
        /// The normalized path that failed to load.
        path: PathBuf,
        /// Why loading failed.
        reason: String,
    },

    /// The pointer's file exists but its fragment does not.
    #[error("`{pointer}` not found in {}", file.display())]
    FragmentNotFound {
        /// The raw pointer that was being resolved.
        pointer: String,
        /// The file that was searched.
        file: PathBuf,
    },

    /// Absolute URLs and URNs are never fetched.
    #[error("`{pointer}` is an external URL or URN and cannot be resolved locally")]
    External {
        /// The raw pointer.
        pointer: String,
    },
}
