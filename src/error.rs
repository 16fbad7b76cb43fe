//! Bundle error types.
//!
//! [`BundleError`] is the single error type returned by every bundling entry
//! point. Each hard failure of the pipeline has its own variant carrying the
//! offending pointer, file, and (where recoverable) line/column, so callers
//! can locate the fault without parsing the message.
//!
//! Soft conditions (depth-limit truncation, circular pointers during inline
//! bundling, unresolvable discriminator mapping values, inline fallback for
//! unclassifiable fragments) are never errors. They are logged through
//! `tracing` and listed in the [`BundleReport`](crate::model::report::BundleReport).

use std::path::PathBuf;

use stitch_index::{IndexError, Position};
use thiserror::Error;

use crate::config::ConfigError;
use crate::model::category::Category;

/// Errors that abort a bundle. No partial output is ever produced.
#[derive(Debug, Error)]
pub enum BundleError {
    /// A configuration value is invalid. Raised before any traversal.
    #[error("invalid configuration `{field}`: {reason}")]
    InvalidConfig {
        /// The offending field (e.g. `"composition.delimiter"`).
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// A configuration file could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The input bytes are empty or not UTF-8, or the root has no room for
    /// lifted components.
    #[error("invalid input document: {reason}")]
    InvalidInput {
        /// What was wrong with the input.
        reason: String,
    },

    /// A pointer node carries sibling keys the document's version forbids.
    #[error(
        "{}{}: `$ref: {pointer}` has sibling keys [{}], which OpenAPI {version} does not allow",
        file.display(),
        at(position.as_ref()),
        siblings.join(", ")
    )]
    StrictValidation {
        /// The file containing the pointer node.
        file: PathBuf,
        /// Position of the `$ref` key.
        position: Option<Position>,
        /// The raw pointer.
        pointer: String,
        /// The illegal sibling keys.
        siblings: Vec<String>,
        /// The declared specification version.
        version: String,
    },

    /// A structural pointer names a file or fragment that does not exist.
    #[error("unresolved reference `{pointer}` in {}{}: {source}", file.display(), at(position.as_ref()))]
    UnresolvedReference {
        /// The raw pointer.
        pointer: String,
        /// The file the pointer appears in.
        file: PathBuf,
        /// Position of the `$ref` key.
        position: Option<Position>,
        /// Why resolution failed.
        #[source]
        source: IndexError,
    },

    /// A fragment could not be turned into a component of its category.
    #[error("cannot build {category} component from `{pointer}` in {}: {reason}", file.display())]
    Construction {
        /// The fully-qualified target.
        pointer: String,
        /// The file that owns the fragment.
        file: PathBuf,
        /// The category it was being built as.
        category: Category,
        /// What was wrong with it.
        reason: String,
    },

    /// The caller's cancellation token fired or its deadline passed.
    #[error("bundling cancelled")]
    Cancelled,

    /// The bundled tree could not be serialized.
    #[error("failed to render bundle: {message}")]
    Render {
        /// Serializer message.
        message: String,
    },

    /// A lookup-layer failure (root parse error, unreadable root, ...).
    #[error(transparent)]
    Index(#[from] IndexError),
}

impl BundleError {
    /// Source position attached to the error, if any.
    #[must_use]
    pub const fn position(&self) -> Option<Position> {
        match self {
            Self::StrictValidation { position, .. } | Self::UnresolvedReference { position, .. } => {
                *position
            }
            _ => None,
        }
    }
}

fn at(position: Option<&Position>) -> String {
    position.map_or_else(String::new, |p| format!(":{p}"))
}
