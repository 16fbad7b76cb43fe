//! A parsed file in the document set.

use std::path::{Path, PathBuf};

use serde_yaml::Value;

use crate::error::IndexError;

/// Serialization format of a source file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Format {
    /// JSON text (first significant character is `{` or `[`).
    Json,
    /// YAML text.
    #[default]
    Yaml,
}

impl Format {
    /// Sniff the format from raw source text.
    #[must_use]
    pub fn detect(source: &str) -> Self {
        match source.trim_start_matches('\u{feff}').trim_start().chars().next() {
            Some('{' | '[') => Self::Json,
            _ => Self::Yaml,
        }
    }
}

/// One file: its identity, parsed tree, and the raw text it came from.
///
/// The raw text is kept so that source positions can be recovered for
/// diagnostics; the tree is the only thing the bundler ever edits (on a copy).
#[derive(Clone, Debug)]
pub struct Document {
    id: PathBuf,
    tree: Value,
    source: String,
    format: Format,
}

impl Document {
    /// Parse `source` as YAML (a superset of JSON).
    ///
    /// # Errors
    /// Returns [`IndexError::Parse`] with the parser's line/column if the text
    /// is not valid YAML.
    pub fn parse(id: PathBuf, source: String) -> Result<Self, IndexError> {
        let tree: Value = serde_yaml::from_str(&source).map_err(|e| {
            let message = match e.location() {
                Some(loc) => format!("line {} column {}: {e}", loc.line(), loc.column()),
                None => e.to_string(),
            };
            IndexError::Parse {
                path: id.clone(),
                message,
            }
        })?;
        let format = Format::detect(&source);
        Ok(Self {
            id,
            tree,
            source,
            format,
        })
    }

    /// The normalized file identity.
    #[must_use]
    pub fn id(&self) -> &Path {
        &self.id
    }

    /// The parsed tree.
    #[must_use]
    pub const fn tree(&self) -> &Value {
        &self.tree
    }

    /// The raw source text.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The detected format.
    #[must_use]
    pub const fn format(&self) -> Format {
        self.format
    }
}
