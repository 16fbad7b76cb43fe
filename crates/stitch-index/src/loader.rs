//! File loaders.
//!
//! The [`Loader`] trait is the only way the index touches storage. Fetching
//! is the loader's concern; the bundler never performs I/O of its own.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::IndexError;
use crate::pointer::normalize_path;

/// Reads the raw text of a file by normalized path.
pub trait Loader {
    /// Load the file at `path`.
    ///
    /// # Errors
    /// Returns [`IndexError::Io`] or [`IndexError::FileNotFound`] when the
    /// file cannot be produced.
    fn load(&self, path: &Path) -> Result<String, IndexError>;
}

/// Reads files from the local filesystem.
#[derive(Clone, Copy, Debug, Default)]
pub struct FsLoader;

impl Loader for FsLoader {
    fn load(&self, path: &Path) -> Result<String, IndexError> {
        std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                IndexError::FileNotFound {
                    path: path.to_owned(),
                }
            } else {
                IndexError::Io {
                    path: path.to_owned(),
                    source,
                }
            }
        })
    }
}

/// Serves files from an in-memory map keyed by normalized path.
#[derive(Clone, Debug, Default)]
pub struct MemoryLoader {
    files: HashMap<PathBuf, String>,
}

impl MemoryLoader {
    /// An empty loader.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a file.
    #[must_use]
    pub fn with_file(mut self, path: impl AsRef<Path>, contents: impl Into<String>) -> Self {
        self.insert(path, contents);
        self
    }

    /// Add (or replace) a file in place.
    pub fn insert(&mut self, path: impl AsRef<Path>, contents: impl Into<String>) {
        self.files
            .insert(normalize_path(path.as_ref()), contents.into());
    }
}

impl Loader for MemoryLoader {
    fn load(&self, path: &Path) -> Result<String, IndexError> {
        self.files
            .get(&normalize_path(path))
            .cloned()
            .ok_or_else(|| IndexError::FileNotFound {
                path: path.to_owned(),
            })
    }
}
