//! Bundler configuration (`stitch.toml`).
//!
//! Defines the typed configuration for a bundle run: where the root document
//! lives, how collisions are renamed, and how deep traversal may go.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::BundleError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level bundler configuration.
///
/// Parsed from `stitch.toml`. Missing fields use defaults.
/// Missing file → all defaults (no error).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct BundleConfig {
    /// Where the root document lives.
    #[serde(default)]
    pub source: SourceConfig,

    /// Compose-mode settings.
    #[serde(default)]
    pub composition: BundleCompositionConfig,

    /// Traversal limits.
    #[serde(default)]
    pub limits: LimitsConfig,
}

impl BundleConfig {
    /// Validate every section. Called before any traversal.
    ///
    /// # Errors
    /// Returns [`BundleError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> Result<(), BundleError> {
        self.composition.validate()?;
        self.limits.validate()
    }
}

// ---------------------------------------------------------------------------
// SourceConfig
// ---------------------------------------------------------------------------

/// Identity of the root document.
///
/// Relative pointers in the root resolve against `base_dir`. The root bytes
/// are always supplied by the caller; `spec_file` only names them.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    /// Directory the root document lives in (default: current directory).
    #[serde(default)]
    pub base_dir: Option<PathBuf>,

    /// File name of the root document inside `base_dir` (default: `"openapi.yaml"`).
    #[serde(default = "default_spec_file")]
    pub spec_file: PathBuf,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_dir: None,
            spec_file: default_spec_file(),
        }
    }
}

fn default_spec_file() -> PathBuf {
    PathBuf::from("openapi.yaml")
}

impl SourceConfig {
    /// Absolute identity of the root document.
    #[must_use]
    pub fn root_identity(&self) -> PathBuf {
        let base = self.base_dir.clone().unwrap_or_else(|| PathBuf::from("."));
        let joined = base.join(&self.spec_file);
        std::path::absolute(&joined).unwrap_or(joined)
    }
}

// ---------------------------------------------------------------------------
// BundleCompositionConfig
// ---------------------------------------------------------------------------

/// Compose-mode settings.
///
/// ```toml
/// [composition]
/// delimiter = "__"
/// strict_validation = false
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BundleCompositionConfig {
    /// Separator placed between a colliding name and its suffix (default `"__"`).
    #[serde(default = "default_delimiter")]
    pub delimiter: String,

    /// Reject pointer nodes with sibling keys in documents older than 3.1.
    #[serde(default)]
    pub strict_validation: bool,
}

impl Default for BundleCompositionConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            strict_validation: false,
        }
    }
}

fn default_delimiter() -> String {
    "__".to_owned()
}

impl BundleCompositionConfig {
    /// Reject delimiters that would corrupt pointers or names.
    ///
    /// # Errors
    /// Returns [`BundleError::InvalidConfig`] if the delimiter is empty or
    /// contains `#`, `/`, or whitespace.
    pub fn validate(&self) -> Result<(), BundleError> {
        let reason = if self.delimiter.is_empty() {
            Some("must not be empty".to_owned())
        } else if let Some(c) = self
            .delimiter
            .chars()
            .find(|c| *c == '#' || *c == '/' || c.is_whitespace())
        {
            Some(format!("must not contain {c:?}"))
        } else {
            None
        };
        match reason {
            Some(reason) => Err(BundleError::InvalidConfig {
                field: "composition.delimiter",
                reason,
            }),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// LimitsConfig
// ---------------------------------------------------------------------------

/// Traversal limits.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LimitsConfig {
    /// Maximum pointer-following depth for the walker and the inliner.
    /// Exceeding it truncates that branch only.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
        }
    }
}

const fn default_max_depth() -> usize {
    1000
}

impl LimitsConfig {
    fn validate(&self) -> Result<(), BundleError> {
        if self.max_depth == 0 {
            return Err(BundleError::InvalidConfig {
                field: "limits.max_depth",
                reason: "must be at least 1".to_owned(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Why `stitch.toml` could not be used.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file exists but reading it failed.
    #[error("cannot read bundler config {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed TOML, a wrongly typed value, or an unknown key.
    #[error("bundler config {}: {message}", origin(path.as_deref(), *line))]
    Invalid {
        /// The file, when the text came from one.
        path: Option<PathBuf>,
        /// 1-based line of the offending key or value.
        line: Option<usize>,
        message: String,
    },
}

fn origin(path: Option<&Path>, line: Option<usize>) -> String {
    let name = path.map_or_else(|| "<inline>".to_owned(), |p| p.display().to_string());
    match line {
        Some(line) => format!("{name} line {line}"),
        None => name,
    }
}

impl BundleConfig {
    /// Read `stitch.toml` from `path`. An absent file means defaults.
    ///
    /// # Errors
    /// [`ConfigError::Read`] for I/O failures other than not-found,
    /// [`ConfigError::Invalid`] (carrying `path`) when parsing fails.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no bundler config; using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_owned(),
                    source,
                });
            }
        };
        Self::parse(&text).map_err(|e| match e {
            ConfigError::Invalid { line, message, .. } => ConfigError::Invalid {
                path: Some(path.to_owned()),
                line,
                message,
            },
            other => other,
        })
    }

    /// Parse `stitch.toml` text.
    ///
    /// # Errors
    /// [`ConfigError::Invalid`] with the line of the first problem.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e: toml::de::Error| ConfigError::Invalid {
            path: None,
            line: e.span().map(|span| line_of(text, span.start)),
            message: e.message().to_owned(),
        })
    }
}

fn line_of(text: &str, offset: usize) -> usize {
    text.as_bytes()[..offset.min(text.len())]
        .iter()
        .filter(|&&b| b == b'\n')
        .count()
        + 1
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
