//! Strict sibling validation.
//!
//! Before OpenAPI 3.1, a `$ref` node replaces its whole object: any sibling
//! keys are silently ignored by consumers. With strict validation enabled,
//! such siblings are rejected up front so authors find out before their
//! descriptions vanish.

use std::fmt;

use serde_yaml::Value;
use stitch_index::{RefOccurrence, Registry};
use tracing::debug;

use crate::error::BundleError;

/// The declared specification version of a root document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SpecVersion {
    /// `swagger: "2.0"`.
    Swagger2(String),
    /// `openapi: 3.0.x`.
    OpenApi30(String),
    /// `openapi: 3.1` or later.
    OpenApi31Plus(String),
    /// No recognizable version field.
    Unknown,
}

impl SpecVersion {
    /// Read the version from a root tree.
    #[must_use]
    pub fn detect(root: &Value) -> Self {
        if let Some(v) = root.get("openapi").and_then(scalar) {
            let mut parts = v.split('.');
            let major = parts.next().and_then(|p| p.trim().parse::<u32>().ok());
            let minor = parts.next().and_then(|p| p.trim().parse::<u32>().ok());
            return match (major, minor) {
                (Some(3), Some(0)) => Self::OpenApi30(v),
                (Some(m), _) if m < 3 => Self::Swagger2(v),
                (Some(_), Some(_)) => Self::OpenApi31Plus(v),
                _ => Self::Unknown,
            };
        }
        if let Some(v) = root.get("swagger").and_then(scalar) {
            return Self::Swagger2(v);
        }
        Self::Unknown
    }

    /// `true` when `$ref` nodes may carry sibling keys.
    #[must_use]
    pub const fn allows_ref_siblings(&self) -> bool {
        matches!(self, Self::OpenApi31Plus(_) | Self::Unknown)
    }
}

impl fmt::Display for SpecVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Swagger2(v) | Self::OpenApi30(v) | Self::OpenApi31Plus(v) => f.write_str(v),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Rejects pointer nodes with siblings when the root's version forbids
/// them. Applied by the walker, so only content the bundle actually reaches
/// is checked.
#[derive(Clone, Debug)]
pub struct SiblingCheck {
    version: SpecVersion,
}

impl SiblingCheck {
    /// The check for `registry`'s root, or `None` when its version allows
    /// siblings.
    #[must_use]
    pub fn for_root(registry: &dyn Registry) -> Option<Self> {
        let root = registry.document(registry.root())?;
        let version = SpecVersion::detect(root.tree());
        if version.allows_ref_siblings() {
            debug!(%version, "sibling check skipped");
            return None;
        }
        Some(Self { version })
    }

    /// # Errors
    /// [`BundleError::StrictValidation`] naming the file, line, and column.
    pub fn check(&self, occ: &RefOccurrence) -> Result<(), BundleError> {
        if !occ.has_siblings() {
            return Ok(());
        }
        Err(BundleError::StrictValidation {
            file: occ.file.clone(),
            position: occ.position,
            pointer: occ.raw.clone(),
            siblings: occ.siblings.clone(),
            version: self.version.to_string(),
        })
    }
}
