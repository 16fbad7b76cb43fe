//! Serialize the bundled tree in the root document's own format.

use serde_yaml::Value;
use stitch_index::Format;

use crate::error::BundleError;

/// Render `tree` as JSON (pretty, trailing newline) or YAML.
///
/// Key order is the tree's insertion order, so root entries come out where
/// they were written and lifted components follow them.
///
/// # Errors
/// [`BundleError::Render`] if the tree holds something the target format
/// cannot express (e.g. a non-scalar mapping key in JSON).
pub fn render(tree: &Value, format: Format) -> Result<Vec<u8>, BundleError> {
    match format {
        Format::Json => {
            let mut bytes = serde_json::to_vec_pretty(tree).map_err(|e| BundleError::Render {
                message: e.to_string(),
            })?;
            bytes.push(b'\n');
            Ok(bytes)
        }
        Format::Yaml => serde_yaml::to_string(tree)
            .map(String::into_bytes)
            .map_err(|e| BundleError::Render {
                message: e.to_string(),
            }),
    }
}
