//! Where each lifted component came from.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;

use crate::model::category::Category;

/// Provenance of one lifted component.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentOrigin {
    /// Absolute path of the file the component was lifted from.
    pub original_file: PathBuf,
    /// Fragment inside that file (`#/Pet`, or `#` for a whole file).
    pub original_ref: String,
    /// Name before collision resolution.
    pub original_name: String,
    /// 1-based line of the fragment, 0 when unknown.
    pub line: usize,
    /// 1-based column of the fragment, 0 when unknown.
    pub column: usize,
    /// `true` if the collision resolver changed the name.
    pub was_renamed: bool,
    /// The pointer to the component in the bundled document.
    pub bundled_ref: String,
    /// The component category.
    pub component_type: Category,
}

/// Origins keyed by `bundled_ref`, ordered for stable serialization.
pub type OriginMap = BTreeMap<String, ComponentOrigin>;

/// Collects origins when tracking is enabled, and ignores them otherwise.
#[derive(Debug, Default)]
pub struct OriginTracker {
    enabled: bool,
    origins: OriginMap,
}

impl OriginTracker {
    /// A tracker that records only when `enabled`.
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            origins: OriginMap::new(),
        }
    }

    /// Record `origin` (no-op when disabled).
    pub fn record(&mut self, origin: ComponentOrigin) {
        if self.enabled {
            self.origins.insert(origin.bundled_ref.clone(), origin);
        }
    }

    /// The collected map.
    #[must_use]
    pub fn into_map(self) -> OriginMap {
        self.origins
    }
}
