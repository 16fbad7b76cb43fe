//! Soft conditions observed during a bundle.
//!
//! None of these abort the run. Each is also emitted as a `tracing` event
//! at the point it happens.

use std::path::PathBuf;

use serde::Serialize;

/// A discriminator mapping value that could not be resolved.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnresolvedMapping {
    /// File holding the discriminator.
    pub file: PathBuf,
    /// The discriminator tag.
    pub tag: String,
    /// The raw mapping value.
    pub value: String,
    /// Why it did not resolve.
    pub reason: String,
}

/// A pointer left in place, with the reason.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedPointer {
    /// File the pointer appears in.
    pub file: PathBuf,
    /// The raw pointer.
    pub pointer: String,
}

/// Everything the bundle tolerated instead of failing on.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleReport {
    /// Mapping values left as written.
    pub unresolved_mappings: Vec<UnresolvedMapping>,
    /// Circular pointers the inliner left in place.
    pub circular_skips: Vec<SkippedPointer>,
    /// Branches cut off at the depth limit.
    pub depth_truncations: Vec<SkippedPointer>,
    /// Targets copied inline because their category could not be inferred.
    pub inline_fallbacks: Vec<String>,
}

impl BundleReport {
    /// `true` when nothing was tolerated.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.unresolved_mappings.is_empty()
            && self.circular_skips.is_empty()
            && self.depth_truncations.is_empty()
            && self.inline_fallbacks.is_empty()
    }

    pub(crate) fn unresolved_mapping(&mut self, entry: UnresolvedMapping) {
        if !self.unresolved_mappings.contains(&entry) {
            self.unresolved_mappings.push(entry);
        }
    }

    pub(crate) fn circular_skip(&mut self, entry: SkippedPointer) {
        if !self.circular_skips.contains(&entry) {
            self.circular_skips.push(entry);
        }
    }

    pub(crate) fn depth_truncation(&mut self, entry: SkippedPointer) {
        if !self.depth_truncations.contains(&entry) {
            self.depth_truncations.push(entry);
        }
    }
}
