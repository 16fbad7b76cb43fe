//! Reference walker: discovers every external target reachable from the
//! root and records it in the [`CompositionTable`].
//!
//! The walk is a breadth-first work queue. Each item is a subtree (a file
//! plus a token prefix) whose pointer occurrences still need following.
//! Starting from the whole root document, every structural pointer is
//! resolved; targets in other files get a record and their own subtree is
//! queued one hop deeper. Targets inside the root are left alone, since the
//! root is walked in full anyway.
//!
//! A target is visited once no matter how many pointers reach it, so cycles
//! terminate. Circular targets are still walked; their records carry the
//! flag for the inliner.

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};

use stitch_index::pointer::is_external;
use stitch_index::{Registry, TargetKey};
use tracing::{debug, instrument, trace, warn};

use crate::bundle::resolve::resolve;
use crate::bundle::validate::SiblingCheck;
use crate::cancel::CancellationToken;
use crate::error::BundleError;
use crate::model::record::{CompositionTable, DiscoveredVia, PendingCompositionRecord};
use crate::model::report::{BundleReport, SkippedPointer};

/// A subtree waiting to be walked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkItem {
    /// File holding the subtree.
    pub file: PathBuf,
    /// Unescaped token prefix of the subtree (empty for the whole file).
    pub scope: Vec<String>,
    /// Pointer hops from the root.
    pub depth: usize,
}

impl WorkItem {
    /// The whole of `file` at depth 0.
    #[must_use]
    pub fn whole_file(file: &Path) -> Self {
        Self {
            file: file.to_owned(),
            scope: Vec::new(),
            depth: 0,
        }
    }

    /// The subtree at `key`, `depth` hops from the root.
    #[must_use]
    pub fn target(key: &TargetKey, depth: usize) -> Self {
        Self {
            file: key.file().to_owned(),
            scope: key.tokens(),
            depth,
        }
    }
}

/// Walks pointer occurrences breadth-first, filling a [`CompositionTable`].
pub struct Walker<'a> {
    registry: &'a dyn Registry,
    cancel: &'a CancellationToken,
    max_depth: usize,
    siblings: Option<SiblingCheck>,
    visited_targets: HashSet<TargetKey>,
    visited_files: HashSet<PathBuf>,
}

impl<'a> Walker<'a> {
    /// A walker with an empty visited set.
    #[must_use]
    pub fn new(registry: &'a dyn Registry, cancel: &'a CancellationToken, max_depth: usize) -> Self {
        Self {
            registry,
            cancel,
            max_depth,
            siblings: None,
            visited_targets: HashSet::new(),
            visited_files: HashSet::new(),
        }
    }

    /// Apply `check` to every pointer occurrence the walk reaches.
    #[must_use]
    pub fn with_sibling_check(mut self, check: Option<SiblingCheck>) -> Self {
        self.siblings = check;
        self
    }

    /// Files touched so far.
    #[must_use]
    pub fn visited_files(&self) -> usize {
        self.visited_files.len()
    }

    /// Mark `key` visited, for targets recorded outside the walker.
    pub fn mark_visited(&mut self, key: TargetKey) {
        self.visited_targets.insert(key);
    }

    /// Walk `seeds` and everything reachable from them.
    ///
    /// # Errors
    /// - [`BundleError::StrictValidation`] for a reached pointer with
    ///   siblings, when a sibling check is set.
    /// - [`BundleError::UnresolvedReference`] for a structural pointer whose
    ///   file or fragment does not exist.
    /// - [`BundleError::Cancelled`] if the token fires.
    #[instrument(skip_all, fields(seeds = seeds.len()))]
    pub fn walk(
        &mut self,
        seeds: Vec<WorkItem>,
        table: &mut CompositionTable,
        report: &mut BundleReport,
    ) -> Result<(), BundleError> {
        let registry = self.registry;
        let root = registry.root().to_owned();
        let mut queue: VecDeque<WorkItem> = seeds.into();

        while let Some(item) = queue.pop_front() {
            self.cancel.check()?;
            self.visited_files.insert(item.file.clone());
            let Some(catalog) = registry.catalog(&item.file) else {
                continue;
            };

            for occ in catalog.refs_within(&item.scope) {
                self.cancel.check()?;
                if let Some(check) = &self.siblings {
                    check.check(occ)?;
                }
                if is_external(&occ.raw) {
                    trace!(pointer = %occ.raw, "external pointer left as-is");
                    continue;
                }
                let resolved =
                    resolve(registry, &occ.raw, &occ.file).map_err(|source| {
                        BundleError::UnresolvedReference {
                            pointer: occ.raw.clone(),
                            file: occ.file.clone(),
                            position: occ.position,
                            source,
                        }
                    })?;
                let key = resolved.key;
                if key.file() == root || self.visited_targets.contains(&key) {
                    continue;
                }

                let depth = item.depth + 1;
                if depth > self.max_depth {
                    warn!(
                        pointer = %occ.raw,
                        file = %occ.file.display(),
                        max_depth = self.max_depth,
                        "depth limit reached; branch truncated"
                    );
                    report.depth_truncation(SkippedPointer {
                        file: occ.file.clone(),
                        pointer: occ.raw.clone(),
                    });
                    continue;
                }

                self.visited_targets.insert(key.clone());
                let mut record = PendingCompositionRecord::new(
                    key.clone(),
                    resolved.node.clone(),
                    DiscoveredVia::Pointer(occ.clone()),
                    depth,
                );
                record.circular = registry.is_circular(&key);
                debug!(key = %key, depth, circular = record.circular, "discovered");
                table.insert(record);
                queue.push_back(WorkItem::target(&key, depth));
            }
        }
        Ok(())
    }
}
