//! Discriminator mapping resolution.
//!
//! `discriminator.mapping` values are plain strings, not `$ref` nodes, so
//! the walker never follows them. This pass finds every mapping value that
//! points at a target in another file and queues it like a structural
//! pointer, so that the target is lifted and the value can be rewritten.
//!
//! Mapping values are advisory: one that does not resolve is logged and
//! reported, never fatal.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use stitch_index::pointer::is_external;
use stitch_index::{Registry, TargetKey};
use tracing::{debug, instrument, warn};

use crate::bundle::resolve::resolve;
use crate::bundle::walk::{WorkItem, Walker};
use crate::model::record::{CompositionTable, DiscoveredVia, PendingCompositionRecord};
use crate::model::report::{BundleReport, UnresolvedMapping};

/// Queue every mapping target inside the bundled scopes that has no record.
///
/// Scopes are the whole root plus the subtree of every record already in
/// the table. Returns the new work items for the walker.
#[instrument(skip_all, fields(records = table.len()))]
pub fn discover_mapping_targets(
    registry: &dyn Registry,
    table: &mut CompositionTable,
    walker: &mut Walker<'_>,
    report: &mut BundleReport,
) -> Vec<WorkItem> {
    let root = registry.root().to_owned();
    let mut scopes: Vec<(PathBuf, Vec<String>, usize)> = vec![(root.clone(), Vec::new(), 0)];
    scopes.extend(
        table
            .iter()
            .map(|r| (r.key.file().to_owned(), r.key.tokens(), r.depth)),
    );

    let mut seen: HashSet<(PathBuf, Vec<String>)> = HashSet::new();
    let mut items = Vec::new();

    for (file, scope, depth) in scopes {
        let Some(catalog) = registry.catalog(&file) else {
            continue;
        };
        for occ in catalog.mappings().iter().filter(|m| m.path.starts_with(&scope)) {
            if !seen.insert((occ.file.clone(), occ.path.clone())) {
                continue;
            }
            if is_external(&occ.raw) || !is_pointer_like(&occ.raw) {
                continue;
            }
            let key = match resolve(registry, &occ.raw, &occ.file) {
                Ok(resolved) => resolved.key,
                Err(e) => {
                    warn!(
                        file = %occ.file.display(),
                        tag = occ.tag(),
                        value = %occ.raw,
                        error = %e,
                        "discriminator mapping value left unresolved"
                    );
                    report.unresolved_mapping(UnresolvedMapping {
                        file: occ.file.clone(),
                        tag: occ.tag().to_owned(),
                        value: occ.raw.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };
            if key.file() == root || table.contains(&key) {
                continue;
            }
            let Some(node) = registry.find_component(key.file(), key.fragment()) else {
                continue;
            };
            let mut record = PendingCompositionRecord::new(
                key.clone(),
                node.clone(),
                DiscoveredVia::Mapping(occ.clone()),
                depth + 1,
            );
            record.circular = registry.is_circular(&key);
            debug!(key = %key, tag = occ.tag(), "mapping target discovered");
            table.insert(record);
            walker.mark_visited(key.clone());
            items.push(WorkItem::target(&key, depth + 1));
        }
    }
    items
}

/// Mapping values may be bare schema names (`Dog`) rather than pointers.
pub(crate) fn is_pointer_like(raw: &str) -> bool {
    raw.contains('#') || raw.contains('/') || Path::new(raw).extension().is_some()
}

/// Key for a mapping value, if it is a pointer that resolves.
#[must_use]
pub fn mapping_target(registry: &dyn Registry, raw: &str, owner: &Path) -> Option<TargetKey> {
    if is_external(raw) || !is_pointer_like(raw) {
        return None;
    }
    resolve(registry, raw, owner).ok().map(|r| r.key)
}
