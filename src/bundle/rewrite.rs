//! Pointer rewriter for compose mode.
//!
//! Runs after every record has a disposition. Each `$ref` in the root tree
//! and in every lifted component is resolved against the file it came from,
//! then redirected:
//!
//! - target in the root → same-document pointer to it
//! - lifted target → `#/components/<category>/<name>`
//! - chain target → whatever the inner pointer ends up at
//! - inline target → the node is replaced by a rewritten copy of the target
//!
//! Discriminator mapping values get the same treatment, except that they
//! are never inlined.

use std::path::Path;

use serde_yaml::{Mapping, Value};
use stitch_index::pointer::{REF_KEY, is_external};
use stitch_index::{Registry, TargetKey};
use tracing::{debug, instrument, warn};

use crate::bundle::mapping::mapping_target;
use crate::bundle::resolve::resolve;
use crate::cancel::CancellationToken;
use crate::error::BundleError;
use crate::model::record::{CompositionTable, Disposition};
use crate::model::report::{BundleReport, SkippedPointer};
use crate::model::symbols::SymbolTables;

/// Longest chain of bare pointers followed before giving up.
const MAX_CHAIN_HOPS: usize = 64;

#[derive(Debug, PartialEq, Eq)]
enum Destination {
    Keep,
    Replace(String),
    Inline(TargetKey),
}

/// Rewrites pointers against a finished [`CompositionTable`].
pub struct Rewriter<'a> {
    registry: &'a dyn Registry,
    table: &'a CompositionTable,
    cancel: &'a CancellationToken,
    max_depth: usize,
}

impl<'a> Rewriter<'a> {
    #[must_use]
    pub const fn new(
        registry: &'a dyn Registry,
        table: &'a CompositionTable,
        cancel: &'a CancellationToken,
        max_depth: usize,
    ) -> Self {
        Self {
            registry,
            table,
            cancel,
            max_depth,
        }
    }

    /// Rewrite the root tree and every lifted component in place.
    ///
    /// # Errors
    /// [`BundleError::Cancelled`] if the token fires.
    #[instrument(skip_all, fields(lifted = symbols.lifted_count()))]
    pub fn rewrite_bundle(
        &self,
        root_tree: &mut Value,
        symbols: &mut SymbolTables,
        report: &mut BundleReport,
    ) -> Result<(), BundleError> {
        let root = self.registry.root().to_owned();
        let mut stack = Vec::new();
        self.rewrite(root_tree, &root, &mut stack, report)?;
        for (category, entry) in symbols.lifted_mut() {
            debug!(%category, name = %entry.name, "rewriting lifted component");
            let owner = entry.owner.clone();
            self.rewrite(&mut entry.value, &owner, &mut stack, report)?;
        }
        Ok(())
    }

    fn rewrite(
        &self,
        node: &mut Value,
        owner: &Path,
        stack: &mut Vec<TargetKey>,
        report: &mut BundleReport,
    ) -> Result<(), BundleError> {
        self.cancel.check()?;
        let replacement = match node {
            Value::Mapping(map) => {
                let pointer = map.get(REF_KEY).and_then(Value::as_str).map(str::to_owned);
                let destination = pointer
                    .as_deref()
                    .map_or(Destination::Keep, |raw| self.destination(raw, owner));
                match destination {
                    Destination::Keep => {
                        self.rewrite_children(map, owner, stack, report)?;
                        None
                    }
                    Destination::Replace(new) => {
                        map.insert(Value::from(REF_KEY), Value::from(new));
                        self.rewrite_children(map, owner, stack, report)?;
                        None
                    }
                    Destination::Inline(key) => {
                        let raw = pointer.unwrap_or_default();
                        let copy = self.inline_copy(&key, &raw, owner, stack, report)?;
                        self.rewrite_children(map, owner, stack, report)?;
                        copy.map(|copy| {
                            let mut siblings = std::mem::take(map);
                            siblings.remove(REF_KEY);
                            merge_siblings(copy, siblings)
                        })
                    }
                }
            }
            Value::Sequence(seq) => {
                for item in seq {
                    self.rewrite(item, owner, stack, report)?;
                }
                None
            }
            Value::Tagged(tagged) => {
                self.rewrite(&mut tagged.value, owner, stack, report)?;
                None
            }
            _ => None,
        };
        if let Some(value) = replacement {
            *node = value;
        }
        Ok(())
    }

    fn rewrite_children(
        &self,
        map: &mut Mapping,
        owner: &Path,
        stack: &mut Vec<TargetKey>,
        report: &mut BundleReport,
    ) -> Result<(), BundleError> {
        for (key, value) in map.iter_mut() {
            match key.as_str() {
                Some(k) if k == REF_KEY || k.starts_with("x-") => continue,
                Some("discriminator") => self.rewrite_mapping(value, owner),
                _ => {}
            }
            self.rewrite(value, owner, stack, report)?;
        }
        Ok(())
    }

    fn rewrite_mapping(&self, discriminator: &mut Value, owner: &Path) {
        let Some(Value::Mapping(mapping)) = discriminator.get_mut("mapping") else {
            return;
        };
        for (_, value) in mapping.iter_mut() {
            let Some(key) = value
                .as_str()
                .and_then(|raw| mapping_target(self.registry, raw, owner))
            else {
                continue;
            };
            if let Destination::Replace(new) = self.follow(&key, 0) {
                *value = Value::from(new);
            }
        }
    }

    fn destination(&self, raw: &str, owner: &Path) -> Destination {
        if is_external(raw) {
            return Destination::Keep;
        }
        resolve(self.registry, raw, owner).map_or(Destination::Keep, |r| self.follow(&r.key, 0))
    }

    fn follow(&self, key: &TargetKey, hops: usize) -> Destination {
        if key.file() == self.registry.root() {
            return Destination::Replace(key.to_local_ref());
        }
        let Some(record) = self.table.get(key) else {
            return Destination::Keep;
        };
        match &record.disposition {
            Disposition::Lifted { .. } => record
                .resolved_location()
                .map_or(Destination::Keep, Destination::Replace),
            Disposition::Chain { inner } => {
                if hops >= MAX_CHAIN_HOPS {
                    warn!(key = %key, "pointer chain too long; left as-is");
                    return Destination::Keep;
                }
                if is_external(inner) {
                    return Destination::Replace(inner.clone());
                }
                resolve(self.registry, inner, key.file())
                    .map_or(Destination::Keep, |r| self.follow(&r.key, hops + 1))
            }
            Disposition::Inline => Destination::Inline(key.clone()),
            Disposition::Pending => Destination::Keep,
        }
    }

    fn inline_copy(
        &self,
        key: &TargetKey,
        raw: &str,
        owner: &Path,
        stack: &mut Vec<TargetKey>,
        report: &mut BundleReport,
    ) -> Result<Option<Value>, BundleError> {
        let skipped = SkippedPointer {
            file: owner.to_owned(),
            pointer: raw.to_owned(),
        };
        if stack.contains(key) {
            warn!(pointer = raw, file = %owner.display(), "circular inline target; pointer left in place");
            report.circular_skip(skipped);
            return Ok(None);
        }
        if stack.len() >= self.max_depth {
            warn!(pointer = raw, file = %owner.display(), "depth limit reached; pointer left in place");
            report.depth_truncation(skipped);
            return Ok(None);
        }
        let Some(record) = self.table.get(key) else {
            return Ok(None);
        };
        let mut copy = record.node.clone();
        stack.push(key.clone());
        let result = self.rewrite(&mut copy, key.file(), stack, report);
        stack.pop();
        result.map(|()| Some(copy))
    }
}

/// Lay `siblings` over `copy`. Siblings win; a non-mapping copy keeps its
/// own value and the siblings are dropped.
pub(crate) fn merge_siblings(copy: Value, siblings: Mapping) -> Value {
    match copy {
        Value::Mapping(mut base) => {
            for (k, v) in siblings {
                base.insert(k, v);
            }
            Value::Mapping(base)
        }
        other => {
            if !siblings.is_empty() {
                debug!("pointer siblings dropped; target is not a mapping");
            }
            other
        }
    }
}
