//! The composition table: one record per distinct external target.
//!
//! Records live in an arena ([`CompositionTable`]) and are looked up by
//! [`TargetKey`]. Nothing holds a reference into another record; the
//! rewriter resolves a pointer to a key and then asks the table.

use std::collections::HashMap;

use serde_yaml::Value;
use stitch_index::{MappingOccurrence, RefOccurrence, TargetKey};

use crate::model::category::Category;

/// How a target was first discovered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiscoveredVia {
    /// A structural `$ref` node.
    Pointer(RefOccurrence),
    /// A discriminator mapping value.
    Mapping(MappingOccurrence),
}

impl DiscoveredVia {
    /// The raw pointer string as written.
    #[must_use]
    pub fn raw(&self) -> &str {
        match self {
            Self::Pointer(occ) => &occ.raw,
            Self::Mapping(occ) => &occ.raw,
        }
    }
}

/// What the lifter decided for a record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Disposition {
    /// Not yet lifted.
    Pending,
    /// Written into the root under `components`.
    Lifted {
        category: Category,
        name: String,
        original_name: String,
    },
    /// The target is itself a bare pointer; the rewriter follows it.
    Chain { inner: String },
    /// Unclassifiable; every pointer to it is replaced by a copy.
    Inline,
}

/// One external target awaiting (or past) composition.
#[derive(Clone, Debug)]
pub struct PendingCompositionRecord {
    /// Fully-qualified target.
    pub key: TargetKey,
    /// The raw target fragment.
    pub node: Value,
    /// `true` when the target can reach itself.
    pub circular: bool,
    /// First occurrence that led here.
    pub discovered_via: DiscoveredVia,
    /// Pointer hops from the root at discovery.
    pub depth: usize,
    /// Lifter outcome.
    pub disposition: Disposition,
}

impl PendingCompositionRecord {
    /// A fresh record in [`Disposition::Pending`].
    #[must_use]
    pub const fn new(key: TargetKey, node: Value, discovered_via: DiscoveredVia, depth: usize) -> Self {
        Self {
            key,
            node,
            circular: false,
            discovered_via,
            depth,
            disposition: Disposition::Pending,
        }
    }

    /// Pointer the rewriter should substitute, for lifted records.
    #[must_use]
    pub fn resolved_location(&self) -> Option<String> {
        match &self.disposition {
            Disposition::Lifted { category, name, .. } => Some(category.local_ref(name)),
            _ => None,
        }
    }

    /// `true` if the collision resolver changed the name.
    #[must_use]
    pub fn was_renamed(&self) -> bool {
        matches!(&self.disposition, Disposition::Lifted { name, original_name, .. } if name != original_name)
    }
}

/// Arena of records keyed by target, in discovery order.
#[derive(Debug, Default)]
pub struct CompositionTable {
    records: Vec<PendingCompositionRecord>,
    index: HashMap<TargetKey, usize>,
}

impl CompositionTable {
    /// An empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `record` unless its key is already present.
    ///
    /// Returns `true` when the record was new.
    pub fn insert(&mut self, record: PendingCompositionRecord) -> bool {
        if self.index.contains_key(&record.key) {
            return false;
        }
        self.index.insert(record.key.clone(), self.records.len());
        self.records.push(record);
        true
    }

    /// `true` when `key` has a record.
    #[must_use]
    pub fn contains(&self, key: &TargetKey) -> bool {
        self.index.contains_key(key)
    }

    /// The record for `key`.
    #[must_use]
    pub fn get(&self, key: &TargetKey) -> Option<&PendingCompositionRecord> {
        self.index.get(key).map(|&i| &self.records[i])
    }

    /// Indices of records still in [`Disposition::Pending`], in discovery order.
    #[must_use]
    pub fn pending(&self) -> Vec<usize> {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.disposition == Disposition::Pending)
            .map(|(i, _)| i)
            .collect()
    }

    /// Mutable access by arena index.
    pub fn record_mut(&mut self, index: usize) -> Option<&mut PendingCompositionRecord> {
        self.records.get_mut(index)
    }

    /// All records in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = &PendingCompositionRecord> {
        self.records.iter()
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// `true` when empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
