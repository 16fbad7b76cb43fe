//! Per-category symbol tables for the bundled `components` section.
//!
//! Seeded with the names already present in the root document, then grown
//! by the lifter. Root entries are never moved or renamed; lifted entries
//! are appended after them, category by category, in lift order.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use serde_yaml::{Mapping, Value};
use stitch_index::catalog::key_token;

use crate::error::BundleError;
use crate::model::category::Category;

/// One lifted component.
#[derive(Clone, Debug, PartialEq)]
pub struct SymbolEntry {
    /// Final (collision-free) name.
    pub name: String,
    /// The component body, rewritten in place before write-back.
    pub value: Value,
    /// File the body came from; its pointers resolve against this file.
    pub owner: PathBuf,
}

#[derive(Clone, Debug, Default)]
struct SymbolTable {
    names: HashSet<String>,
    lifted: Vec<SymbolEntry>,
}

/// Every category's names and lifted entries.
#[derive(Clone, Debug, Default)]
pub struct SymbolTables {
    tables: BTreeMap<Category, SymbolTable>,
}

impl SymbolTables {
    /// Seed from the `components` section of the root tree.
    #[must_use]
    pub fn from_root(root: &Value) -> Self {
        let mut tables = Self::default();
        let Some(Value::Mapping(components)) = root.get("components") else {
            return tables;
        };
        for (key, section) in components {
            let (Some(category), Value::Mapping(entries)) =
                (key.as_str().and_then(Category::from_segment), section)
            else {
                continue;
            };
            let table = tables.tables.entry(category).or_default();
            table.names.extend(entries.keys().filter_map(key_token));
        }
        tables
    }

    /// `true` when `name` is taken in `category`.
    #[must_use]
    pub fn contains(&self, category: Category, name: &str) -> bool {
        self.tables
            .get(&category)
            .is_some_and(|t| t.names.contains(name))
    }

    /// Add a lifted entry. Returns `false` (and changes nothing) if the name
    /// is already taken.
    pub fn insert(&mut self, category: Category, entry: SymbolEntry) -> bool {
        let table = self.tables.entry(category).or_default();
        if !table.names.insert(entry.name.clone()) {
            return false;
        }
        table.lifted.push(entry);
        true
    }

    /// Lifted entries, category by category.
    pub fn lifted(&self) -> impl Iterator<Item = (Category, &SymbolEntry)> {
        self.tables
            .iter()
            .flat_map(|(c, t)| t.lifted.iter().map(move |e| (*c, e)))
    }

    /// Mutable lifted entries, category by category.
    pub fn lifted_mut(&mut self) -> impl Iterator<Item = (Category, &mut SymbolEntry)> {
        self.tables
            .iter_mut()
            .flat_map(|(c, t)| t.lifted.iter_mut().map(move |e| (*c, e)))
    }

    /// Number of lifted entries.
    #[must_use]
    pub fn lifted_count(&self) -> usize {
        self.tables.values().map(|t| t.lifted.len()).sum()
    }

    /// The lifted entry called `name` in `category`.
    pub fn lifted_entry_mut(&mut self, category: Category, name: &str) -> Option<&mut SymbolEntry> {
        self.tables
            .get_mut(&category)?
            .lifted
            .iter_mut()
            .find(|e| e.name == name)
    }

    /// Append every lifted entry to `root.components.<category>`, creating
    /// the sections as needed. An empty (`null`) section counts as missing.
    ///
    /// # Errors
    /// [`BundleError::InvalidInput`] if the root, its `components`, or a
    /// target section is present but not a mapping.
    pub fn write_into(self, root: &mut Value) -> Result<(), BundleError> {
        if self.lifted_count() == 0 {
            return Ok(());
        }
        let Value::Mapping(root_map) = root else {
            return Err(not_a_mapping("root document"));
        };
        let components = section_mut(root_map, "components")
            .ok_or_else(|| not_a_mapping("`components`"))?;
        for (category, table) in self.tables {
            if table.lifted.is_empty() {
                continue;
            }
            let section = section_mut(components, category.as_str())
                .ok_or_else(|| not_a_mapping(&format!("`components.{}`", category.as_str())))?;
            for entry in table.lifted {
                section.insert(Value::from(entry.name), entry.value);
            }
        }
        Ok(())
    }
}

/// The mapping under `key`, created if absent or null.
fn section_mut<'m>(parent: &'m mut Mapping, key: &str) -> Option<&'m mut Mapping> {
    let slot = parent
        .entry(Value::from(key))
        .or_insert_with(|| Value::Mapping(Mapping::new()));
    if slot.is_null() {
        *slot = Value::Mapping(Mapping::new());
    }
    slot.as_mapping_mut()
}

fn not_a_mapping(what: &str) -> BundleError {
    BundleError::InvalidInput {
        reason: format!("{what} is not a mapping; lifted components have nowhere to go"),
    }
}
