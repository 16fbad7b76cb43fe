//! Per-file reference catalog.
//!
//! A [`ReferenceCatalog`] lists every pointer occurrence in one file, in
//! document order:
//!
//! - **refs** — mapping nodes carrying a string `$ref` key (structural pointers).
//! - **mappings** — string values of `discriminator.mapping` tables, which may
//!   be pointers even though they are not wrapped in a `$ref` node.
//!
//! Subtrees under `x-` vendor-extension keys are opaque and never catalogued.

use std::path::{Path, PathBuf};

use serde_yaml::Value;

use crate::document::Document;
use crate::locate::{Position, locate};
use crate::pointer::REF_KEY;

/// One `$ref` pointer node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefOccurrence {
    /// The raw pointer string.
    pub raw: String,
    /// The file the occurrence lives in.
    pub file: PathBuf,
    /// Unescaped tokens of the mapping that carries the `$ref` key.
    pub path: Vec<String>,
    /// Other keys on the same mapping, in document order.
    pub siblings: Vec<String>,
    /// Where the `$ref` key sits in the source, when recoverable.
    pub position: Option<Position>,
}

impl RefOccurrence {
    /// `true` when the pointer node carries keys besides `$ref`.
    #[must_use]
    pub fn has_siblings(&self) -> bool {
        !self.siblings.is_empty()
    }

    /// `true` when this occurrence lies inside the subtree at `prefix`.
    #[must_use]
    pub fn is_within(&self, prefix: &[String]) -> bool {
        self.path.starts_with(prefix)
    }
}

/// One discriminator mapping value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MappingOccurrence {
    /// The raw mapping value.
    pub raw: String,
    /// The file the occurrence lives in.
    pub file: PathBuf,
    /// Unescaped tokens ending in `discriminator`, `mapping`, `<tag>`.
    pub path: Vec<String>,
    /// Where the value's key sits in the source, when recoverable.
    pub position: Option<Position>,
}

impl MappingOccurrence {
    /// The discriminator tag this value is mapped from.
    #[must_use]
    pub fn tag(&self) -> &str {
        self.path.last().map_or("", String::as_str)
    }
}

/// Every pointer occurrence in one file.
#[derive(Clone, Debug, Default)]
pub struct ReferenceCatalog {
    file: PathBuf,
    refs: Vec<RefOccurrence>,
    mappings: Vec<MappingOccurrence>,
}

impl ReferenceCatalog {
    /// Catalogue `doc`.
    #[must_use]
    pub fn build(doc: &Document) -> Self {
        let mut catalog = Self {
            file: doc.id().to_owned(),
            refs: Vec::new(),
            mappings: Vec::new(),
        };
        let mut path = Vec::new();
        catalog.visit(doc.tree(), &mut path);
        for occ in &mut catalog.refs {
            let mut tokens = occ.path.clone();
            tokens.push(REF_KEY.to_owned());
            occ.position = locate(doc.source(), doc.format(), &tokens);
        }
        for occ in &mut catalog.mappings {
            occ.position = locate(doc.source(), doc.format(), &occ.path);
        }
        catalog
    }

    /// The catalogued file.
    #[must_use]
    pub fn file(&self) -> &Path {
        &self.file
    }

    /// All `$ref` occurrences in document order.
    #[must_use]
    pub fn refs(&self) -> &[RefOccurrence] {
        &self.refs
    }

    /// All discriminator mapping values in document order.
    #[must_use]
    pub fn mappings(&self) -> &[MappingOccurrence] {
        &self.mappings
    }

    /// `$ref` occurrences inside the subtree at `prefix`.
    pub fn refs_within<'a>(
        &'a self,
        prefix: &'a [String],
    ) -> impl Iterator<Item = &'a RefOccurrence> + 'a {
        self.refs.iter().filter(move |occ| occ.is_within(prefix))
    }

    fn visit(&mut self, node: &Value, path: &mut Vec<String>) {
        match node {
            Value::Mapping(map) => {
                if let Some(Value::String(raw)) = map.get(REF_KEY) {
                    let siblings = map
                        .keys()
                        .filter_map(Value::as_str)
                        .filter(|k| *k != REF_KEY)
                        .map(str::to_owned)
                        .collect();
                    self.refs.push(RefOccurrence {
                        raw: raw.clone(),
                        file: self.file.clone(),
                        path: path.clone(),
                        siblings,
                        position: None,
                    });
                }
                for (key, value) in map {
                    let Some(key) = key_token(key) else {
                        continue;
                    };
                    if key == REF_KEY || key.starts_with("x-") {
                        continue;
                    }
                    path.push(key);
                    if path.last().is_some_and(|k| k == "discriminator") {
                        self.collect_mapping(value, path);
                    }
                    self.visit(value, path);
                    path.pop();
                }
            }
            Value::Sequence(seq) => {
                for (i, item) in seq.iter().enumerate() {
                    path.push(i.to_string());
                    self.visit(item, path);
                    path.pop();
                }
            }
            Value::Tagged(tagged) => self.visit(&tagged.value, path),
            _ => {}
        }
    }

    fn collect_mapping(&mut self, discriminator: &Value, path: &[String]) {
        let Some(Value::Mapping(mapping)) = discriminator.get("mapping") else {
            return;
        };
        for (tag, value) in mapping {
            let (Some(tag), Some(raw)) = (key_token(tag), value.as_str()) else {
                continue;
            };
            let mut occ_path = path.to_vec();
            occ_path.push("mapping".to_owned());
            occ_path.push(tag);
            self.mappings.push(MappingOccurrence {
                raw: raw.to_owned(),
                file: self.file.clone(),
                path: occ_path,
                position: None,
            });
        }
    }
}

/// Render a mapping key as a pointer token. Scalar keys (including the
/// numeric status codes YAML parses as integers) are stringified.
#[must_use]
pub fn key_token(key: &Value) -> Option<String> {
    match key {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
