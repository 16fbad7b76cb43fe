//! Component lifter: decides what happens to each discovered target.
//!
//! For every pending record the lifter picks one of three outcomes:
//!
//! - **chain** — the target is itself a bare `$ref`; nothing is lifted and
//!   the rewriter follows the inner pointer instead.
//! - **lift** — the target is placed under `components/<category>/<name>`
//!   in the root, with a collision-free name.
//! - **inline** — the category cannot be inferred; pointers to the target
//!   are replaced by a copy of it.

use serde_yaml::Value;
use stitch_index::locate::locate;
use stitch_index::pointer::{REF_KEY, file_stem};
use stitch_index::{Position, Registry};
use tracing::{debug, info};

use crate::bundle::classify::classify;
use crate::bundle::namer::{NameSource, assign_name};
use crate::error::BundleError;
use crate::model::category::Category;
use crate::model::origin::{ComponentOrigin, OriginTracker};
use crate::model::record::{DiscoveredVia, Disposition, PendingCompositionRecord};
use crate::model::report::BundleReport;
use crate::model::symbols::{SymbolEntry, SymbolTables};

/// Lifts pending records into the symbol tables.
pub struct Lifter<'a> {
    registry: &'a dyn Registry,
    delimiter: &'a str,
}

impl<'a> Lifter<'a> {
    #[must_use]
    pub const fn new(registry: &'a dyn Registry, delimiter: &'a str) -> Self {
        Self {
            registry,
            delimiter,
        }
    }

    /// Decide and apply the disposition of one pending record.
    ///
    /// # Errors
    /// [`BundleError::Construction`] when the fragment is not a valid
    /// object of its category.
    pub fn lift(
        &self,
        record: &mut PendingCompositionRecord,
        symbols: &mut SymbolTables,
        origins: &mut OriginTracker,
        report: &mut BundleReport,
    ) -> Result<(), BundleError> {
        if let Some(inner) = bare_pointer(&record.node) {
            debug!(key = %record.key, inner, "pointer chain");
            record.disposition = Disposition::Chain {
                inner: inner.to_owned(),
            };
            return Ok(());
        }

        let Some((category, candidate)) = placement(record) else {
            info!(key = %record.key, "category unknown; inlining");
            report.inline_fallbacks.push(record.key.to_string());
            record.disposition = Disposition::Inline;
            return Ok(());
        };

        construct(category, &record.node).map_err(|reason| BundleError::Construction {
            pointer: record.key.to_string(),
            file: record.key.file().to_owned(),
            category,
            reason,
        })?;

        let source = NameSource {
            file: record.key.file(),
            has_fragment: !record.key.is_whole_file(),
        };
        let name = assign_name(&candidate, source, self.delimiter, |n| {
            symbols.contains(category, n)
        });
        symbols.insert(
            category,
            SymbolEntry {
                name: name.clone(),
                value: record.node.clone(),
                owner: record.key.file().to_owned(),
            },
        );

        let bundled_ref = category.local_ref(&name);
        let position = self.position_of(record);
        debug!(key = %record.key, %bundled_ref, renamed = name != candidate, "lifted");
        origins.record(ComponentOrigin {
            original_file: record.key.file().to_owned(),
            original_ref: record.key.to_local_ref(),
            original_name: candidate.clone(),
            line: position.map_or(0, |p| p.line),
            column: position.map_or(0, |p| p.column),
            was_renamed: name != candidate,
            bundled_ref,
            component_type: category,
        });
        record.disposition = Disposition::Lifted {
            category,
            name,
            original_name: candidate,
        };
        Ok(())
    }

    fn position_of(&self, record: &PendingCompositionRecord) -> Option<Position> {
        if record.key.is_whole_file() {
            return Some(Position::START);
        }
        let doc = self.registry.document(record.key.file())?;
        locate(doc.source(), doc.format(), &record.key.tokens())
    }
}

/// The inner pointer when `node` is exactly `{$ref: ...}`.
fn bare_pointer(node: &Value) -> Option<&str> {
    match node {
        Value::Mapping(map) if map.len() == 1 => map.get(REF_KEY).and_then(Value::as_str),
        _ => None,
    }
}

/// Category and candidate name, or `None` to inline.
///
/// A location of the form `components/<category>/<name>` decides directly.
/// Targets reached only through a discriminator mapping are schemas by
/// definition. Anything else is classified by shape.
fn placement(record: &PendingCompositionRecord) -> Option<(Category, String)> {
    let tokens = record.key.tokens();
    if let [components, section, name] = tokens.as_slice() {
        if components == "components" {
            if let Some(category) = Category::from_segment(section) {
                return Some((category, name.clone()));
            }
        }
    }

    let candidate = tokens
        .last()
        .cloned()
        .unwrap_or_else(|| file_stem(record.key.file()));
    let category = match record.discovered_via {
        DiscoveredVia::Mapping(_) => Category::Schemas,
        DiscoveredVia::Pointer(_) => classify(&record.node)?,
    };
    Some((category, candidate))
}

/// Minimal shape checks before a fragment becomes a component.
fn construct(category: Category, node: &Value) -> Result<(), String> {
    let node = match node {
        Value::Tagged(tagged) => &tagged.value,
        other => other,
    };
    match (category, node) {
        (Category::Schemas, Value::Mapping(_) | Value::Bool(_)) => Ok(()),
        (Category::Schemas, other) => Err(format!(
            "expected a schema object or boolean, found {}",
            kind(other)
        )),
        (Category::Parameters, Value::Mapping(map)) => {
            if !map.get("name").is_some_and(Value::is_string) {
                return Err("parameter has no `name`".to_owned());
            }
            match map.get("in") {
                Some(Value::String(loc)) if ["query", "header", "path", "cookie"].contains(&loc.as_str()) => Ok(()),
                Some(other) => Err(format!("invalid parameter location {other:?}")),
                None => Err("parameter has no `in`".to_owned()),
            }
        }
        (Category::Callbacks, Value::Mapping(map)) => {
            match map.iter().find(|(_, v)| !v.is_mapping()) {
                Some((k, _)) => Err(format!("callback expression {k:?} is not a path item")),
                None => Ok(()),
            }
        }
        (_, Value::Mapping(_)) => Ok(()),
        (_, other) => Err(format!("expected a mapping, found {}", kind(other))),
    }
}

const fn kind(node: &Value) -> &'static str {
    match node {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
