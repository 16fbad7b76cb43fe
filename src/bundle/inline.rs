//! Inline mode: replace every pointer into another file with a deep copy of
//! its target.
//!
//! Copies are themselves inlined against the file they came from. Targets
//! that can reach themselves are never expanded; their pointers stay as
//! written and are listed in the report. Pointers into the root document
//! are kept as same-document pointers; circular ones are reported too.
//!
//! Discriminator mapping values need an address rather than a copy. A
//! mapping value that lands outside the root is lifted into
//! `components/schemas` under a collision-free name and rewritten to a
//! local pointer; any `$ref` to the same target then points there as well.

use std::collections::{HashMap, VecDeque};
use std::path::Path;

use serde_yaml::{Mapping, Value};
use stitch_index::catalog::key_token;
use stitch_index::pointer::{REF_KEY, file_stem, is_external};
use stitch_index::{Position, Registry, TargetKey};
use tracing::{debug, info, instrument, warn};

use crate::bundle::mapping::is_pointer_like;
use crate::bundle::namer::{NameSource, assign_name};
use crate::bundle::resolve::resolve;
use crate::bundle::rewrite::merge_siblings;
use crate::cancel::CancellationToken;
use crate::error::BundleError;
use crate::model::category::Category;
use crate::model::report::{BundleReport, SkippedPointer, UnresolvedMapping};
use crate::model::symbols::{SymbolEntry, SymbolTables};

/// Expands external pointers in place.
pub struct Inliner<'a> {
    registry: &'a dyn Registry,
    cancel: &'a CancellationToken,
    max_depth: usize,
    delimiter: &'a str,
}

/// State carried through one inline run.
struct Pass<'r> {
    report: &'r mut BundleReport,
    /// Targets being expanded, outermost first.
    stack: Vec<TargetKey>,
    /// Tokens of the node being visited, relative to its owner file.
    path: Vec<String>,
    symbols: SymbolTables,
    /// Mapping targets already given a schema name, with their local pointer.
    lifted: HashMap<TargetKey, String>,
    /// Lifted targets whose bodies still need inlining.
    queue: VecDeque<(TargetKey, String, Value)>,
}

impl<'a> Inliner<'a> {
    #[must_use]
    pub const fn new(
        registry: &'a dyn Registry,
        cancel: &'a CancellationToken,
        max_depth: usize,
        delimiter: &'a str,
    ) -> Self {
        Self {
            registry,
            cancel,
            max_depth,
            delimiter,
        }
    }

    /// Inline every external pointer in `root_tree`.
    ///
    /// # Errors
    /// - [`BundleError::UnresolvedReference`] for a pointer whose target
    ///   does not exist.
    /// - [`BundleError::InvalidInput`] if mapping targets must be lifted but
    ///   the root's `components` cannot hold them.
    /// - [`BundleError::Cancelled`] if the token fires.
    #[instrument(skip_all)]
    pub fn inline_bundle(&self, root_tree: &mut Value, report: &mut BundleReport) -> Result<(), BundleError> {
        let root = self.registry.root().to_owned();
        let mut pass = Pass {
            report,
            stack: Vec::new(),
            path: Vec::new(),
            symbols: SymbolTables::from_root(root_tree),
            lifted: HashMap::new(),
            queue: VecDeque::new(),
        };
        self.inline(root_tree, &root, &mut pass)?;

        while let Some((key, name, mut body)) = pass.queue.pop_front() {
            pass.path = key.tokens();
            pass.stack.push(key.clone());
            self.inline(&mut body, key.file(), &mut pass)?;
            pass.stack.pop();
            if let Some(entry) = pass.symbols.lifted_entry_mut(Category::Schemas, &name) {
                entry.value = body;
            }
        }

        if !pass.lifted.is_empty() {
            info!(lifted = pass.lifted.len(), "mapping targets lifted into components");
        }
        pass.symbols.write_into(root_tree)
    }

    fn inline(&self, node: &mut Value, owner: &Path, pass: &mut Pass<'_>) -> Result<(), BundleError> {
        self.cancel.check()?;
        let replacement = match node {
            Value::Mapping(map) => {
                let copy = match map.get(REF_KEY).and_then(Value::as_str).map(str::to_owned) {
                    Some(raw) => self.expand(map, &raw, owner, pass)?,
                    None => None,
                };
                self.inline_children(map, owner, pass)?;
                copy.map(|copy| {
                    let mut siblings = std::mem::take(map);
                    siblings.remove(REF_KEY);
                    merge_siblings(copy, siblings)
                })
            }
            Value::Sequence(seq) => {
                for (i, item) in seq.iter_mut().enumerate() {
                    pass.path.push(i.to_string());
                    self.inline(item, owner, pass)?;
                    pass.path.pop();
                }
                None
            }
            Value::Tagged(tagged) => {
                self.inline(&mut tagged.value, owner, pass)?;
                None
            }
            _ => None,
        };
        if let Some(value) = replacement {
            *node = value;
        }
        Ok(())
    }

    /// Mapping values go first, so sibling pointers to a lifted target
    /// become local pointers instead of copies.
    fn inline_children(&self, map: &mut Mapping, owner: &Path, pass: &mut Pass<'_>) -> Result<(), BundleError> {
        if let Some(discriminator) = map.get_mut("discriminator") {
            self.map_discriminator(discriminator, owner, pass);
        }
        for (key, value) in map.iter_mut() {
            let token = key_token(key).unwrap_or_default();
            if token == REF_KEY || token.starts_with("x-") {
                continue;
            }
            pass.path.push(token);
            self.inline(value, owner, pass)?;
            pass.path.pop();
        }
        Ok(())
    }

    fn map_discriminator(&self, discriminator: &mut Value, owner: &Path, pass: &mut Pass<'_>) {
        let Some(Value::Mapping(mapping)) = discriminator.get_mut("mapping") else {
            return;
        };
        for (tag, value) in mapping.iter_mut() {
            let Some(raw) = value
                .as_str()
                .filter(|raw| !is_external(raw) && is_pointer_like(raw))
                .map(str::to_owned)
            else {
                continue;
            };
            match resolve(self.registry, &raw, owner) {
                Ok(resolved) => {
                    let local = self.lifted_ref(resolved.key, resolved.node, pass);
                    *value = Value::from(local);
                }
                Err(e) => {
                    let tag = key_token(tag).unwrap_or_default();
                    warn!(file = %owner.display(), tag = %tag, value = %raw, error = %e, "discriminator mapping value left unresolved");
                    pass.report.unresolved_mapping(UnresolvedMapping {
                        file: owner.to_owned(),
                        tag,
                        value: raw,
                        reason: e.to_string(),
                    });
                }
            }
        }
    }

    /// The local pointer for a mapping target, lifting it on first sight.
    fn lifted_ref(&self, key: TargetKey, node: &Value, pass: &mut Pass<'_>) -> String {
        if key.file() == self.registry.root() {
            return key.to_local_ref();
        }
        if let Some(local) = pass.lifted.get(&key) {
            return local.clone();
        }
        let candidate = key
            .tokens()
            .last()
            .cloned()
            .unwrap_or_else(|| file_stem(key.file()));
        let source = NameSource {
            file: key.file(),
            has_fragment: !key.is_whole_file(),
        };
        let name = assign_name(&candidate, source, self.delimiter, |n| {
            pass.symbols.contains(Category::Schemas, n)
        });
        pass.symbols.insert(
            Category::Schemas,
            SymbolEntry {
                name: name.clone(),
                value: Value::Null,
                owner: key.file().to_owned(),
            },
        );
        let local = Category::Schemas.local_ref(&name);
        debug!(key = %key, %local, "mapping target lifted");
        pass.lifted.insert(key.clone(), local.clone());
        pass.queue.push_back((key, name, node.clone()));
        local
    }

    /// The expanded copy for the pointer on `map`, or `None` to keep it.
    /// Root targets reached from another file and lifted mapping targets
    /// are redirected in place.
    fn expand(
        &self,
        map: &mut Mapping,
        raw: &str,
        owner: &Path,
        pass: &mut Pass<'_>,
    ) -> Result<Option<Value>, BundleError> {
        if is_external(raw) {
            return Ok(None);
        }
        let resolved = resolve(self.registry, raw, owner).map_err(|source| {
            BundleError::UnresolvedReference {
                pointer: raw.to_owned(),
                file: owner.to_owned(),
                position: self.position_of(raw, owner, &pass.path),
                source,
            }
        })?;
        let key = resolved.key;
        let skipped = || SkippedPointer {
            file: owner.to_owned(),
            pointer: raw.to_owned(),
        };

        if key.file() == self.registry.root() {
            if self.registry.is_circular(&key) {
                debug!(pointer = raw, file = %owner.display(), "circular root pointer kept");
                pass.report.circular_skip(skipped());
            }
            map.insert(Value::from(REF_KEY), Value::from(key.to_local_ref()));
            return Ok(None);
        }
        if let Some(local) = pass.lifted.get(&key) {
            map.insert(Value::from(REF_KEY), Value::from(local.as_str()));
            return Ok(None);
        }
        if self.registry.is_circular(&key) || pass.stack.contains(&key) {
            warn!(pointer = raw, file = %owner.display(), "circular reference left in place");
            pass.report.circular_skip(skipped());
            return Ok(None);
        }
        if pass.stack.len() >= self.max_depth {
            warn!(pointer = raw, file = %owner.display(), max_depth = self.max_depth, "depth limit reached; pointer left in place");
            pass.report.depth_truncation(skipped());
            return Ok(None);
        }

        let mut copy = resolved.node.clone();
        let outer = std::mem::replace(&mut pass.path, key.tokens());
        pass.stack.push(key.clone());
        let result = self.inline(&mut copy, key.file(), pass);
        pass.stack.pop();
        pass.path = outer;
        result.map(|()| Some(copy))
    }

    /// Source position of the `$ref` at `path` in `owner`.
    fn position_of(&self, raw: &str, owner: &Path, path: &[String]) -> Option<Position> {
        self.registry
            .catalog(owner)?
            .refs()
            .iter()
            .find(|occ| occ.path == path && occ.raw == raw)
            .and_then(|occ| occ.position)
    }
}

#[cfg(test)]
mod tests {
    use stitch_index::{DocumentSet, MemoryLoader};

    use super::*;

    const ROOT: &str = "\
openapi: 3.1.0
paths:
  /pets:
    get:
      responses:
        '200':
          $ref: './pets.yaml#/Ok'
          description: overridden
components:
  schemas:
    Node:
      properties:
        next:
          $ref: '#/components/schemas/Node'
    Tree:
      $ref: './tree.yaml#/Tree'
";

    fn set(pets: &str) -> DocumentSet {
        let loader = MemoryLoader::new()
            .with_file("/s/pets.yaml", pets)
            .with_file("/s/tree.yaml", "Tree:\n  properties:\n    children:\n      items:\n        $ref: '#/Tree'\n");
        DocumentSet::load(Path::new("/s/openapi.yaml"), ROOT.to_owned(), &loader).unwrap()
    }

    const PETS: &str = "\
Ok:
  description: ok
  content:
    application/json:
      schema:
        $ref: '#/Pet'
Pet:
  type: object
  properties:
    node:
      $ref: './openapi.yaml#/components/schemas/Node'
";

    fn run(set: &DocumentSet) -> Result<(Value, BundleReport), BundleError> {
        let cancel = CancellationToken::new();
        let mut tree = set.document(set.root()).unwrap().tree().clone();
        let mut report = BundleReport::default();
        Inliner::new(set, &cancel, 100, "__").inline_bundle(&mut tree, &mut report)?;
        Ok((tree, report))
    }

    #[test]
    fn external_pointers_become_copies() {
        let set = set(PETS);
        let (tree, _) = run(&set).unwrap();
        let ok = &tree["paths"]["/pets"]["get"]["responses"]["200"];
        assert!(ok.get("$ref").is_none());
        assert_eq!(ok["description"], Value::from("overridden"));
        let schema = &ok["content"]["application/json"]["schema"];
        assert_eq!(schema["type"], Value::from("object"));
        assert_eq!(
            schema["properties"]["node"]["$ref"],
            Value::from("#/components/schemas/Node")
        );
    }

    #[test]
    fn circular_targets_stay_pointers() {
        let set = set(PETS);
        let (tree, report) = run(&set).unwrap();
        assert_eq!(
            tree["components"]["schemas"]["Tree"]["$ref"],
            Value::from("./tree.yaml#/Tree")
        );
        // Tree, the root-local Node cycle, and the copy's pointer back to Node.
        assert_eq!(report.circular_skips.len(), 3);
        assert!(report.circular_skips.iter().any(|s| s.pointer == "./tree.yaml#/Tree"));
        assert_eq!(
            tree["components"]["schemas"]["Node"]["properties"]["next"]["$ref"],
            Value::from("#/components/schemas/Node")
        );
    }

    #[test]
    fn missing_fragment_is_hard_error() {
        let set = set("Ok:\n  $ref: '#/Missing'\n");
        let err = run(&set).unwrap_err();
        assert!(matches!(err, BundleError::UnresolvedReference { ref pointer, .. } if pointer == "#/Missing"));
    }

    #[test]
    fn error_position_is_the_failing_occurrence() {
        // The first `#/Missing` is never reached; the second one fails.
        let set = set("Unused:\n  $ref: '#/Missing'\nOk:\n  description: ok\n  schema:\n    $ref: '#/Missing'\n");
        let err = run(&set).unwrap_err();
        let BundleError::UnresolvedReference { position, file, .. } = err else {
            panic!("expected an unresolved reference, got {err:?}");
        };
        assert_eq!(file, Path::new("/s/pets.yaml"));
        assert_eq!(position.map(|p| (p.line, p.column)), Some((6, 5)));
    }

    const MAPPED_ROOT: &str = "\
openapi: 3.1.0
components:
  schemas:
    Cat:
      type: string
    Pet:
      oneOf:
        - $ref: './animals.yaml#/Cat'
      discriminator:
        propertyName: kind
        mapping:
          cat: './animals.yaml#/Cat'
          dog: './dog.yaml'
          bird: Bird
          ghost: './animals.yaml#/Ghost'
";

    fn mapped_set() -> DocumentSet {
        let loader = MemoryLoader::new()
            .with_file(
                "/s/animals.yaml",
                "Cat:\n  type: object\n  properties:\n    mother:\n      $ref: '#/Cat'\n",
            )
            .with_file("/s/dog.yaml", "type: object\nproperties:\n  bark:\n    type: boolean\n");
        DocumentSet::load(Path::new("/s/openapi.yaml"), MAPPED_ROOT.to_owned(), &loader).unwrap()
    }

    #[test]
    fn mapping_targets_are_lifted_and_rewritten() {
        let set = mapped_set();
        let (tree, report) = run(&set).unwrap();
        let schemas = &tree["components"]["schemas"];
        let pet = &schemas["Pet"];
        let mapping = &pet["discriminator"]["mapping"];

        assert_eq!(mapping["cat"], Value::from("#/components/schemas/Cat__animals"));
        assert_eq!(mapping["dog"], Value::from("#/components/schemas/dog"));
        assert_eq!(mapping["bird"], Value::from("Bird"));
        assert_eq!(pet["oneOf"][0]["$ref"], Value::from("#/components/schemas/Cat__animals"));

        assert_eq!(schemas["Cat"]["type"], Value::from("string"));
        assert_eq!(
            schemas["Cat__animals"]["properties"]["mother"]["$ref"],
            Value::from("#/components/schemas/Cat__animals")
        );
        assert_eq!(schemas["dog"]["properties"]["bark"]["type"], Value::from("boolean"));
        assert!(report.circular_skips.is_empty());
    }

    #[test]
    fn unresolved_mapping_value_is_reported_and_kept() {
        let set = mapped_set();
        let (tree, report) = run(&set).unwrap();
        assert_eq!(
            tree["components"]["schemas"]["Pet"]["discriminator"]["mapping"]["ghost"],
            Value::from("./animals.yaml#/Ghost")
        );
        assert_eq!(report.unresolved_mappings.len(), 1);
        assert_eq!(report.unresolved_mappings[0].tag, "ghost");
    }
}
