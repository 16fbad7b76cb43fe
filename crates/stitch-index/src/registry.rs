//! The document set and the [`Registry`] lookup trait.
//!
//! [`Registry`] is the seam between the bundler and everything that knows
//! about files. The bundler only ever asks three kinds of question:
//!
//! 1. *Resolve*: given a raw pointer and the file it appears in, which node
//!    does it land on, and under which fully-qualified [`TargetKey`]?
//! 2. *Enumerate*: which files exist, and what pointers does each contain?
//! 3. *Circularity*: can this target reach itself through pointers?
//!
//! [`DocumentSet`] answers them for a root document plus every file reachable
//! from it. Files that fail to load are remembered, not fatal: the failure
//! surfaces only when something actually resolves into that file, so an
//! advisory pointer to a missing file does not sink the whole set.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::{Path, PathBuf};

use serde_yaml::Value;
use tracing::{debug, instrument};

use crate::catalog::ReferenceCatalog;
use crate::document::Document;
use crate::error::IndexError;
use crate::loader::Loader;
use crate::pointer::{TargetKey, is_external, navigate, normalize_path, resolve_file, split};

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// A successfully resolved pointer.
#[derive(Clone, Debug)]
pub struct ResolvedRef<'a> {
    /// The fully-qualified target.
    pub key: TargetKey,
    /// The node the pointer lands on.
    pub node: &'a Value,
}

/// Lookup service over a set of parsed files.
pub trait Registry {
    /// Identity of the root document.
    fn root(&self) -> &Path;

    /// Every loaded file, sorted by path.
    fn files(&self) -> Vec<&Path>;

    /// The parsed document for `file`.
    fn document(&self, file: &Path) -> Option<&Document>;

    /// The reference catalog for `file`.
    fn catalog(&self, file: &Path) -> Option<&ReferenceCatalog>;

    /// Find the node at `fragment` inside one file.
    fn find_component(&self, file: &Path, fragment: &str) -> Option<&Value>;

    /// Resolve `raw` as written in `source`.
    ///
    /// # Errors
    /// - [`IndexError::External`] for absolute URLs and URNs.
    /// - [`IndexError::FileNotFound`] / [`IndexError::FileUnavailable`] when
    ///   the file part names nothing loadable.
    /// - [`IndexError::FragmentNotFound`] when the fragment is missing.
    fn resolve_pointer(&self, raw: &str, source: &Path) -> Result<ResolvedRef<'_>, IndexError>;

    /// `true` when `key` can reach itself through pointers in its subtree.
    fn is_circular(&self, key: &TargetKey) -> bool;
}

// ---------------------------------------------------------------------------
// DocumentSet
// ---------------------------------------------------------------------------

/// A root document plus every file reachable from it.
#[derive(Debug)]
pub struct DocumentSet {
    root: PathBuf,
    documents: BTreeMap<PathBuf, Document>,
    catalogs: BTreeMap<PathBuf, ReferenceCatalog>,
    failures: BTreeMap<PathBuf, String>,
    circular: BTreeSet<TargetKey>,
}

impl DocumentSet {
    /// Parse `root_source` as the root document with identity `root`, then
    /// load, breadth-first, every file reachable through a `$ref` or a
    /// discriminator mapping value. Each pointer's file part is tried
    /// relative to its own file, and relative to the root only when that
    /// fails to load.
    ///
    /// # Errors
    /// Returns [`IndexError::Parse`] if the root document itself is invalid.
    /// Failures in other files are recorded and reported on resolution.
    #[instrument(skip_all, fields(root = %root.display()))]
    pub fn load(root: &Path, root_source: String, loader: &dyn Loader) -> Result<Self, IndexError> {
        let root = normalize_path(root);
        let root_doc = Document::parse(root.clone(), root_source)?;
        let mut set = Self {
            root,
            documents: BTreeMap::new(),
            catalogs: BTreeMap::new(),
            failures: BTreeMap::new(),
            circular: BTreeSet::new(),
        };

        let mut queue = VecDeque::new();
        let mut fallbacks = Vec::new();
        set.insert(root_doc, &mut queue, &mut fallbacks);
        loop {
            while let Some(path) = queue.pop_front() {
                if set.is_known(&path) {
                    continue;
                }
                match loader
                    .load(&path)
                    .and_then(|source| Document::parse(path.clone(), source))
                {
                    Ok(doc) => set.insert(doc, &mut queue, &mut fallbacks),
                    Err(e) => {
                        debug!(file = %path.display(), error = %e, "file unavailable");
                        set.failures.insert(path, e.to_string());
                    }
                }
            }

            // Root-relative candidates are only tried for pointers whose
            // own-file candidate did not load.
            queue.extend(
                std::mem::take(&mut fallbacks)
                    .into_iter()
                    .filter(|(primary, fallback)| {
                        !set.documents.contains_key(primary) && !set.is_known(fallback)
                    })
                    .map(|(_, fallback)| fallback),
            );
            if queue.is_empty() {
                break;
            }
        }

        set.circular = set.compute_circular();
        debug!(
            files = set.documents.len(),
            failures = set.failures.len(),
            circular = set.circular.len(),
            "document set loaded"
        );
        Ok(set)
    }

    /// Files that were discovered but could not be loaded, with reasons.
    #[must_use]
    pub const fn failures(&self) -> &BTreeMap<PathBuf, String> {
        &self.failures
    }

    /// Number of loaded files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// `true` when nothing is loaded (never the case after a successful load).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn is_known(&self, path: &Path) -> bool {
        self.documents.contains_key(path) || self.failures.contains_key(path)
    }

    fn insert(
        &mut self,
        doc: Document,
        queue: &mut VecDeque<PathBuf>,
        fallbacks: &mut Vec<(PathBuf, PathBuf)>,
    ) {
        let catalog = ReferenceCatalog::build(&doc);
        let id = doc.id().to_owned();

        let structural = catalog.refs().iter().map(|occ| occ.raw.as_str());
        let advisory = catalog
            .mappings()
            .iter()
            .map(|occ| occ.raw.as_str())
            .filter(|raw| looks_like_file_pointer(raw));

        for raw in structural.chain(advisory) {
            if let Some(file) = file_part(raw) {
                let primary = resolve_file(&id, file);
                let fallback = resolve_file(&self.root, file);
                if fallback != primary {
                    fallbacks.push((primary.clone(), fallback));
                }
                queue.push_back(primary);
            }
        }

        self.catalogs.insert(id.clone(), catalog);
        self.documents.insert(id, doc);
    }

    /// Mark every target that can reach itself.
    fn compute_circular(&self) -> BTreeSet<TargetKey> {
        let mut nodes: Vec<TargetKey> = Vec::new();
        let mut ids: BTreeMap<TargetKey, usize> = BTreeMap::new();

        for catalog in self.catalogs.values() {
            for occ in catalog.refs() {
                if let Ok(resolved) = self.resolve_pointer(&occ.raw, &occ.file) {
                    intern(&mut nodes, &mut ids, resolved.key);
                }
            }
        }

        let mut edges: Vec<Vec<usize>> = Vec::new();
        let mut next = 0;
        while next < nodes.len() {
            let key = nodes[next].clone();
            let tokens = key.tokens();
            let mut out = Vec::new();
            if let Some(catalog) = self.catalogs.get(key.file()) {
                for occ in catalog.refs_within(&tokens) {
                    if let Ok(resolved) = self.resolve_pointer(&occ.raw, &occ.file) {
                        out.push(intern(&mut nodes, &mut ids, resolved.key));
                    }
                }
            }
            edges.push(out);
            next += 1;
        }

        cyclic_nodes(&edges)
            .into_iter()
            .zip(nodes)
            .filter_map(|(cyclic, key)| cyclic.then_some(key))
            .collect()
    }
}

impl Registry for DocumentSet {
    fn root(&self) -> &Path {
        &self.root
    }

    fn files(&self) -> Vec<&Path> {
        self.documents.keys().map(PathBuf::as_path).collect()
    }

    fn document(&self, file: &Path) -> Option<&Document> {
        self.documents.get(file)
    }

    fn catalog(&self, file: &Path) -> Option<&ReferenceCatalog> {
        self.catalogs.get(file)
    }

    fn find_component(&self, file: &Path, fragment: &str) -> Option<&Value> {
        let doc = self.documents.get(file)?;
        navigate(doc.tree(), &crate::pointer::tokens(fragment))
    }

    fn resolve_pointer(&self, raw: &str, source: &Path) -> Result<ResolvedRef<'_>, IndexError> {
        let key = TargetKey::from_pointer(raw, source).ok_or_else(|| IndexError::External {
            pointer: raw.to_owned(),
        })?;
        if let Some(reason) = self.failures.get(key.file()) {
            return Err(IndexError::FileUnavailable {
                path: key.file().to_owned(),
                reason: reason.clone(),
            });
        }
        let doc = self
            .documents
            .get(key.file())
            .ok_or_else(|| IndexError::FileNotFound {
                path: key.file().to_owned(),
            })?;
        let node = navigate(doc.tree(), &key.tokens()).ok_or_else(|| {
            IndexError::FragmentNotFound {
                pointer: raw.to_owned(),
                file: key.file().to_owned(),
            }
        })?;
        Ok(ResolvedRef { key, node })
    }

    fn is_circular(&self, key: &TargetKey) -> bool {
        self.circular.contains(key)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn file_part(raw: &str) -> Option<&str> {
    if is_external(raw) {
        return None;
    }
    split(raw).file
}

/// Mapping values may also be bare schema names (`Dog`); only values that
/// look like paths or pointers are treated as files.
fn looks_like_file_pointer(raw: &str) -> bool {
    raw.contains('#') || raw.contains('/') || Path::new(raw).extension().is_some()
}

fn intern(nodes: &mut Vec<TargetKey>, ids: &mut BTreeMap<TargetKey, usize>, key: TargetKey) -> usize {
    if let Some(&id) = ids.get(&key) {
        return id;
    }
    let id = nodes.len();
    ids.insert(key.clone(), id);
    nodes.push(key);
    id
}

/// Tarjan's strongly connected components, iteratively. A node is cyclic
/// when its component has more than one member or it has a self edge.
fn cyclic_nodes(edges: &[Vec<usize>]) -> Vec<bool> {
    let n = edges.len();
    let mut index: Vec<Option<usize>> = vec![None; n];
    let mut low = vec![0; n];
    let mut on_stack = vec![false; n];
    let mut stack = Vec::new();
    let mut cyclic = vec![false; n];
    let mut counter = 0;

    for start in 0..n {
        if index[start].is_some() {
            continue;
        }
        index[start] = Some(counter);
        low[start] = counter;
        counter += 1;
        stack.push(start);
        on_stack[start] = true;
        let mut frames = vec![(start, 0usize)];

        while let Some((v, edge)) = frames.pop() {
            if let Some(&w) = edges[v].get(edge) {
                frames.push((v, edge + 1));
                match index[w] {
                    None => {
                        index[w] = Some(counter);
                        low[w] = counter;
                        counter += 1;
                        stack.push(w);
                        on_stack[w] = true;
                        frames.push((w, 0));
                    }
                    Some(iw) if on_stack[w] => low[v] = low[v].min(iw),
                    Some(_) => {}
                }
                continue;
            }

            if let Some(&(parent, _)) = frames.last() {
                low[parent] = low[parent].min(low[v]);
            }
            if index[v] == Some(low[v]) {
                let mut component = Vec::new();
                while let Some(w) = stack.pop() {
                    on_stack[w] = false;
                    component.push(w);
                    if w == v {
                        break;
                    }
                }
                if component.len() > 1 || edges[v].contains(&v) {
                    for w in component {
                        cyclic[w] = true;
                    }
                }
            }
        }
    }
    cyclic
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
