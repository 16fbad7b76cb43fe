//! Shared test helpers for stitch integration tests.
//!
//! All tests use temp directories; each test writes its own spec tree via
//! [`SpecTree`].

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use serde_yaml::Value;
use stitch::config::{BundleConfig, SourceConfig};
use stitch::{BundleError, BundleOutput, Bundler};
use tempfile::TempDir;

/// A multi-file specification written to a temp directory.
pub struct SpecTree {
    dir: TempDir,
    root: String,
}

impl SpecTree {
    /// A tree whose root document is `root` (relative path).
    pub fn new(root: &str) -> Self {
        Self {
            dir: TempDir::new().expect("failed to create temp dir"),
            root: root.to_owned(),
        }
    }

    /// Write `contents` at `rel`, creating parent directories.
    pub fn file(self, rel: &str, contents: &str) -> Self {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("failed to create dirs");
        }
        std::fs::write(&path, contents).expect("failed to write file");
        self
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn root_path(&self) -> PathBuf {
        self.dir.path().join(&self.root)
    }

    pub fn root_bytes(&self) -> Vec<u8> {
        std::fs::read(self.root_path()).expect("failed to read root")
    }

    pub fn config(&self) -> BundleConfig {
        let root = self.root_path();
        BundleConfig {
            source: SourceConfig {
                base_dir: root.parent().map(Path::to_path_buf),
                spec_file: PathBuf::from(root.file_name().expect("root has a file name")),
            },
            ..BundleConfig::default()
        }
    }

    pub fn bundler(&self) -> Bundler {
        Bundler::new(self.config())
    }

    pub fn compose(&self) -> Result<BundleOutput, BundleError> {
        self.bundler().compose_with_origins(&self.root_bytes())
    }

    pub fn inline(&self) -> Result<BundleOutput, BundleError> {
        self.bundler().inline(&self.root_bytes())
    }
}

/// Parse bundled bytes back into a tree.
pub fn parse(bytes: &[u8]) -> Value {
    serde_yaml::from_slice(bytes).expect("bundle is not valid YAML/JSON")
}

/// Every `$ref` string in `tree`, skipping `x-` extensions.
pub fn refs(tree: &Value) -> Vec<String> {
    fn visit(node: &Value, out: &mut Vec<String>) {
        match node {
            Value::Mapping(map) => {
                for (k, v) in map {
                    match k.as_str() {
                        Some("$ref") => {
                            if let Some(s) = v.as_str() {
                                out.push(s.to_owned());
                            }
                        }
                        Some(k) if k.starts_with("x-") => {}
                        _ => visit(v, out),
                    }
                }
            }
            Value::Sequence(seq) => seq.iter().for_each(|v| visit(v, out)),
            _ => {}
        }
    }
    let mut out = Vec::new();
    visit(tree, &mut out);
    out
}

/// Names under `components.<section>`, in document order.
pub fn component_names(tree: &Value, section: &str) -> Vec<String> {
    tree["components"][section]
        .as_mapping()
        .map(|m| m.keys().filter_map(|k| k.as_str().map(str::to_owned)).collect())
        .unwrap_or_default()
}
