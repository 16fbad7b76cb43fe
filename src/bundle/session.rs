//! The bundling session: one configured run over one root document.

use std::fmt;

use stitch_index::{DocumentSet, FsLoader, Loader, Registry};
use tracing::{debug, info, instrument};

use crate::bundle::inline::Inliner;
use crate::bundle::lift::Lifter;
use crate::bundle::mapping::discover_mapping_targets;
use crate::bundle::render::render;
use crate::bundle::rewrite::Rewriter;
use crate::bundle::validate::SiblingCheck;
use crate::bundle::walk::{WorkItem, Walker};
use crate::cancel::CancellationToken;
use crate::config::BundleConfig;
use crate::error::BundleError;
use crate::model::origin::{OriginMap, OriginTracker};
use crate::model::record::CompositionTable;
use crate::model::report::BundleReport;
use crate::model::symbols::SymbolTables;

/// Pipeline stage, for log context.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Loading,
    Validating,
    Walking,
    Lifting,
    Rewriting,
    Inlining,
    Rendering,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Loading => "loading",
            Self::Validating => "validating",
            Self::Walking => "walking",
            Self::Lifting => "lifting",
            Self::Rewriting => "rewriting",
            Self::Inlining => "inlining",
            Self::Rendering => "rendering",
        };
        f.write_str(s)
    }
}

/// Which bundling strategy to run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Deep-copy every external target in place.
    Inline,
    /// Lift external targets into the root's `components`.
    Compose,
}

/// Result of a successful bundle.
#[derive(Clone, Debug, Default)]
pub struct BundleOutput {
    /// The bundled document, in the root's own format.
    pub bytes: Vec<u8>,
    /// Provenance of lifted components (compose mode with tracking only).
    pub origins: OriginMap,
    /// Soft conditions tolerated along the way.
    pub report: BundleReport,
}

/// A configured bundler. Cheap to build; each call runs independently.
pub struct Bundler {
    config: BundleConfig,
    loader: Box<dyn Loader>,
    cancel: CancellationToken,
}

impl fmt::Debug for Bundler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bundler")
            .field("config", &self.config)
            .field("cancel", &self.cancel)
            .finish_non_exhaustive()
    }
}

impl Bundler {
    /// A bundler that reads files from disk.
    #[must_use]
    pub fn new(config: BundleConfig) -> Self {
        Self {
            config,
            loader: Box::new(FsLoader),
            cancel: CancellationToken::new(),
        }
    }

    /// Use `loader` instead of the filesystem.
    #[must_use]
    pub fn with_loader(mut self, loader: impl Loader + 'static) -> Self {
        self.loader = Box::new(loader);
        self
    }

    /// Abort when `token` fires.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &BundleConfig {
        &self.config
    }

    /// Inline-mode bundle.
    ///
    /// # Errors
    /// Any [`BundleError`]; no partial output is produced.
    pub fn inline(&self, bytes: &[u8]) -> Result<BundleOutput, BundleError> {
        self.run(bytes, Mode::Inline, false)
    }

    /// Compose-mode bundle.
    ///
    /// # Errors
    /// Any [`BundleError`]; no partial output is produced.
    pub fn compose(&self, bytes: &[u8]) -> Result<BundleOutput, BundleError> {
        self.run(bytes, Mode::Compose, false)
    }

    /// Compose-mode bundle that also records where each component came from.
    ///
    /// # Errors
    /// Any [`BundleError`]; no partial output is produced.
    pub fn compose_with_origins(&self, bytes: &[u8]) -> Result<BundleOutput, BundleError> {
        self.run(bytes, Mode::Compose, true)
    }

    #[instrument(skip_all, fields(mode = ?mode, track_origins))]
    fn run(&self, bytes: &[u8], mode: Mode, track_origins: bool) -> Result<BundleOutput, BundleError> {
        self.config.validate()?;
        let source = decode(bytes)?;

        let root = self.config.source.root_identity();
        debug!(phase = %Phase::Loading, root = %root.display());
        let set = DocumentSet::load(&root, source, self.loader.as_ref())?;
        let registry: &dyn Registry = &set;

        let siblings = if self.config.composition.strict_validation {
            debug!(phase = %Phase::Validating);
            SiblingCheck::for_root(registry)
        } else {
            None
        };

        let max_depth = self.config.limits.max_depth;
        let mut report = BundleReport::default();
        let mut table = CompositionTable::new();
        let mut walker = Walker::new(registry, &self.cancel, max_depth).with_sibling_check(siblings);
        debug!(phase = %Phase::Walking);
        walker.walk(vec![WorkItem::whole_file(registry.root())], &mut table, &mut report)?;

        let root_doc = set.document(registry.root()).ok_or_else(|| BundleError::InvalidInput {
            reason: "root document missing from its own set".to_owned(),
        })?;
        let mut tree = root_doc.tree().clone();
        let mut origins = OriginTracker::new(track_origins);

        match mode {
            Mode::Inline => {
                debug!(phase = %Phase::Inlining);
                Inliner::new(registry, &self.cancel, max_depth, &self.config.composition.delimiter)
                    .inline_bundle(&mut tree, &mut report)?;
            }
            Mode::Compose => {
                let mut symbols = SymbolTables::from_root(&tree);
                let lifter = Lifter::new(registry, &self.config.composition.delimiter);
                loop {
                    debug!(phase = %Phase::Lifting, records = table.len());
                    for index in table.pending() {
                        self.cancel.check()?;
                        if let Some(record) = table.record_mut(index) {
                            lifter.lift(record, &mut symbols, &mut origins, &mut report)?;
                        }
                    }
                    let items = discover_mapping_targets(registry, &mut table, &mut walker, &mut report);
                    if items.is_empty() {
                        break;
                    }
                    debug!(phase = %Phase::Walking, mapping_targets = items.len());
                    walker.walk(items, &mut table, &mut report)?;
                }

                debug!(phase = %Phase::Rewriting);
                Rewriter::new(registry, &table, &self.cancel, max_depth)
                    .rewrite_bundle(&mut tree, &mut symbols, &mut report)?;
                info!(
                    lifted = symbols.lifted_count(),
                    files = walker.visited_files(),
                    "components lifted"
                );
                symbols.write_into(&mut tree)?;
            }
        }

        debug!(phase = %Phase::Rendering, format = ?root_doc.format());
        let bytes = render(&tree, root_doc.format())?;
        if !report.is_clean() {
            info!(
                unresolved_mappings = report.unresolved_mappings.len(),
                circular_skips = report.circular_skips.len(),
                depth_truncations = report.depth_truncations.len(),
                inline_fallbacks = report.inline_fallbacks.len(),
                "bundle completed with warnings"
            );
        }
        Ok(BundleOutput {
            bytes,
            origins: origins.into_map(),
            report,
        })
    }
}

fn decode(bytes: &[u8]) -> Result<String, BundleError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(BundleError::InvalidInput {
            reason: "document is empty".to_owned(),
        });
    }
    String::from_utf8(bytes.to_vec()).map_err(|e| BundleError::InvalidInput {
        reason: format!("not valid UTF-8: {e}"),
    })
}
