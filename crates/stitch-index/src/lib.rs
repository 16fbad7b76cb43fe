//! Reference catalog and document registry for stitch.
//!
//! This crate is the lookup service the bundler programs against. It knows
//! how to load a multi-file specification, catalogue every pointer in every
//! file, and answer "what does this pointer resolve to". It never rewrites
//! anything; composition lives in the `stitch` crate.
//!
//! # Crate layout
//!
//! - [`pointer`] — RFC 6901 codec, pointer splitting, [`TargetKey`].
//! - [`document`] — a parsed file ([`Document`]) and its [`Format`].
//! - [`locate`] — best-effort line/column lookup inside raw source.
//! - [`catalog`] — per-file [`ReferenceCatalog`] of pointer occurrences.
//! - [`loader`] — the [`Loader`] trait with filesystem and in-memory impls.
//! - [`registry`] — the [`Registry`] trait and the [`DocumentSet`] impl.
//! - [`error`] — the [`IndexError`] enum returned by all fallible calls.

pub mod catalog;
pub mod document;
pub mod error;
pub mod loader;
pub mod locate;
pub mod pointer;
pub mod registry;

pub use catalog::{MappingOccurrence, RefOccurrence, ReferenceCatalog};
pub use document::{Document, Format};
pub use error::IndexError;
pub use loader::{FsLoader, Loader, MemoryLoader};
pub use locate::Position;
pub use pointer::{REF_KEY, TargetKey};
pub use registry::{DocumentSet, Registry, ResolvedRef};
