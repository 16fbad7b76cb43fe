//! Multi-file bundling pipeline.
//!
//! Implements the walk → lift → rewrite → render pipeline. Each phase is a
//! separate module:
//!
//! - **walk**: Discover every external target reachable from the root ([`walk`]).
//! - **lift**: Classify, name, and place each target ([`lift`], [`classify`], [`namer`]).
//! - **mapping**: Pull discriminator mapping targets into the walk ([`mapping`]).
//! - **rewrite**: Redirect every pointer to its final location ([`rewrite`]).
//! - **inline**: The alternative to lift + rewrite: expand targets in place ([`inline`]).
//! - **render**: Serialize in the root's own format ([`render`]).
//!
//! [`session::Bundler`] sequences the phases; the free functions below are
//! one-shot conveniences over it.
//!
//! # Determinism
//!
//! The same inputs and configuration always produce byte-identical output:
//!
//! - Files are enumerated in path order, pointers in document order.
//! - The walk is breadth-first over an ordered queue.
//! - Collision suffixes are derived from paths, never from clocks or
//!   process-level randomness.

pub mod classify;
pub mod inline;
pub mod lift;
pub mod mapping;
pub mod namer;
pub mod render;
pub mod resolve;
pub mod rewrite;
pub mod session;
pub mod validate;
pub mod walk;

use crate::config::BundleConfig;
use crate::error::BundleError;
use crate::model::origin::OriginMap;

pub use session::{BundleOutput, Bundler};

/// Inline every external pointer of `bytes`, reading files from disk.
///
/// # Errors
/// Any [`BundleError`].
pub fn bundle_inline(bytes: &[u8], config: &BundleConfig) -> Result<Vec<u8>, BundleError> {
    Bundler::new(config.clone()).inline(bytes).map(|out| out.bytes)
}

/// Compose `bytes` into a single document, reading files from disk.
///
/// # Errors
/// Any [`BundleError`].
pub fn bundle_compose(bytes: &[u8], config: &BundleConfig) -> Result<Vec<u8>, BundleError> {
    Bundler::new(config.clone()).compose(bytes).map(|out| out.bytes)
}

/// Like [`bundle_compose`], also returning where each component came from.
///
/// # Errors
/// Any [`BundleError`].
pub fn bundle_compose_with_origins(
    bytes: &[u8],
    config: &BundleConfig,
) -> Result<(Vec<u8>, OriginMap), BundleError> {
    Bundler::new(config.clone())
        .compose_with_origins(bytes)
        .map(|out| (out.bytes, out.origins))
}
