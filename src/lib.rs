//! stitch library crate: bundle a multi-file OpenAPI specification into one
//! self-contained document.
//!
//! The primary interface is the `stitch` binary. This crate exposes the
//! bundling engine so that other tools (and the integration tests) can run
//! it directly.
//!
//! Two strategies are offered:
//!
//! - **inline** replaces every pointer into another file with a copy of its
//!   target.
//! - **compose** lifts each external target into the root's `components`
//!   section under a collision-free name and redirects every pointer to it.
//!
//! ```no_run
//! use stitch::config::BundleConfig;
//!
//! let root = std::fs::read("specs/openapi.yaml")?;
//! let mut config = BundleConfig::default();
//! config.source.base_dir = Some("specs".into());
//! let bundled = stitch::bundle_compose(&root, &config)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! File lookup, pointer parsing, and reference catalogues live in the
//! `stitch-index` crate, re-exported here as [`index`].

pub mod bundle;
pub mod cancel;
pub mod config;
pub mod error;
pub mod model;

pub use stitch_index as index;

pub use bundle::{BundleOutput, Bundler, bundle_compose, bundle_compose_with_origins, bundle_inline};
pub use cancel::CancellationToken;
pub use config::BundleConfig;
pub use error::BundleError;
pub use model::origin::{ComponentOrigin, OriginMap};
pub use model::report::BundleReport;
