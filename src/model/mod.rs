//! Bundler data model: component categories, the composition table, the
//! per-category symbol tables, origin records, and the run report.

pub mod category;
pub mod origin;
pub mod record;
pub mod report;
pub mod symbols;
