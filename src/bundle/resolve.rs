//! Pointer resolution with base-file fallback.

use std::path::Path;

use stitch_index::pointer::split;
use stitch_index::{IndexError, Registry, ResolvedRef};

/// Resolve `raw` as written in `owner`.
///
/// The owner's own directory is always tried first. Pointers with a file
/// part are then retried against the root and every other loaded file,
/// since authors sometimes write paths relative to the root document
/// rather than to the file they are in. The owner's error is returned when
/// every base fails.
///
/// # Errors
/// The [`IndexError`] from resolving against `owner`.
pub fn resolve<'r>(
    registry: &'r dyn Registry,
    raw: &str,
    owner: &Path,
) -> Result<ResolvedRef<'r>, IndexError> {
    let first = match registry.resolve_pointer(raw, owner) {
        Ok(resolved) => return Ok(resolved),
        Err(e @ IndexError::External { .. }) => return Err(e),
        Err(e) => e,
    };
    if split(raw).is_local() {
        return Err(first);
    }
    let root = registry.root();
    let bases = std::iter::once(root).chain(registry.files().into_iter().filter(|f| *f != root));
    for base in bases {
        if base == owner {
            continue;
        }
        if let Ok(resolved) = registry.resolve_pointer(raw, base) {
            return Ok(resolved);
        }
    }
    Err(first)
}
