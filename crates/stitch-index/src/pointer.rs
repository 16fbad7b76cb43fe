//! Pointer codec.
//!
//! A raw pointer is the string value of a `$ref` key or of a discriminator
//! mapping entry. It has an optional file part and an optional fragment:
//!
//! - `#/components/schemas/Pet` — fragment in the same file
//! - `./pet.yaml#/Pet` — file plus fragment
//! - `./pet.yaml` — whole-file import
//! - `https://example.com/pet.yaml#/Pet`, `urn:pet` — external, never resolved
//!
//! Fragments are JSON pointers (RFC 6901): `/`-separated reference tokens in
//! which `~` is written `~0` and `/` is written `~1`.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde_yaml::Value;

/// The mapping key that marks a pointer node.
pub const REF_KEY: &str = "$ref";

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Returns `true` for `scheme://...` pointers.
#[must_use]
pub fn is_absolute_url(raw: &str) -> bool {
    let Some((scheme, _)) = raw.split_once("://") else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Returns `true` for `urn:` pointers (case-insensitive).
#[must_use]
pub fn is_urn(raw: &str) -> bool {
    raw.get(..4).is_some_and(|p| p.eq_ignore_ascii_case("urn:"))
}

/// Returns `true` if the pointer can never be resolved against local files.
#[must_use]
pub fn is_external(raw: &str) -> bool {
    is_absolute_url(raw) || is_urn(raw)
}

// ---------------------------------------------------------------------------
// Splitting
// ---------------------------------------------------------------------------

/// A raw pointer split at its first `#`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PointerParts<'a> {
    /// The file part, if non-empty.
    pub file: Option<&'a str>,
    /// The fragment after `#`, if a `#` was present.
    pub fragment: Option<&'a str>,
}

impl PointerParts<'_> {
    /// `true` when the pointer has no file part (`#/...`).
    #[must_use]
    pub const fn is_local(&self) -> bool {
        self.file.is_none()
    }

    /// `true` when the pointer carries a non-root fragment.
    #[must_use]
    pub fn has_fragment(&self) -> bool {
        self.fragment.is_some_and(|f| !normalize_fragment(f).is_empty())
    }
}

/// Split a raw pointer into its file part and fragment.
#[must_use]
pub fn split(raw: &str) -> PointerParts<'_> {
    match raw.split_once('#') {
        Some((file, fragment)) => PointerParts {
            file: (!file.is_empty()).then_some(file),
            fragment: Some(fragment),
        },
        None => PointerParts {
            file: (!raw.is_empty()).then_some(raw),
            fragment: None,
        },
    }
}

/// Normalize a fragment to either `""` (whole document) or `/token/...`.
#[must_use]
pub fn normalize_fragment(fragment: &str) -> String {
    if fragment.is_empty() || fragment == "/" {
        String::new()
    } else if fragment.starts_with('/') {
        fragment.to_owned()
    } else {
        format!("/{fragment}")
    }
}

// ---------------------------------------------------------------------------
// RFC 6901
// ---------------------------------------------------------------------------

/// Escape one reference token: `~` becomes `~0` first, then `/` becomes `~1`.
#[must_use]
pub fn escape(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

/// Reverse of [`escape`]: `~1` becomes `/` first, then `~0` becomes `~`.
#[must_use]
pub fn unescape(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

/// Split a normalized fragment into unescaped reference tokens.
#[must_use]
pub fn tokens(fragment: &str) -> Vec<String> {
    let normalized = normalize_fragment(fragment);
    if normalized.is_empty() {
        return Vec::new();
    }
    normalized[1..].split('/').map(unescape).collect()
}

/// Join unescaped tokens into a fragment (`/a/b~1c`).
#[must_use]
pub fn join(tokens: &[String]) -> String {
    tokens.iter().fold(String::new(), |mut acc, t| {
        acc.push('/');
        acc.push_str(&escape(t));
        acc
    })
}

/// Walk `tokens` down from `root`.
///
/// Mappings are indexed by key, sequences by decimal index.
#[must_use]
pub fn navigate<'a>(root: &'a Value, tokens: &[String]) -> Option<&'a Value> {
    tokens.iter().try_fold(root, |node, token| match node {
        Value::Mapping(map) => map.get(token.as_str()),
        Value::Sequence(seq) => token.parse::<usize>().ok().and_then(|i| seq.get(i)),
        Value::Tagged(tagged) => navigate(&tagged.value, std::slice::from_ref(token)),
        _ => None,
    })
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// Lexically normalize a path: drop `.` components and fold `..` into the
/// preceding normal component. The filesystem is never consulted.
#[must_use]
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(out.components().next_back(), Some(Component::Normal(_)))
                    && out.pop();
                if !popped && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Resolve a pointer's file part against the file it appears in.
#[must_use]
pub fn resolve_file(source: &Path, file_part: &str) -> PathBuf {
    let file_part = file_part.strip_prefix("file://").unwrap_or(file_part);
    let candidate = Path::new(file_part);
    if candidate.is_absolute() {
        normalize_path(candidate)
    } else {
        let base = source.parent().unwrap_or_else(|| Path::new(""));
        normalize_path(&base.join(candidate))
    }
}

/// The file stem of a path (`/a/b/pet.yaml` → `pet`).
#[must_use]
pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// TargetKey
// ---------------------------------------------------------------------------

/// A fully-qualified pointer target: normalized file identity plus a
/// normalized fragment. Two raw pointers that land on the same location
/// produce equal keys regardless of how they were written.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetKey {
    file: PathBuf,
    fragment: String,
}

impl TargetKey {
    /// Build a key from an already normalized file path and any fragment.
    #[must_use]
    pub fn new(file: impl Into<PathBuf>, fragment: &str) -> Self {
        Self {
            file: normalize_path(&file.into()),
            fragment: normalize_fragment(fragment),
        }
    }

    /// Compute the key a raw pointer refers to when it appears in `source`.
    ///
    /// Returns `None` for absolute URLs and URNs.
    #[must_use]
    pub fn from_pointer(raw: &str, source: &Path) -> Option<Self> {
        if is_external(raw) {
            return None;
        }
        let parts = split(raw);
        let file = parts
            .file
            .map_or_else(|| normalize_path(source), |f| resolve_file(source, f));
        Some(Self {
            file,
            fragment: normalize_fragment(parts.fragment.unwrap_or("")),
        })
    }

    /// The owning file.
    #[must_use]
    pub fn file(&self) -> &Path {
        &self.file
    }

    /// The normalized fragment (`""` for the whole file).
    #[must_use]
    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    /// `true` when the key addresses a whole file.
    #[must_use]
    pub fn is_whole_file(&self) -> bool {
        self.fragment.is_empty()
    }

    /// Unescaped reference tokens of the fragment.
    #[must_use]
    pub fn tokens(&self) -> Vec<String> {
        tokens(&self.fragment)
    }

    /// The fragment as a same-file pointer (`#/a/b`).
    #[must_use]
    pub fn to_local_ref(&self) -> String {
        format!("#{}", self.fragment)
    }
}

impl fmt::Display for TargetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.file.display(), self.fragment)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn classifies_external_pointers() {
        assert!(is_absolute_url("https://example.com/a.yaml#/X"));
        assert!(is_absolute_url("git+ssh://host/repo"));
        assert!(is_urn("URN:example:pet"));
        assert!(!is_external("./a.yaml#/X"));
        assert!(!is_external("#/components/schemas/Pet"));
        assert!(!is_absolute_url("c:/specs/a.yaml"));
    }

    #[test]
    fn split_handles_all_shapes() {
        let local = split("#/components/schemas/Pet");
        assert!(local.is_local());
        assert_eq!(local.fragment, Some("/components/schemas/Pet"));

        let remote = split("./pet.yaml#/Pet");
        assert_eq!(remote.file, Some("./pet.yaml"));
        assert!(remote.has_fragment());

        let whole = split("./pet.yaml");
        assert_eq!(whole.file, Some("./pet.yaml"));
        assert_eq!(whole.fragment, None);
        assert!(!whole.has_fragment());

        assert!(!split("./pet.yaml#/").has_fragment());
    }

    #[test]
    fn escape_order_matters() {
        assert_eq!(escape("Foo/Bar"), "Foo~1Bar");
        assert_eq!(escape("a~/b"), "a~0~1b");
        assert_eq!(unescape("a~01"), "a~1");
        assert_eq!(tokens("/components/schemas/Foo~1Bar"), vec![
            "components".to_owned(),
            "schemas".to_owned(),
            "Foo/Bar".to_owned()
        ]);
    }

    #[test]
    fn normalize_path_folds_dots() {
        assert_eq!(
            normalize_path(Path::new("/specs/./a/../b/c.yaml")),
            PathBuf::from("/specs/b/c.yaml")
        );
        assert_eq!(normalize_path(Path::new("../x.yaml")), PathBuf::from("../x.yaml"));
        assert_eq!(normalize_path(Path::new("/../x.yaml")), PathBuf::from("/x.yaml"));
    }

    #[test]
    fn target_keys_converge_across_spellings() {
        let root = Path::new("/specs/openapi.yaml");
        let a = TargetKey::from_pointer("./models/pet.yaml#/Pet", root).unwrap();
        let b = TargetKey::from_pointer("models/../models/pet.yaml#Pet", root).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "/specs/models/pet.yaml#/Pet");

        let nested = Path::new("/specs/models/pet.yaml");
        let c = TargetKey::from_pointer("#/Pet", nested).unwrap();
        assert_eq!(a, c);

        assert!(TargetKey::from_pointer("https://x.io/a.yaml", root).is_none());
    }

    #[test]
    fn navigate_walks_mappings_and_sequences() {
        let doc: Value = serde_yaml::from_str("a:\n  - b: 1\n  - c:\n      d~e: 2\n").unwrap();
        let found = navigate(&doc, &tokens("/a/1/c/d~0e")).unwrap();
        assert_eq!(found, &Value::from(2));
        assert!(navigate(&doc, &tokens("/a/7")).is_none());
        assert!(navigate(&doc, &tokens("/missing")).is_none());
    }

    proptest! {
        #[test]
        fn escape_round_trips(token in ".*") {
            prop_assert_eq!(unescape(&escape(&token)), token.clone());
            prop_assert!(!escape(&token).contains('/'));
        }

        #[test]
        fn join_then_tokens_round_trips(parts in proptest::collection::vec("[a-zA-Z0-9~/ _-]{1,8}", 1..5)) {
            let fragment = join(&parts);
            prop_assert_eq!(tokens(&fragment), parts);
        }
    }
}
