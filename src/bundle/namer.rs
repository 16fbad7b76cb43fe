//! Collision-free naming for lifted components.
//!
//! Root-document names always win. A lifted component whose candidate name
//! is already taken in its category gets a suffix derived from where it came
//! from:
//!
//! - **fragment targets** (`pet.yaml#/Pet`): the evolving name is split on
//!   the delimiter. One segment gets the source file stem (`Pet__pet`), two
//!   segments get a counter (`Pet__pet__1`), three segments with a numeric
//!   tail count up (`Pet__pet__2`, ...).
//! - **whole-file targets** (`models/pet.yaml`): the nearest parent
//!   directory names, innermost first (`pet__models`, then the next one up).
//!
//! If those run out, a short tag is drawn from a generator seeded with a
//! hash of the source path, so the same inputs always produce the same name.

use std::path::{Component, Path};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use sha2::{Digest, Sha256};
use stitch_index::pointer::file_stem;

const MAX_ATTEMPTS: usize = 1000;
const TAG_LEN: usize = 6;
const TAG_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Where a candidate name was lifted from.
#[derive(Clone, Copy, Debug)]
pub struct NameSource<'a> {
    /// The owning file.
    pub file: &'a Path,
    /// `true` when the target is a fragment rather than a whole file.
    pub has_fragment: bool,
}

/// Pick a name for `candidate` that `taken` rejects.
///
/// Returns `candidate` unchanged when it is free.
pub fn assign_name(
    candidate: &str,
    source: NameSource<'_>,
    delimiter: &str,
    taken: impl Fn(&str) -> bool,
) -> String {
    if !taken(candidate) {
        return candidate.to_owned();
    }

    let stem = match file_stem(source.file) {
        s if s.is_empty() => "ref".to_owned(),
        s => s,
    };
    let dirs = parent_dirs(source.file);

    let mut name = candidate.to_owned();
    for attempt in 1..=MAX_ATTEMPTS {
        name = if source.has_fragment {
            next_fragment_name(&name, &stem, delimiter)
        } else if let Some(dir) = dirs.len().checked_sub(attempt).map(|i| &dirs[i]) {
            format!("{candidate}{delimiter}{dir}")
        } else {
            format!("{candidate}{delimiter}{}", seeded_tag(source.file, attempt))
        };
        if !taken(&name) {
            return name;
        }
    }

    // Counters exhausted; seeded tags differ per attempt.
    let mut attempt = MAX_ATTEMPTS;
    loop {
        attempt += 1;
        let name = format!("{candidate}{delimiter}{}", seeded_tag(source.file, attempt));
        if !taken(&name) {
            return name;
        }
    }
}

/// The next fragment name after `name` was taken.
fn next_fragment_name(name: &str, stem: &str, delimiter: &str) -> String {
    let segments: Vec<&str> = if delimiter.is_empty() {
        vec![name]
    } else {
        name.split(delimiter).collect()
    };
    match segments.as_slice() {
        [_, _] => format!("{name}{delimiter}1"),
        [a, b, last] => match last.parse::<u64>() {
            Ok(n) => format!("{a}{delimiter}{b}{delimiter}{}", n + 1),
            Err(_) => format!("{name}{delimiter}{stem}"),
        },
        _ => format!("{name}{delimiter}{stem}"),
    }
}

fn parent_dirs(file: &Path) -> Vec<String> {
    file.parent()
        .map(|p| {
            p.components()
                .filter_map(|c| match c {
                    Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

fn seeded_tag(file: &Path, attempt: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(file.to_string_lossy().as_bytes());
    hasher.update(b"\n");
    hasher.update(attempt.to_le_bytes());
    let seed: [u8; 32] = hasher.finalize().into();
    let mut rng = StdRng::from_seed(seed);
    (0..TAG_LEN)
        .map(|_| char::from(*TAG_ALPHABET.choose(&mut rng).unwrap_or(&b'x')))
        .collect()
}
