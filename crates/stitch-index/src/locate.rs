//! Best-effort source positions.
//!
//! The parsed tree does not carry marks, so positions are recovered from the
//! raw text by following the fragment's tokens through block-indented YAML.
//! Flow-style YAML and JSON fall back to a sequential quoted-key search.
//! Positions are 1-based. `None` means the location could not be recovered;
//! callers report it as unknown rather than failing.

use std::fmt;

use crate::document::Format;

/// A 1-based line/column pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    /// 1-based line number.
    pub line: usize,
    /// 1-based column number.
    pub column: usize,
}

impl Position {
    /// The start of a file.
    pub const START: Self = Self { line: 1, column: 1 };
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Find the position of the node addressed by `tokens` (unescaped) in `source`.
#[must_use]
pub fn locate(source: &str, format: Format, tokens: &[String]) -> Option<Position> {
    if tokens.is_empty() {
        return Some(Position::START);
    }
    match format {
        Format::Yaml => locate_block(source, tokens).or_else(|| locate_flow(source, tokens)),
        Format::Json => locate_flow(source, tokens),
    }
}

// ---------------------------------------------------------------------------
// Block YAML
// ---------------------------------------------------------------------------

/// A significant line, with any leading `- ` sequence markers peeled off.
struct LineInfo<'a> {
    raw_indent: usize,
    key_col: usize,
    dashes: usize,
    content: &'a str,
}

fn scan_line(raw: &str) -> Option<LineInfo<'_>> {
    let trimmed = raw.trim_start_matches(' ');
    let raw_indent = raw.len() - trimmed.len();
    if trimmed.is_empty()
        || trimmed.starts_with('#')
        || trimmed.starts_with("---")
        || trimmed.starts_with("...")
    {
        return None;
    }
    let mut rest = trimmed;
    let mut key_col = raw_indent;
    let mut dashes = 0;
    loop {
        if rest == "-" {
            dashes += 1;
            key_col += 1;
            rest = "";
            break;
        }
        let Some(after) = rest.strip_prefix("- ") else {
            break;
        };
        let inner = after.trim_start_matches(' ');
        key_col += rest.len() - inner.len();
        rest = inner;
        dashes += 1;
    }
    Some(LineInfo {
        raw_indent,
        key_col,
        dashes,
        content: rest,
    })
}

fn key_matches(content: &str, key: &str) -> bool {
    let rest = ['"', '\'']
        .iter()
        .find_map(|q| {
            content
                .strip_prefix(*q)
                .and_then(|r| r.strip_prefix(key))
                .and_then(|r| r.strip_prefix(*q))
        })
        .or_else(|| content.strip_prefix(key));
    let Some(rest) = rest else {
        return false;
    };
    rest.trim_start_matches(' ')
        .strip_prefix(':')
        .is_some_and(|r| r.is_empty() || r.starts_with([' ', '\t']))
}

/// The region of lines that make up one node's children.
#[derive(Clone, Copy)]
struct Scope {
    first: usize,
    /// The first line is a sequence item whose inline content belongs here.
    inline_first: bool,
    /// Lines must be indented deeper than this (or be `- ` items at `dash_ok_at`).
    parent: Option<usize>,
    dash_ok_at: Option<usize>,
}

impl Scope {
    fn admits(&self, line: usize, info: &LineInfo<'_>) -> bool {
        if line == self.first && self.inline_first {
            return true;
        }
        match self.parent {
            None => true,
            Some(p) => info.raw_indent > p || (info.dashes > 0 && self.dash_ok_at == Some(info.raw_indent)),
        }
    }
}

fn locate_block(source: &str, tokens: &[String]) -> Option<Position> {
    let lines: Vec<&str> = source.lines().collect();
    let mut scope = Scope {
        first: 0,
        inline_first: false,
        parent: None,
        dash_ok_at: None,
    };
    let mut found = None;

    for token in tokens {
        let first_info = (scope.first..lines.len())
            .find_map(|i| scan_line(lines[i]).map(|info| (i, info)))?;
        let is_sequence = first_info.1.dashes > 0
            && !(first_info.0 == scope.first && scope.inline_first)
            && token.parse::<usize>().is_ok();

        let (line, col, next) = if is_sequence {
            find_item(&lines, scope, token.parse().ok()?)?
        } else {
            find_key(&lines, scope, token)?
        };
        found = Some(Position {
            line: line + 1,
            column: col + 1,
        });
        scope = next;
    }
    found
}

fn find_key(lines: &[&str], scope: Scope, key: &str) -> Option<(usize, usize, Scope)> {
    let mut child_col = None;
    for (i, raw) in lines.iter().enumerate().skip(scope.first) {
        let Some(info) = scan_line(raw) else {
            continue;
        };
        if !scope.admits(i, &info) {
            break;
        }
        match child_col {
            None => child_col = Some(info.key_col),
            Some(c) if c != info.key_col => continue,
            Some(_) => {}
        }
        if key_matches(info.content, key) {
            let next = Scope {
                first: i + 1,
                inline_first: false,
                parent: Some(info.key_col),
                dash_ok_at: Some(info.key_col),
            };
            return Some((i, info.key_col, next));
        }
    }
    None
}

fn find_item(lines: &[&str], scope: Scope, index: usize) -> Option<(usize, usize, Scope)> {
    let mut dash_col = None;
    let mut count = 0;
    for (i, raw) in lines.iter().enumerate().skip(scope.first) {
        let Some(info) = scan_line(raw) else {
            continue;
        };
        if !scope.admits(i, &info) {
            break;
        }
        if info.dashes == 0 {
            continue;
        }
        match dash_col {
            None => dash_col = Some(info.raw_indent),
            Some(c) if c != info.raw_indent => continue,
            Some(_) => {}
        }
        if count == index {
            let next = Scope {
                first: i,
                inline_first: true,
                parent: Some(info.raw_indent),
                dash_ok_at: None,
            };
            return Some((i, info.raw_indent, next));
        }
        count += 1;
    }
    None
}

// ---------------------------------------------------------------------------
// Flow YAML / JSON
// ---------------------------------------------------------------------------

fn locate_flow(source: &str, tokens: &[String]) -> Option<Position> {
    let mut offset = 0;
    let mut hit = None;
    for token in tokens {
        let needle = format!("\"{token}\"");
        let mut search = offset;
        let mut matched = None;
        while let Some(rel) = source[search..].find(&needle) {
            let at = search + rel;
            let after = source[at + needle.len()..].trim_start();
            if after.starts_with(':') {
                matched = Some(at);
                break;
            }
            search = at + needle.len();
        }
        match matched {
            Some(at) => {
                hit = Some(at);
                offset = at + needle.len();
            }
            None if token.parse::<usize>().is_ok() => {}
            None => return None,
        }
    }
    hit.map(|at| position_of_offset(source, at))
}

fn position_of_offset(source: &str, offset: usize) -> Position {
    let before = &source[..offset];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    Position {
        line,
        column: before[line_start..].chars().count() + 1,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
