//! # Path Model — Tree Locations as Segment Sequences
//!
//! A [`TreePath`] identifies one location in a JSON-shaped tree as an
//! ordered sequence of [`Segment`]s: property names for mappings, numeric
//! indices for sequences.
//!
//! ## Rendering
//!
//! Paths render to the dotted/bracketed form used as violation-map keys:
//! keys are joined with `.`, a key whose text contains `.` is wrapped in
//! `[...]` to keep the rendering unambiguous, and index segments are always
//! bracketed (`tags[1]`). A bracket absorbs the `.` that would otherwise
//! precede it, so `a.[0]` never appears.
//!
//! Known ambiguity: a key containing literal `[` or `]` characters is
//! not escaped.
//!
//! ## Relative parsing
//!
//! [`TreePath::parse`] resolves a path expression against a current path.
//! A leading run of `.` characters is an ascent count: `k` dots mean
//! "drop the last `k` segments of the current path, then resolve the
//! remainder from there". No leading dots means the expression is absolute
//! from the root. Ascending past the root saturates at the root.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One step in a [`TreePath`]: a mapping key or a sequence index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Segment {
    /// A property name in a keyed mapping.
    Key(String),
    /// A position in a sequence.
    Index(usize),
}

impl From<&str> for Segment {
    fn from(key: &str) -> Self {
        Segment::Key(key.to_owned())
    }
}

impl From<String> for Segment {
    fn from(key: String) -> Self {
        Segment::Key(key)
    }
}

impl From<usize> for Segment {
    fn from(index: usize) -> Self {
        Segment::Index(index)
    }
}

/// An absolute location in a value tree.
///
/// The empty path addresses the root value itself. Paths are cheap to
/// extend ([`TreePath::child`], [`TreePath::index`]) and render to the
/// string form used as violation-map keys via `Display`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TreePath(Vec<Segment>);

impl TreePath {
    /// The empty path, addressing the root value.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Build a path from a segment sequence.
    pub fn from_segments(segments: Vec<Segment>) -> Self {
        Self(segments)
    }

    /// The segments of this path, outermost first.
    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for the root path.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Extend with a mapping key, returning the new path.
    pub fn child(&self, key: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(Segment::Key(key.into()));
        Self(segments)
    }

    /// Extend with a sequence index, returning the new path.
    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push(Segment::Index(index));
        Self(segments)
    }

    /// Split off the final segment, yielding the containing path and the
    /// segment addressing this location within it. `None` for the root.
    pub fn split_last(&self) -> Option<(TreePath, Segment)> {
        let (last, init) = self.0.split_last()?;
        Some((Self(init.to_vec()), last.clone()))
    }

    /// Resolve a path expression against the current path.
    ///
    /// A leading run of `.` characters ascends that many levels from
    /// `current` (saturating at the root); the remainder is tokenized into
    /// segments using two patterns: a dot-delimited run of characters not
    /// containing `.` or `[`, or a bracket-delimited run of characters not
    /// containing `]`. With no leading dots the result is absolute.
    ///
    /// Tokens that are canonical decimal indices (all digits, no redundant
    /// leading zero) become [`Segment::Index`]; everything else is a key.
    pub fn parse(expr: &str, current: &TreePath) -> TreePath {
        let ascent = expr.chars().take_while(|c| *c == '.').count();
        let rest = &expr[ascent..];

        let mut segments = if ascent > 0 {
            let keep = current.0.len().saturating_sub(ascent);
            current.0[..keep].to_vec()
        } else {
            Vec::new()
        };

        let mut token = String::new();
        let mut chars = rest.chars();
        while let Some(c) = chars.next() {
            match c {
                '.' => {
                    push_token(&mut segments, &token);
                    token.clear();
                }
                '[' => {
                    push_token(&mut segments, &token);
                    token.clear();
                    let mut inner = String::new();
                    for c in chars.by_ref() {
                        if c == ']' {
                            break;
                        }
                        inner.push(c);
                    }
                    push_token(&mut segments, &inner);
                }
                _ => token.push(c),
            }
        }
        push_token(&mut segments, &token);

        TreePath(segments)
    }
}

/// Append one non-empty token as a segment.
///
/// A token is an index only in canonical decimal form; `007` stays a key
/// so that mapping lookups of such names keep working.
fn push_token(segments: &mut Vec<Segment>, token: &str) {
    if token.is_empty() {
        return;
    }
    let canonical_index =
        token.bytes().all(|b| b.is_ascii_digit()) && (token == "0" || !token.starts_with('0'));
    if canonical_index {
        if let Ok(index) = token.parse::<usize>() {
            segments.push(Segment::Index(index));
            return;
        }
    }
    segments.push(Segment::Key(token.to_owned()));
}

impl fmt::Display for TreePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for segment in &self.0 {
            match segment {
                Segment::Index(i) => write!(f, "[{i}]")?,
                Segment::Key(k) if k.contains('.') => write!(f, "[{k}]")?,
                Segment::Key(k) => {
                    if !first {
                        f.write_str(".")?;
                    }
                    f.write_str(k)?;
                }
            }
            first = false;
        }
        Ok(())
    }
}

impl FromIterator<Segment> for TreePath {
    fn from_iter<I: IntoIterator<Item = Segment>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
