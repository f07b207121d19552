//! # Error Types — Violation Taxonomy and the Error Sink
//!
//! Every directive failure is recorded as a tag at a rendered path, never
//! raised mid-walk; sibling properties keep being checked after one fails.
//! Only the entry point converts a non-empty sink into [`NormalizeError`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::path::TreePath;

/// Kind of a single recorded violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// `_type`: the value's runtime type is not among the declared tags.
    InvalidType,
    /// `_any` or `_passes`: the value was rejected.
    InvalidValue,
    /// `_requires`: the referenced location does not exist in the root.
    MissingRequirement,
    /// `_required`: a schema-declared property is absent.
    Required,
}

impl ErrorKind {
    /// The snake_case wire tag for this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidType => "invalid_type",
            ErrorKind::InvalidValue => "invalid_value",
            ErrorKind::MissingRequirement => "missing_requirement",
            ErrorKind::Required => "required",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accumulated violations for one whole walk: rendered path → kind.
///
/// Each property is evaluated once per walk, so paths are unique. The map
/// is ordered by path so rendering is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Violations {
    violations: BTreeMap<String, ErrorKind>,
}

impl Violations {
    /// An empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a violation at a path.
    pub fn record(&mut self, path: &TreePath, kind: ErrorKind) {
        self.violations.insert(path.to_string(), kind);
    }

    /// Look up the violation recorded at a rendered path.
    pub fn get(&self, path: &str) -> Option<ErrorKind> {
        self.violations.get(path).copied()
    }

    /// Number of recorded violations.
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// True when no violation has been recorded.
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Iterate over `(rendered path, kind)` pairs in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, ErrorKind)> {
        self.violations.iter().map(|(path, kind)| (path.as_str(), *kind))
    }

    /// Consume the sink, yielding the underlying map.
    pub fn into_inner(self) -> BTreeMap<String, ErrorKind> {
        self.violations
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (path, kind)) in self.violations.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            let shown = if path.is_empty() { "(root)" } else { path };
            write!(f, "  {shown}: {kind}")?;
        }
        Ok(())
    }
}

/// Aggregate failure surfaced by the entry points when the sink is
/// non-empty after the walk. Exposes the full path → kind mapping.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("normalization failed with {} violation(s):\n{violations}", .violations.len())]
pub struct NormalizeError {
    violations: Violations,
}

impl NormalizeError {
    /// Wrap a non-empty sink.
    pub fn new(violations: Violations) -> Self {
        Self { violations }
    }

    /// The recorded violations.
    pub fn violations(&self) -> &Violations {
        &self.violations
    }

    /// Consume the error, yielding the sink.
    pub fn into_violations(self) -> Violations {
        self.violations
    }
}
