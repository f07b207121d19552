//! # Tree Helpers — Navigating JSON-Shaped Values
//!
//! Path-driven traversal over `serde_json::Value`. The normalizer never
//! holds long-lived `&mut` references into the tree; instead every read
//! and every write re-navigates from the root through one of the helpers
//! here, so ownership of each subtree is unambiguous at every step.
//!
//! ## Container semantics
//!
//! Both keyed mappings and sequences are containers. An index segment on a
//! mapping looks up the stringified index as a key; a key segment on a
//! sequence is used as an index when it is a canonical decimal. A location
//! "owns" its final segment iff the final container is a mapping holding
//! that key or a sequence where the index is in bounds — scalars and null
//! own nothing.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::path::{Segment, TreePath};

/// Runtime type of a JSON-shaped value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeTag {
    /// JSON `null`.
    Null,
    /// `true` / `false`.
    Bool,
    /// Any JSON number.
    Number,
    /// A string scalar.
    String,
    /// An ordered sequence.
    Array,
    /// A keyed mapping.
    Object,
}

impl TypeTag {
    /// The tag of a concrete value.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => TypeTag::Null,
            Value::Bool(_) => TypeTag::Bool,
            Value::Number(_) => TypeTag::Number,
            Value::String(_) => TypeTag::String,
            Value::Array(_) => TypeTag::Array,
            Value::Object(_) => TypeTag::Object,
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TypeTag::Null => "null",
            TypeTag::Bool => "bool",
            TypeTag::Number => "number",
            TypeTag::String => "string",
            TypeTag::Array => "array",
            TypeTag::Object => "object",
        };
        f.write_str(name)
    }
}

/// One navigation step into a container.
fn step<'a>(value: &'a Value, segment: &Segment) -> Option<&'a Value> {
    match (value, segment) {
        (Value::Object(map), Segment::Key(key)) => map.get(key),
        (Value::Object(map), Segment::Index(index)) => map.get(&index.to_string()),
        (Value::Array(seq), Segment::Index(index)) => seq.get(*index),
        (Value::Array(seq), Segment::Key(key)) => {
            key.parse::<usize>().ok().and_then(|index| seq.get(index))
        }
        _ => None,
    }
}

fn step_mut<'a>(value: &'a mut Value, segment: &Segment) -> Option<&'a mut Value> {
    match (value, segment) {
        (Value::Object(map), Segment::Key(key)) => map.get_mut(key),
        (Value::Object(map), Segment::Index(index)) => map.get_mut(&index.to_string()),
        (Value::Array(seq), Segment::Index(index)) => seq.get_mut(*index),
        (Value::Array(seq), Segment::Key(key)) => {
            key.parse::<usize>()
                .ok()
                .and_then(move |index| seq.get_mut(index))
        }
        _ => None,
    }
}

/// Resolve a path to a shared reference. The empty path yields the root.
pub fn get<'a>(root: &'a Value, path: &TreePath) -> Option<&'a Value> {
    let mut current = root;
    for segment in path.segments() {
        current = step(current, segment)?;
    }
    Some(current)
}

/// Resolve a path to a mutable reference. The empty path yields the root.
pub fn get_mut<'a>(root: &'a mut Value, path: &TreePath) -> Option<&'a mut Value> {
    let mut current = root;
    for segment in path.segments() {
        current = step_mut(current, segment)?;
    }
    Some(current)
}

/// Existence check for cross-field requirements.
///
/// Walks all but the last segment; if any intermediate step lands on a
/// scalar, null, or a missing entry, the location does not exist. The
/// result is true iff the final container owns the last segment. The root
/// path has no final segment and never exists.
pub fn exists(root: &Value, path: &TreePath) -> bool {
    let Some((last, init)) = path.segments().split_last() else {
        return false;
    };

    let mut current = root;
    for segment in init {
        match step(current, segment) {
            Some(next) => current = next,
            None => return false,
        }
    }

    owns(current, last)
}

/// True iff `container` directly owns `segment` as an entry.
fn owns(container: &Value, segment: &Segment) -> bool {
    match (container, segment) {
        (Value::Object(map), Segment::Key(key)) => map.contains_key(key),
        (Value::Object(map), Segment::Index(index)) => map.contains_key(&index.to_string()),
        (Value::Array(seq), Segment::Index(index)) => *index < seq.len(),
        (Value::Array(seq), Segment::Key(key)) => {
            key.parse::<usize>().is_ok_and(|index| index < seq.len())
        }
        _ => false,
    }
}
