//! # treenorm — Schema-Driven Tree Normalizer
//!
//! Given a JSON-shaped value and a declarative schema tree, treenorm
//! validates and mutates the value in place, collecting every violation
//! found across the whole tree, and produces either the normalized value
//! or one aggregate error.
//!
//! ## Directives
//!
//! A [`SchemaNode`] combines pipeline directives (`_type`, `_any`,
//! `_requires`, `_passes`, `_unset`, `_each`, `_convert`), absent-property
//! flags (`_default`, `_required`, `_expand`), a per-node `_strict`
//! override, and child schemas for nested properties. Directives are a
//! closed enum validated at construction time — see [`schema`].
//!
//! ## Example
//!
//! ```
//! use serde_json::json;
//! use treenorm::{normalize, NormalizeOptions, SchemaNode, TypeTag};
//!
//! let schema = SchemaNode::builder()
//!     .child(
//!         "name",
//!         SchemaNode::builder()
//!             .type_tag(TypeTag::String)
//!             .required()
//!             .build()?,
//!     )
//!     .child(
//!         "role",
//!         SchemaNode::builder().default_value(json!("user")).build()?,
//!     )
//!     .build()?;
//!
//! let input = json!({"name": "ada"});
//! let output = normalize(&input, &schema, &NormalizeOptions::default())
//!     .expect("valid input");
//! assert_eq!(output, json!({"name": "ada", "role": "user"}));
//! # Ok::<(), treenorm::SchemaError>(())
//! ```
//!
//! ## Crate Policy
//!
//! - Synchronous, single-threaded, no I/O; one bounded recursive descent
//!   whose stack depth grows with the input's nesting depth. Depth is not
//!   guarded.
//! - The schema is read-only for the whole operation and safe to reuse
//!   across concurrent independent calls; `_default` payloads are cloned
//!   on every materialization so outputs never alias the schema.
//! - Callbacks that panic are not caught; the panic aborts the whole walk.
//!   Directive authors must not panic on expected-invalid input.

pub mod schema;
mod walk;

use serde_json::Value;
use tracing::debug;

pub use schema::{
    Directive, DirectiveCtx, SchemaBuilder, SchemaError, SchemaNode, RESERVED_DIRECTIVE_KEYS,
};
pub use treenorm_core::{
    exists, get, get_mut, ErrorKind, NormalizeError, Segment, TreePath, TypeTag, Violations,
};

/// Call-level options for one normalization run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Default unknown-property policy: when true, properties without a
    /// child schema are deleted. Overridable per schema node via
    /// `_strict`.
    pub strict: bool,
}

/// Normalize a clone of `input`, leaving the caller's value untouched.
///
/// # Errors
///
/// [`NormalizeError`] carrying the full path → kind violation map when any
/// directive failed anywhere in the tree.
pub fn normalize(
    input: &Value,
    schema: &SchemaNode,
    options: &NormalizeOptions,
) -> Result<Value, NormalizeError> {
    let mut value = input.clone();
    normalize_in_place(&mut value, schema, options)?;
    Ok(value)
}

/// Normalize `value` in place.
///
/// The walk runs to completion even after failures, so the error carries
/// every discoverable violation; on success the value has been mutated
/// into its normalized form. A non-mapping root passes through untouched.
///
/// # Errors
///
/// [`NormalizeError`] when the violation sink is non-empty after the walk.
pub fn normalize_in_place(
    value: &mut Value,
    schema: &SchemaNode,
    options: &NormalizeOptions,
) -> Result<(), NormalizeError> {
    let mut sink = Violations::new();
    walk::walk_object(value, &TreePath::root(), schema, options, &mut sink);

    if sink.is_empty() {
        Ok(())
    } else {
        debug!(violations = sink.len(), "normalization failed");
        Err(NormalizeError::new(sink))
    }
}
