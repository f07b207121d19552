//! # Schema Model — Directive Nodes and Construction-Time Validation
//!
//! A [`SchemaNode`] describes how to validate and transform one tree
//! location and its descendants. Directives are a closed enum rather than
//! string keys, so a misspelled directive cannot silently become a child
//! schema; the reserved-name collision that the string-keyed design
//! permits (a data property literally named `_type` being unreachable) is
//! rejected when the node is built.
//!
//! ## Evaluation order
//!
//! Pipeline directives run in the order their builder methods were called,
//! matching the declared-order semantics of the directive tree. The node
//! flags (`_default`, `_required`, `_expand`, `_strict`) are not part of
//! the pipeline; they drive the walker's absent-property pass and the
//! strict policy.
//!
//! ## Thread Safety
//!
//! Callbacks are required to be `Send + Sync`, so a `SchemaNode` can be
//! shared across threads and reused by concurrent independent calls. The
//! walker never writes into a schema; `_default` payloads are cloned on
//! every materialization.

use std::fmt;

use serde_json::Value;
use thiserror::Error;
use treenorm_core::TypeTag;

/// The reserved directive keys of the schema vocabulary. A child schema
/// must not be registered under any of these names.
pub const RESERVED_DIRECTIVE_KEYS: [&str; 11] = [
    "_type",
    "_any",
    "_requires",
    "_passes",
    "_unset",
    "_each",
    "_convert",
    "_expand",
    "_default",
    "_required",
    "_strict",
];

/// Context handed to `_passes`, `_unset`, and `_convert` callbacks.
///
/// Both references observe the live, partially normalized tree: a callback
/// running on a later sibling sees mutations made by earlier siblings.
/// `parent` is the immediate container of the value under evaluation — a
/// mapping for object properties, a sequence for `_each` elements.
/// Callbacks cannot mutate through the context; `_convert` returns its
/// replacement value instead.
#[derive(Debug, Clone, Copy)]
pub struct DirectiveCtx<'a> {
    /// The top-level value being normalized.
    pub root: &'a Value,
    /// The immediate container of the value under evaluation.
    pub parent: &'a Value,
}

/// A `_passes` / `_unset` predicate.
pub type Predicate = Box<dyn Fn(&Value, DirectiveCtx<'_>) -> bool + Send + Sync>;

/// A `_convert` transform; the returned value replaces the current one.
pub type Transform = Box<dyn Fn(&Value, DirectiveCtx<'_>) -> Value + Send + Sync>;

/// One pipeline directive on a schema node.
pub enum Directive {
    /// `_type`: accepted runtime types.
    Type(Vec<TypeTag>),
    /// `_any`: accepted literal values, compared by equality.
    Any(Vec<Value>),
    /// `_requires`: a path expression that must exist in the root,
    /// resolved relative to the current property's path.
    Requires(String),
    /// `_passes`: the predicate must return true.
    Passes(Predicate),
    /// `_unset`: when the predicate returns true, the property is removed
    /// and excluded from all further processing.
    Unset(Predicate),
    /// `_each`: sub-schema applied to every sequence element or mapping
    /// entry of the value.
    Each(Box<SchemaNode>),
    /// `_convert`: replaces the value and continues the pipeline.
    Convert(Transform),
}

impl Directive {
    /// The reserved key this directive corresponds to.
    pub fn key(&self) -> &'static str {
        match self {
            Directive::Type(_) => "_type",
            Directive::Any(_) => "_any",
            Directive::Requires(_) => "_requires",
            Directive::Passes(_) => "_passes",
            Directive::Unset(_) => "_unset",
            Directive::Each(_) => "_each",
            Directive::Convert(_) => "_convert",
        }
    }
}

impl fmt::Debug for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Directive::Type(tags) => f.debug_tuple("Type").field(tags).finish(),
            Directive::Any(values) => f.debug_tuple("Any").field(values).finish(),
            Directive::Requires(expr) => f.debug_tuple("Requires").field(expr).finish(),
            Directive::Each(node) => f.debug_tuple("Each").field(node).finish(),
            // Callbacks are opaque.
            Directive::Passes(_) => f.write_str("Passes(..)"),
            Directive::Unset(_) => f.write_str("Unset(..)"),
            Directive::Convert(_) => f.write_str("Convert(..)"),
        }
    }
}

/// Error raised when a schema node fails construction-time validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// A child schema was registered under a reserved directive key; a
    /// data property with such a name can never be addressed by a schema.
    #[error("child name '{0}' collides with a reserved directive key")]
    ReservedChildName(String),

    /// The same child name was registered twice on one node.
    #[error("child '{0}' declared more than once")]
    DuplicateChild(String),
}

/// One node of the schema tree.
///
/// Built via [`SchemaNode::builder`]; read-only thereafter. A node carries
/// its pipeline directives in declaration order, the absent-property flags
/// (`_default` / `_required` / `_expand`), an optional `_strict` override,
/// and its child schemas in declaration order.
#[derive(Debug, Default)]
pub struct SchemaNode {
    directives: Vec<Directive>,
    default: Option<Value>,
    required: bool,
    expand: bool,
    strict: Option<bool>,
    children: Vec<(String, SchemaNode)>,
}

impl SchemaNode {
    /// Start building a node.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// A node with no directives, flags, or children. Useful as the child
    /// schema of a property that only needs to be *known* (so strict mode
    /// keeps it) or to exist as a `_requires` target.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Pipeline directives in declaration order.
    pub fn directives(&self) -> &[Directive] {
        &self.directives
    }

    /// The `_default` payload, if the flag was declared. Presence of the
    /// key is what matters: `_default` with a `null` payload is honored.
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Whether `_required` was declared.
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Whether `_expand` was declared.
    pub fn expands(&self) -> bool {
        self.expand
    }

    /// The node's `_strict` override, if any.
    pub fn strict_override(&self) -> Option<bool> {
        self.strict
    }

    /// Child schema for a property name.
    pub fn child(&self, name: &str) -> Option<&SchemaNode> {
        self.children
            .iter()
            .find(|(child, _)| child == name)
            .map(|(_, node)| node)
    }

    /// Children in declaration order.
    pub fn children(&self) -> impl Iterator<Item = (&str, &SchemaNode)> {
        self.children.iter().map(|(name, node)| (name.as_str(), node))
    }
}

/// Builder for [`SchemaNode`].
///
/// Pipeline directive methods append in call order; `build()` validates
/// child names and returns the immutable node.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    directives: Vec<Directive>,
    default: Option<Value>,
    required: bool,
    expand: bool,
    strict: Option<bool>,
    children: Vec<(String, SchemaNode)>,
}

impl SchemaBuilder {
    /// `_type` with a single accepted tag.
    pub fn type_tag(self, tag: TypeTag) -> Self {
        self.type_one_of([tag])
    }

    /// `_type` with a list of accepted tags.
    pub fn type_one_of(mut self, tags: impl IntoIterator<Item = TypeTag>) -> Self {
        self.directives
            .push(Directive::Type(tags.into_iter().collect()));
        self
    }

    /// `_any` with a single accepted literal.
    pub fn any_one(self, value: impl Into<Value>) -> Self {
        self.any_of([value.into()])
    }

    /// `_any` with a list of accepted literals.
    pub fn any_of(mut self, values: impl IntoIterator<Item = Value>) -> Self {
        self.directives
            .push(Directive::Any(values.into_iter().collect()));
        self
    }

    /// `_requires`: the referenced location must exist in the root. The
    /// expression is absolute, or relative to the current property's path
    /// via leading dots (one dot resolves at the sibling level).
    pub fn requires(mut self, expr: impl Into<String>) -> Self {
        self.directives.push(Directive::Requires(expr.into()));
        self
    }

    /// `_passes`: the predicate must hold or `invalid_value` is recorded.
    pub fn passes<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Value, DirectiveCtx<'_>) -> bool + Send + Sync + 'static,
    {
        self.directives.push(Directive::Passes(Box::new(predicate)));
        self
    }

    /// `_unset`: when the predicate holds the property is deleted from its
    /// parent, without recording a violation.
    pub fn unset_when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Value, DirectiveCtx<'_>) -> bool + Send + Sync + 'static,
    {
        self.directives.push(Directive::Unset(Box::new(predicate)));
        self
    }

    /// `_each`: run every element of the value through `element`'s
    /// pipeline, by index for sequences and by key for mappings.
    pub fn each(mut self, element: SchemaNode) -> Self {
        self.directives.push(Directive::Each(Box::new(element)));
        self
    }

    /// `_convert`: replace the value and keep evaluating the remaining
    /// directives against the replacement.
    pub fn convert<F>(mut self, transform: F) -> Self
    where
        F: Fn(&Value, DirectiveCtx<'_>) -> Value + Send + Sync + 'static,
    {
        self.directives.push(Directive::Convert(Box::new(transform)));
        self
    }

    /// `_default`: materialize a clone of `value` when the property is
    /// absent from the input.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// `_required`: record `required` when the property is absent (unless
    /// `_default` is also declared, which wins).
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// `_expand`: materialize an empty mapping for an absent property and
    /// normalize it, realizing nested defaults arbitrarily deep.
    pub fn expand(mut self) -> Self {
        self.expand = true;
        self
    }

    /// `_strict`: override the call-level strict policy for this node's
    /// own property pass.
    pub fn strict(mut self, on: bool) -> Self {
        self.strict = Some(on);
        self
    }

    /// Register a child schema for a property name.
    pub fn child(mut self, name: impl Into<String>, node: SchemaNode) -> Self {
        self.children.push((name.into(), node));
        self
    }

    /// Validate child names and produce the node.
    ///
    /// # Errors
    ///
    /// [`SchemaError::ReservedChildName`] when a child is named after a
    /// reserved directive key, [`SchemaError::DuplicateChild`] when a
    /// child name repeats.
    pub fn build(self) -> Result<SchemaNode, SchemaError> {
        for (i, (name, _)) in self.children.iter().enumerate() {
            if RESERVED_DIRECTIVE_KEYS.contains(&name.as_str()) {
                return Err(SchemaError::ReservedChildName(name.clone()));
            }
            if self.children[..i].iter().any(|(seen, _)| seen == name) {
                return Err(SchemaError::DuplicateChild(name.clone()));
            }
        }

        Ok(SchemaNode {
            directives: self.directives,
            default: self.default,
            required: self.required,
            expand: self.expand,
            strict: self.strict,
            children: self.children,
        })
    }
}
