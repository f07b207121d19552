//! # Walk — Value Pipeline and Tree Walker
//!
//! The recursive descent that applies a schema node to a value and its
//! descendants. All reads and writes re-navigate from the root through
//! `treenorm-core` helpers; the walk never carries a `&mut` borrow across
//! a callback invocation, so `_passes`/`_unset`/`_convert` can observe the
//! live root while the tree is being mutated.
//!
//! ## Invariants
//!
//! - A failing directive records one violation and stops the remaining
//!   directives for that property; `_each` and `_convert` never count as
//!   failures and never stop the list.
//! - A mapping-shaped value is always descended into after its directives
//!   ran (even after a recorded failure); a sequence is only entered
//!   through an explicit `_each`.
//! - The absent-property pass resolves `_default`, then `_required`, then
//!   `_expand`, first match winning, and only for absent properties.
//! - Recursion depth equals input nesting depth; cyclic inputs cannot be
//!   expressed with owned `serde_json` values.

use serde_json::{Map, Value};
use tracing::{debug, trace};
use treenorm_core::{exists, get, get_mut, ErrorKind, Segment, TreePath, TypeTag, Violations};

use crate::schema::{Directive, DirectiveCtx, Predicate, SchemaNode, Transform};
use crate::NormalizeOptions;

static NULL: Value = Value::Null;

/// What the pipeline did with the property it was applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    /// The property is still present (possibly replaced or flagged).
    Kept,
    /// `_unset` removed the property; no further processing applies.
    Removed,
}

/// Rough shape of a value, for dispatching `_each` and descent.
enum Shape {
    Mapping,
    Sequence,
    Other,
}

fn shape_at(root: &Value, path: &TreePath) -> Shape {
    match get(root, path) {
        Some(Value::Object(_)) => Shape::Mapping,
        Some(Value::Array(_)) => Shape::Sequence,
        _ => Shape::Other,
    }
}

/// Object-level pass: existing properties first, then the schema-declared
/// properties absent from the value.
pub(crate) fn walk_object(
    root: &mut Value,
    path: &TreePath,
    node: &SchemaNode,
    options: &NormalizeOptions,
    sink: &mut Violations,
) {
    let keys: Vec<String> = match get(root, path).and_then(Value::as_object) {
        Some(map) => map.keys().cloned().collect(),
        // Non-mapping values have no properties to walk.
        None => return,
    };

    let strict = node.strict_override().unwrap_or(options.strict);

    // Phase A: existing properties, in enumeration order.
    for key in keys {
        let child_path = path.child(key.clone());
        match node.child(&key) {
            None => {
                if strict {
                    trace!(path = %child_path, "pruning property not declared in schema");
                    if let Some(map) = get_mut(root, path).and_then(Value::as_object_mut) {
                        map.shift_remove(&key);
                    }
                }
            }
            Some(child) => {
                apply_pipeline(root, &child_path, child, options, sink);
            }
        }
    }

    // Phase B: schema-declared properties absent from the value. First
    // matching rule wins: _default, then _required, then _expand.
    for (name, child) in node.children() {
        let present = get(root, path)
            .and_then(Value::as_object)
            .is_some_and(|map| map.contains_key(name));
        if present {
            continue;
        }

        let child_path = path.child(name);
        if let Some(default) = child.default_value() {
            trace!(path = %child_path, "materializing default");
            if let Some(map) = get_mut(root, path).and_then(Value::as_object_mut) {
                // Clone per use: the schema may be shared across calls and
                // the output must never alias it.
                map.insert(name.to_owned(), default.clone());
            }
        } else if child.is_required() {
            debug!(path = %child_path, "required property missing");
            sink.record(&child_path, ErrorKind::Required);
        } else if child.expands() {
            trace!(path = %child_path, "expanding absent subtree");
            if let Some(map) = get_mut(root, path).and_then(Value::as_object_mut) {
                map.insert(name.to_owned(), Value::Object(Map::new()));
                walk_object(root, &child_path, child, options, sink);
            }
        }
    }
}

/// Apply one schema node's directives to the value at `path`, then descend
/// if the (possibly replaced) value is a mapping.
fn apply_pipeline(
    root: &mut Value,
    path: &TreePath,
    node: &SchemaNode,
    options: &NormalizeOptions,
    sink: &mut Violations,
) -> Outcome {
    for directive in node.directives() {
        match directive {
            Directive::Type(accepted) => {
                let actual = get(root, path).map_or(TypeTag::Null, TypeTag::of);
                if !accepted.contains(&actual) {
                    debug!(path = %path, %actual, "type not accepted");
                    sink.record(path, ErrorKind::InvalidType);
                    break;
                }
            }
            Directive::Any(accepted) => {
                let value = get(root, path).unwrap_or(&NULL);
                if !accepted.contains(value) {
                    debug!(path = %path, "value not among accepted literals");
                    sink.record(path, ErrorKind::InvalidValue);
                    break;
                }
            }
            Directive::Requires(expr) => {
                let target = TreePath::parse(expr, path);
                if !exists(root, &target) {
                    debug!(path = %path, target = %target, "requirement missing");
                    sink.record(path, ErrorKind::MissingRequirement);
                    break;
                }
            }
            Directive::Passes(predicate) => {
                if !call_predicate(root, path, predicate) {
                    debug!(path = %path, "predicate rejected value");
                    sink.record(path, ErrorKind::InvalidValue);
                    break;
                }
            }
            Directive::Unset(predicate) => {
                if call_predicate(root, path, predicate) {
                    trace!(path = %path, "unsetting property");
                    remove_at(root, path);
                    return Outcome::Removed;
                }
            }
            Directive::Each(element) => {
                apply_each(root, path, element, options, sink);
            }
            Directive::Convert(transform) => {
                let replacement = call_transform(root, path, transform);
                if let Some(slot) = get_mut(root, path) {
                    *slot = replacement;
                }
            }
        }
    }

    // Mappings always descend, with this node doubling as the children's
    // schema; sequences never descend implicitly.
    if matches!(shape_at(root, path), Shape::Mapping) {
        walk_object(root, path, node, options, sink);
    }

    Outcome::Kept
}

/// Run every element of the value at `path` through the element pipeline.
///
/// Sequence elements are addressed by index; an element removed by
/// `_unset` shifts its successors down, so the length is re-read and the
/// index only advances past kept elements. Mapping entries are addressed
/// by key. Any other shape is left untouched.
fn apply_each(
    root: &mut Value,
    path: &TreePath,
    element: &SchemaNode,
    options: &NormalizeOptions,
    sink: &mut Violations,
) {
    match shape_at(root, path) {
        Shape::Sequence => {
            let mut index = 0;
            loop {
                let len = get(root, path).and_then(Value::as_array).map_or(0, Vec::len);
                if index >= len {
                    break;
                }
                if apply_pipeline(root, &path.index(index), element, options, sink)
                    == Outcome::Kept
                {
                    index += 1;
                }
            }
        }
        Shape::Mapping => {
            let keys: Vec<String> = get(root, path)
                .and_then(Value::as_object)
                .map(|map| map.keys().cloned().collect())
                .unwrap_or_default();
            for key in keys {
                apply_pipeline(root, &path.child(key), element, options, sink);
            }
        }
        Shape::Other => {
            trace!(path = %path, "_each operand is not a sequence or mapping; skipped");
        }
    }
}

/// Shared-borrow view for a callback: current value, its container, and
/// the root, all read from the live tree.
fn call_predicate(root: &Value, path: &TreePath, predicate: &Predicate) -> bool {
    let value = get(root, path).unwrap_or(&NULL);
    let parent = parent_of(root, path);
    predicate(value, DirectiveCtx { root, parent })
}

fn call_transform(root: &Value, path: &TreePath, transform: &Transform) -> Value {
    let value = get(root, path).unwrap_or(&NULL);
    let parent = parent_of(root, path);
    transform(value, DirectiveCtx { root, parent })
}

fn parent_of<'a>(root: &'a Value, path: &TreePath) -> &'a Value {
    path.split_last()
        .and_then(|(parent, _)| get(root, &parent))
        .unwrap_or(root)
}

/// Delete the entry addressed by `path` from its container.
fn remove_at(root: &mut Value, path: &TreePath) {
    let Some((parent_path, last)) = path.split_last() else {
        return;
    };
    match (get_mut(root, &parent_path), last) {
        (Some(Value::Object(map)), Segment::Key(key)) => {
            map.shift_remove(&key);
        }
        (Some(Value::Object(map)), Segment::Index(index)) => {
            map.shift_remove(&index.to_string());
        }
        (Some(Value::Array(seq)), Segment::Index(index)) => {
            if index < seq.len() {
                seq.remove(index);
            }
        }
        (Some(Value::Array(seq)), Segment::Key(key)) => {
            if let Ok(index) = key.parse::<usize>() {
                if index < seq.len() {
                    seq.remove(index);
                }
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SchemaNode;
    use serde_json::json;

    fn run(value: &mut Value, node: &SchemaNode, options: &NormalizeOptions) -> Violations {
        let mut sink = Violations::new();
        walk_object(value, &TreePath::root(), node, options, &mut sink);
        sink
    }

    #[test]
    fn test_type_failure_short_circuits_later_directives() {
        // _any would also fail, but _type already recorded and stopped.
        let node = SchemaNode::builder()
            .child(
                "age",
                SchemaNode::builder()
                    .type_tag(TypeTag::Number)
                    .any_of([json!(1), json!(2)])
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();
        let mut value = json!({"age": "12"});
        let sink = run(&mut value, &node, &NormalizeOptions::default());
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.get("age"), Some(ErrorKind::InvalidType));
    }

    #[test]
    fn test_convert_continues_pipeline_against_replacement() {
        let node = SchemaNode::builder()
            .child(
                "count",
                SchemaNode::builder()
                    .convert(|value, _ctx| match value.as_str() {
                        Some(text) => text
                            .parse::<i64>()
                            .map_or_else(|_| value.clone(), Value::from),
                        None => value.clone(),
                    })
                    .type_tag(TypeTag::Number)
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();
        let mut value = json!({"count": "41"});
        let sink = run(&mut value, &node, &NormalizeOptions::default());
        assert!(sink.is_empty());
        assert_eq!(value, json!({"count": 41}));
    }

    #[test]
    fn test_unset_removes_and_skips_descent() {
        // The nested _required would fire if descent happened after _unset.
        let node = SchemaNode::builder()
            .child(
                "meta",
                SchemaNode::builder()
                    .unset_when(|value, _ctx| {
                        value.as_object().is_some_and(Map::is_empty)
                    })
                    .child(
                        "version",
                        SchemaNode::builder().required().build().unwrap(),
                    )
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();
        let mut value = json!({"meta": {}});
        let sink = run(&mut value, &node, &NormalizeOptions::default());
        assert!(sink.is_empty());
        assert_eq!(value, json!({}));
    }

    #[test]
    fn test_unset_false_continues_pipeline() {
        let node = SchemaNode::builder()
            .child(
                "flag",
                SchemaNode::builder()
                    .unset_when(|value, _ctx| value.is_null())
                    .type_tag(TypeTag::Bool)
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();
        let mut value = json!({"flag": "yes"});
        let sink = run(&mut value, &node, &NormalizeOptions::default());
        assert_eq!(sink.get("flag"), Some(ErrorKind::InvalidType));
    }

    #[test]
    fn test_node_strict_overrides_global_in_both_directions() {
        let locally_strict = SchemaNode::builder()
            .child(
                "inner",
                SchemaNode::builder()
                    .strict(true)
                    .child("known", SchemaNode::empty())
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();
        let mut value = json!({"inner": {"known": 1, "junk": 2}, "top_junk": 3});
        let sink = run(&mut value, &locally_strict, &NormalizeOptions { strict: false });
        assert!(sink.is_empty());
        // Global lax: top-level junk stays. Node strict: inner junk pruned.
        assert_eq!(value, json!({"inner": {"known": 1}, "top_junk": 3}));

        let locally_lax = SchemaNode::builder()
            .child(
                "inner",
                SchemaNode::builder()
                    .strict(false)
                    .child("known", SchemaNode::empty())
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();
        let mut value = json!({"inner": {"known": 1, "junk": 2}, "top_junk": 3});
        let sink = run(&mut value, &locally_lax, &NormalizeOptions { strict: true });
        assert!(sink.is_empty());
        assert_eq!(value, json!({"inner": {"known": 1, "junk": 2}}));
    }

    #[test]
    fn test_each_over_mapping_applies_by_key() {
        let node = SchemaNode::builder()
            .child(
                "scores",
                SchemaNode::builder()
                    .each(
                        SchemaNode::builder()
                            .type_tag(TypeTag::Number)
                            .build()
                            .unwrap(),
                    )
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();
        let mut value = json!({"scores": {"alice": 10, "bob": "none"}});
        let sink = run(&mut value, &node, &NormalizeOptions::default());
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.get("scores.bob"), Some(ErrorKind::InvalidType));
    }

    #[test]
    fn test_each_unset_shifts_sequence_indices() {
        let node = SchemaNode::builder()
            .child(
                "tags",
                SchemaNode::builder()
                    .each(
                        SchemaNode::builder()
                            .unset_when(|value, _ctx| value.is_null())
                            .build()
                            .unwrap(),
                    )
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();
        let mut value = json!({"tags": [null, "a", null, "b"]});
        let sink = run(&mut value, &node, &NormalizeOptions::default());
        assert!(sink.is_empty());
        assert_eq!(value, json!({"tags": ["a", "b"]}));
    }

    #[test]
    fn test_each_on_scalar_is_skipped() {
        let node = SchemaNode::builder()
            .child(
                "tags",
                SchemaNode::builder()
                    .each(
                        SchemaNode::builder()
                            .type_tag(TypeTag::String)
                            .build()
                            .unwrap(),
                    )
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();
        let mut value = json!({"tags": 7});
        let sink = run(&mut value, &node, &NormalizeOptions::default());
        assert!(sink.is_empty());
        assert_eq!(value, json!({"tags": 7}));
    }

    #[test]
    fn test_failed_type_still_descends_into_mapping() {
        // A mapping that fails _type is still walked, so nested
        // violations surface in the same call.
        let node = SchemaNode::builder()
            .child(
                "config",
                SchemaNode::builder()
                    .type_tag(TypeTag::String)
                    .child(
                        "port",
                        SchemaNode::builder().required().build().unwrap(),
                    )
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();
        let mut value = json!({"config": {}});
        let sink = run(&mut value, &node, &NormalizeOptions::default());
        assert_eq!(sink.get("config"), Some(ErrorKind::InvalidType));
        assert_eq!(sink.get("config.port"), Some(ErrorKind::Required));
    }

    #[test]
    fn test_default_wins_over_required_and_expand() {
        let node = SchemaNode::builder()
            .child(
                "mode",
                SchemaNode::builder()
                    .default_value(json!("auto"))
                    .required()
                    .expand()
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();
        let mut value = json!({});
        let sink = run(&mut value, &node, &NormalizeOptions::default());
        assert!(sink.is_empty());
        assert_eq!(value, json!({"mode": "auto"}));
    }

    #[test]
    fn test_required_suppresses_expand() {
        let node = SchemaNode::builder()
            .child(
                "settings",
                SchemaNode::builder().required().expand().build().unwrap(),
            )
            .build()
            .unwrap();
        let mut value = json!({});
        let sink = run(&mut value, &node, &NormalizeOptions::default());
        assert_eq!(sink.get("settings"), Some(ErrorKind::Required));
        assert_eq!(value, json!({}));
    }

    #[test]
    fn test_expand_realizes_nested_defaults() {
        let node = SchemaNode::builder()
            .child(
                "settings",
                SchemaNode::builder()
                    .expand()
                    .child(
                        "retries",
                        SchemaNode::builder().default_value(json!(3)).build().unwrap(),
                    )
                    .child(
                        "backend",
                        SchemaNode::builder()
                            .expand()
                            .child(
                                "url",
                                SchemaNode::builder()
                                    .default_value(json!("http://localhost"))
                                    .build()
                                    .unwrap(),
                            )
                            .build()
                            .unwrap(),
                    )
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();
        let mut value = json!({});
        let sink = run(&mut value, &node, &NormalizeOptions::default());
        assert!(sink.is_empty());
        assert_eq!(
            value,
            json!({"settings": {"retries": 3, "backend": {"url": "http://localhost"}}})
        );
    }

    #[test]
    fn test_phase_b_skips_present_properties() {
        // _default must not overwrite a supplied value, whatever it is.
        let node = SchemaNode::builder()
            .child(
                "role",
                SchemaNode::builder().default_value(json!("user")).build().unwrap(),
            )
            .build()
            .unwrap();
        let mut value = json!({"role": null});
        let sink = run(&mut value, &node, &NormalizeOptions::default());
        assert!(sink.is_empty());
        assert_eq!(value, json!({"role": null}));
    }

    #[test]
    fn test_callbacks_see_sibling_mutations() {
        // `b` runs after `a` was converted; its predicate reads the live root.
        let node = SchemaNode::builder()
            .child(
                "a",
                SchemaNode::builder()
                    .convert(|_value, _ctx| json!(10))
                    .build()
                    .unwrap(),
            )
            .child(
                "b",
                SchemaNode::builder()
                    .passes(|_value, ctx| ctx.root.get("a") == Some(&json!(10)))
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();
        let mut value = json!({"a": 1, "b": 2});
        let sink = run(&mut value, &node, &NormalizeOptions::default());
        assert!(sink.is_empty());
        assert_eq!(value, json!({"a": 10, "b": 2}));
    }

    #[test]
    fn test_parent_context_for_each_element_is_the_sequence() {
        let node = SchemaNode::builder()
            .child(
                "tags",
                SchemaNode::builder()
                    .each(
                        SchemaNode::builder()
                            .passes(|_value, ctx| ctx.parent.is_array())
                            .build()
                            .unwrap(),
                    )
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();
        let mut value = json!({"tags": ["x"]});
        let sink = run(&mut value, &node, &NormalizeOptions::default());
        assert!(sink.is_empty());
    }
}
