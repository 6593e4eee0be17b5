//! Declarative constraint annotation.
//!
//! Constraints attached to a type or member (numeric range, length bounds,
//! regular-expression pattern) are translated onto the node that represents
//! it. Overwriting a previously applied keyword with a different value is
//! allowed and reported as a `constraint_conflict` diagnostic.

use crate::diagnostics::{DiagnosticCode, DiagnosticEvent, DiagnosticSink, Severity};
use crate::schema::{NodeConstraints, NodeId, NodeKind, SchemaArena, SchemaNode};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// A declared validation constraint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Constraint {
    /// Inclusive numeric range; either side may be open
    Range {
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
    },
    MinLength { min: u64 },
    MaxLength { max: u64 },
    /// Both length bounds at once
    Length {
        #[serde(default)]
        min: Option<u64>,
        #[serde(default)]
        max: Option<u64>,
    },
    Pattern { pattern: String },
}

/// Set `slot` to `value`, recording `field` when a different value is replaced
fn overwrite<T: PartialEq>(
    slot: &mut Option<T>,
    value: T,
    field: &'static str,
    conflicts: &mut Vec<&'static str>,
) {
    if let Some(existing) = slot {
        if *existing != value {
            conflicts.push(field);
        }
    }
    *slot = Some(value);
}

/// Apply one constraint to a keyword set, returning the fields it overwrote
fn apply_one(target: &mut NodeConstraints, constraint: &Constraint) -> Vec<&'static str> {
    let mut conflicts = Vec::new();
    match constraint {
        Constraint::Range { min, max } => {
            if let Some(min) = min {
                overwrite(&mut target.minimum, *min, "minimum", &mut conflicts);
            }
            if let Some(max) = max {
                overwrite(&mut target.maximum, *max, "maximum", &mut conflicts);
            }
        }
        Constraint::MinLength { min } => {
            overwrite(&mut target.min_length, *min, "minLength", &mut conflicts);
        }
        Constraint::MaxLength { max } => {
            overwrite(&mut target.max_length, *max, "maxLength", &mut conflicts);
        }
        Constraint::Length { min, max } => {
            if let Some(min) = min {
                overwrite(&mut target.min_length, *min, "minLength", &mut conflicts);
            }
            if let Some(max) = max {
                overwrite(&mut target.max_length, *max, "maxLength", &mut conflicts);
            }
        }
        Constraint::Pattern { pattern } => {
            overwrite(&mut target.pattern, pattern.clone(), "pattern", &mut conflicts);
        }
    }
    conflicts
}

/// Apply `constraints` in order to `node`, on behalf of `member`.
///
/// Placeholder and reference nodes are never mutated: when constraints
/// target one, it is wrapped in a single-member `allOf` that carries
/// the keywords, and the wrapper id is returned. Otherwise `node` is
/// returned unchanged.
pub fn annotate(
    arena: &mut SchemaArena,
    node: NodeId,
    member: &str,
    constraints: &[Constraint],
    sink: &dyn DiagnosticSink,
) -> NodeId {
    if constraints.is_empty() {
        return node;
    }

    let target = if arena[node].is_shared() {
        arena.push(SchemaNode::new(NodeKind::AllOf(vec![node])))
    } else {
        node
    };

    for constraint in constraints {
        if let Constraint::Pattern { pattern } = constraint {
            if let Err(err) = Regex::new(pattern) {
                sink.emit(
                    DiagnosticEvent::new(
                        Severity::Error,
                        DiagnosticCode::InvalidPattern,
                        format!("member '{member}' declares an invalid pattern: {err}"),
                    )
                    .with_context(json!({ "member": member, "pattern": pattern })),
                );
                continue;
            }
        }

        let conflicts = apply_one(&mut arena[target].constraints, constraint);
        if !conflicts.is_empty() {
            sink.emit(
                DiagnosticEvent::new(
                    Severity::Warn,
                    DiagnosticCode::ConstraintConflict,
                    format!(
                        "member '{member}' overwrote {}",
                        conflicts.join(", ")
                    ),
                )
                .with_context(json!({ "member": member, "fields": conflicts })),
            );
        }
    }

    target
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CollectingSink;
    use crate::schema::{Placeholder, PlaceholderReason, PrimitiveType};

    fn string_node(arena: &mut SchemaArena) -> NodeId {
        arena.push(SchemaNode::primitive(PrimitiveType::String))
    }

    #[test]
    fn test_length_then_pattern_keeps_both() {
        let sink = CollectingSink::new();
        let mut arena = SchemaArena::new();
        let node = string_node(&mut arena);
        let out = annotate(
            &mut arena,
            node,
            "code",
            &[
                Constraint::Length {
                    min: Some(1),
                    max: Some(10),
                },
                Constraint::Pattern {
                    pattern: "^[a-z]+$".into(),
                },
            ],
            &sink,
        );
        assert_eq!(out, node);
        let c = &arena[node].constraints;
        assert_eq!(c.min_length, Some(1));
        assert_eq!(c.max_length, Some(10));
        assert_eq!(c.pattern.as_deref(), Some("^[a-z]+$"));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_second_length_conflicts_once() {
        let sink = CollectingSink::new();
        let mut arena = SchemaArena::new();
        let node = string_node(&mut arena);
        annotate(
            &mut arena,
            node,
            "code",
            &[
                Constraint::Length {
                    min: Some(1),
                    max: Some(10),
                },
                Constraint::Pattern {
                    pattern: "^[a-z]+$".into(),
                },
                Constraint::Length {
                    min: Some(2),
                    max: Some(5),
                },
            ],
            &sink,
        );
        assert_eq!(sink.count(DiagnosticCode::ConstraintConflict), 1);
        let c = &arena[node].constraints;
        assert_eq!((c.min_length, c.max_length), (Some(2), Some(5)));

        let event = &sink.events()[0];
        assert!(event.message.contains("code"));
        assert_eq!(event.context.as_ref().unwrap()["fields"], json!(["minLength", "maxLength"]));
    }

    #[test]
    fn test_identical_reapplication_is_silent() {
        let sink = CollectingSink::new();
        let mut arena = SchemaArena::new();
        let node = string_node(&mut arena);
        let same = Constraint::MaxLength { max: 8 };
        annotate(&mut arena, node, "name", &[same.clone(), same], &sink);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_invalid_pattern_is_reported_and_skipped() {
        let sink = CollectingSink::new();
        let mut arena = SchemaArena::new();
        let node = string_node(&mut arena);
        annotate(
            &mut arena,
            node,
            "slug",
            &[Constraint::Pattern {
                pattern: "([unclosed".into(),
            }],
            &sink,
        );
        assert_eq!(sink.count(DiagnosticCode::InvalidPattern), 1);
        assert!(arena[node].constraints.pattern.is_none());
    }

    #[test]
    fn test_placeholder_is_wrapped_not_mutated() {
        let sink = CollectingSink::new();
        let mut arena = SchemaArena::new();
        let placeholder = arena.push(SchemaNode::new(NodeKind::Placeholder(Placeholder {
            type_name: "Node".into(),
            identifier: None,
            reason: PlaceholderReason::Cycle,
        })));
        let out = annotate(
            &mut arena,
            placeholder,
            "children",
            &[Constraint::MaxLength { max: 3 }],
            &sink,
        );
        assert_ne!(out, placeholder);
        assert!(arena[placeholder].constraints.is_empty());
        assert_eq!(arena[out].kind, NodeKind::AllOf(vec![placeholder]));
        assert_eq!(arena[out].constraints.max_length, Some(3));
    }

    #[test]
    fn test_range_deserializes_from_tagged_form() {
        let parsed: Constraint =
            serde_json::from_value(json!({"kind": "range", "min": 1, "max": 100})).unwrap();
        assert_eq!(
            parsed,
            Constraint::Range {
                min: Some(1.0),
                max: Some(100.0)
            }
        );
    }
}
