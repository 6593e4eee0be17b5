use super::{NodeId, NodeKind, PrimitiveType, SchemaArena};
use serde_json::{json, Map, Number, Value};

/// Prefix for component references
pub const COMPONENT_REF_PREFIX: &str = "#/components/schemas/";

/// Integral floats render as integers so `minimum: 1` stays `1`, not `1.0`
pub(crate) fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n >= i64::MIN as f64 && n <= i64::MAX as f64 {
        return Value::from(n as i64);
    }
    Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
}

fn render_list(arena: &SchemaArena, ids: &[NodeId]) -> Value {
    Value::Array(ids.iter().map(|id| render(arena, *id)).collect())
}

pub(crate) fn render(arena: &SchemaArena, id: NodeId) -> Value {
    let Some(node) = arena.get(id) else {
        return Value::Object(Map::new());
    };
    let mut out = Map::new();

    match &node.kind {
        NodeKind::Primitive(p) => {
            out.insert("type".into(), Value::from(p.as_str()));
        }
        NodeKind::Null => {
            out.insert("type".into(), Value::from("null"));
        }
        NodeKind::AnyOf(alts) => {
            out.insert("anyOf".into(), render_list(arena, alts));
        }
        NodeKind::OneOf(alts) => {
            out.insert("oneOf".into(), render_list(arena, alts));
        }
        NodeKind::AllOf(parts) => {
            out.insert("allOf".into(), render_list(arena, parts));
        }
        NodeKind::Placeholder(placeholder) => {
            out.insert(
                "x-placeholder".into(),
                json!({
                    "type": placeholder.type_name,
                    "reason": placeholder.reason.as_str(),
                }),
            );
            if let Some(identifier) = &placeholder.identifier {
                out.insert(
                    "$ref".into(),
                    Value::from(format!("{COMPONENT_REF_PREFIX}{identifier}")),
                );
            }
            return Value::Object(out);
        }
        NodeKind::Reference(reference) => {
            out.insert(
                "$ref".into(),
                Value::from(format!("{COMPONENT_REF_PREFIX}{}", reference.identifier)),
            );
            return Value::Object(out);
        }
    }

    if let Some(format) = &node.format {
        out.insert("format".into(), Value::from(format.as_str()));
    }
    if node.nullable {
        out.insert("nullable".into(), Value::Bool(true));
    }
    if !node.enum_values.is_empty() {
        out.insert("enum".into(), Value::Array(node.enum_values.clone()));
    }
    if !node.properties.is_empty() {
        let props: Map<String, Value> = node
            .properties
            .iter()
            .map(|(name, child)| (name.clone(), render(arena, *child)))
            .collect();
        out.insert("properties".into(), Value::Object(props));
    }
    if !node.required.is_empty() {
        out.insert(
            "required".into(),
            Value::Array(node.required.iter().map(|r| Value::from(r.as_str())).collect()),
        );
    }
    if let Some(items) = node.items {
        out.insert("items".into(), render(arena, items));
    }
    if let Some(additional) = node.additional_properties {
        out.insert("additionalProperties".into(), render(arena, additional));
    }

    let c = &node.constraints;
    if let Some(min) = c.minimum {
        out.insert("minimum".into(), number_value(min));
    }
    if let Some(max) = c.maximum {
        out.insert("maximum".into(), number_value(max));
    }
    let (min_key, max_key) = match node.primitive_type() {
        Some(PrimitiveType::Array) => ("minItems", "maxItems"),
        _ => ("minLength", "maxLength"),
    };
    if let Some(min) = c.min_length {
        out.insert(min_key.into(), Value::from(min));
    }
    if let Some(max) = c.max_length {
        out.insert(max_key.into(), Value::from(max));
    }
    if let Some(pattern) = &c.pattern {
        out.insert("pattern".into(), Value::from(pattern.as_str()));
    }

    if let Some(example) = &node.example {
        out.insert("example".into(), example.clone());
    }
    if let Some(identifier) = &node.meta.identifier {
        out.insert("x-schema-id".into(), Value::from(identifier.as_str()));
    }
    if let Some(v) = node.meta.virtualized {
        out.insert(
            "x-virtualized".into(),
            json!({ "total": v.total, "truncated": v.truncated }),
        );
    }

    Value::Object(out)
}
