//! Scalar type mapping.
//!
//! A fixed table maps well-known scalars onto a primitive `type` plus optional
//! `format`. Callers may register overrides keyed by type name; the most
//! recent registration for a name wins.

use crate::diagnostics::{DiagnosticCode, DiagnosticEvent, DiagnosticSink, Severity};
use crate::schema::{NodeId, PrimitiveType, SchemaArena, SchemaNode};
use crate::types::ScalarKind;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

/// Caller-supplied mapping for a named scalar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalarOverride {
    #[serde(rename = "type")]
    pub primitive: PrimitiveType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl ScalarOverride {
    pub fn new(primitive: PrimitiveType, format: Option<&str>) -> Self {
        ScalarOverride {
            primitive,
            format: format.map(str::to_string),
        }
    }

    pub fn to_node(&self) -> SchemaNode {
        let node = SchemaNode::primitive(self.primitive);
        match &self.format {
            Some(format) => node.with_format(format.as_str()),
            None => node,
        }
    }
}

/// Built-in primitive and format for a scalar kind.
///
/// Returns `None` for [`ScalarKind::Other`]; such types fall through to the
/// empty-object default unless an override exists.
pub fn builtin_mapping(kind: &ScalarKind) -> Option<(PrimitiveType, Option<&'static str>)> {
    use PrimitiveType::*;
    let mapping = match kind {
        ScalarKind::String | ScalarKind::Char => (String, None),
        ScalarKind::Boolean => (Boolean, None),
        ScalarKind::Int8 | ScalarKind::Int16 | ScalarKind::Int32 => (Integer, Some("int32")),
        ScalarKind::UInt8 | ScalarKind::UInt16 => (Integer, Some("int32")),
        ScalarKind::UInt32 | ScalarKind::Int64 | ScalarKind::UInt64 => (Integer, Some("int64")),
        ScalarKind::Float32 => (Number, Some("float")),
        ScalarKind::Float64 | ScalarKind::Decimal => (Number, Some("double")),
        ScalarKind::Uuid => (String, Some("uuid")),
        ScalarKind::DateTime => (String, Some("date-time")),
        ScalarKind::Date => (String, Some("date")),
        ScalarKind::Time => (String, Some("time")),
        ScalarKind::Duration => (String, Some("duration")),
        ScalarKind::Uri => (String, Some("uri")),
        ScalarKind::Binary => (String, Some("byte")),
        ScalarKind::File => (String, Some("binary")),
        ScalarKind::Other(_) => return None,
    };
    Some(mapping)
}

/// Scalar table plus the caller's override registry
pub struct ScalarMapper {
    overrides: RwLock<BTreeMap<String, ScalarOverride>>,
    sink: Arc<dyn DiagnosticSink>,
}

impl std::fmt::Debug for ScalarMapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScalarMapper")
            .field("overrides", &self.overrides())
            .finish()
    }
}

impl ScalarMapper {
    pub fn new(sink: Arc<dyn DiagnosticSink>) -> Self {
        ScalarMapper {
            overrides: RwLock::new(BTreeMap::new()),
            sink,
        }
    }

    pub fn with_overrides(
        overrides: &BTreeMap<String, ScalarOverride>,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Self {
        let mapper = Self::new(sink);
        for (name, mapping) in overrides {
            mapper.register_override(name, mapping.clone());
        }
        mapper
    }

    /// Register an override for `type_name`.
    ///
    /// Overrides must target a scalar primitive; `array`/`object` overrides
    /// are rejected with an `unsupported_override` diagnostic and the default
    /// mapping stays in effect. Returns whether the override was accepted.
    pub fn register_override(&self, type_name: &str, mapping: ScalarOverride) -> bool {
        if matches!(
            mapping.primitive,
            PrimitiveType::Array | PrimitiveType::Object
        ) {
            self.sink.emit(
                DiagnosticEvent::new(
                    Severity::Error,
                    DiagnosticCode::UnsupportedOverride,
                    format!(
                        "override for '{type_name}' targets '{}', which is not a scalar primitive",
                        mapping.primitive.as_str()
                    ),
                )
                .with_context(json!({ "type": type_name })),
            );
            return false;
        }

        let previous = {
            let mut overrides = self
                .overrides
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            overrides.insert(type_name.to_string(), mapping.clone())
        };
        self.sink.emit(
            DiagnosticEvent::new(
                Severity::Info,
                DiagnosticCode::ScalarOverride,
                format!(
                    "scalar override registered for '{type_name}' ({}{})",
                    mapping.primitive.as_str(),
                    mapping
                        .format
                        .as_deref()
                        .map(|f| format!("/{f}"))
                        .unwrap_or_default()
                ),
            )
            .with_context(json!({ "type": type_name, "replaced": previous.is_some() })),
        );
        true
    }

    /// Override registered for the first matching name
    pub fn lookup<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Option<ScalarOverride> {
        let overrides = self
            .overrides
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        names.into_iter().find_map(|n| overrides.get(n).cloned())
    }

    /// Snapshot of every registered override
    pub fn overrides(&self) -> BTreeMap<String, ScalarOverride> {
        self.overrides
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Node for a built-in scalar, or the empty-object default
    pub fn node_for(&self, arena: &mut SchemaArena, kind: &ScalarKind) -> NodeId {
        let node = match builtin_mapping(kind) {
            Some((primitive, Some(format))) => SchemaNode::primitive(primitive).with_format(format),
            Some((primitive, None)) => SchemaNode::primitive(primitive),
            None => SchemaNode::primitive(PrimitiveType::Object),
        };
        arena.push(node)
    }

    /// Byte sequences render as base64 text
    pub fn bytes_node(&self, arena: &mut SchemaArena) -> NodeId {
        arena.push(SchemaNode::primitive(PrimitiveType::String).with_format("byte"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CollectingSink;

    #[test]
    fn test_builtin_table() {
        use PrimitiveType::*;
        let cases = [
            (ScalarKind::Int16, Integer, Some("int32")),
            (ScalarKind::UInt16, Integer, Some("int32")),
            (ScalarKind::UInt32, Integer, Some("int64")),
            (ScalarKind::Int64, Integer, Some("int64")),
            (ScalarKind::Float32, Number, Some("float")),
            (ScalarKind::Decimal, Number, Some("double")),
            (ScalarKind::Uuid, String, Some("uuid")),
            (ScalarKind::DateTime, String, Some("date-time")),
            (ScalarKind::Binary, String, Some("byte")),
            (ScalarKind::File, String, Some("binary")),
            (ScalarKind::Boolean, Boolean, None),
        ];
        for (kind, primitive, format) in cases {
            assert_eq!(builtin_mapping(&kind), Some((primitive, format)), "{kind:?}");
        }
        assert_eq!(builtin_mapping(&ScalarKind::Other("Money".into())), None);
    }

    #[test]
    fn test_unknown_scalar_defaults_to_object() {
        let mapper = ScalarMapper::new(Arc::new(CollectingSink::new()));
        let mut arena = SchemaArena::new();
        let id = mapper.node_for(&mut arena, &ScalarKind::Other("Money".into()));
        assert_eq!(arena.to_json(id), json!({"type": "object"}));
    }

    #[test]
    fn test_last_override_wins_and_is_logged() {
        let sink = Arc::new(CollectingSink::new());
        let mapper = ScalarMapper::new(sink.clone());
        mapper.register_override("Money", ScalarOverride::new(PrimitiveType::Number, None));
        mapper.register_override(
            "Money",
            ScalarOverride::new(PrimitiveType::String, Some("decimal")),
        );
        assert_eq!(
            mapper.lookup(["Money"]),
            Some(ScalarOverride::new(PrimitiveType::String, Some("decimal")))
        );
        assert_eq!(sink.count(DiagnosticCode::ScalarOverride), 2);
    }

    #[test]
    fn test_object_override_is_rejected() {
        let sink = Arc::new(CollectingSink::new());
        let mapper = ScalarMapper::new(sink.clone());
        assert!(!mapper.register_override("Money", ScalarOverride::new(PrimitiveType::Object, None)));
        assert_eq!(mapper.lookup(["Money"]), None);
        assert_eq!(sink.count(DiagnosticCode::UnsupportedOverride), 1);
    }

    #[test]
    fn test_lookup_tries_names_in_order() {
        let mapper = ScalarMapper::new(Arc::new(CollectingSink::new()));
        mapper.register_override("Money", ScalarOverride::new(PrimitiveType::Number, None));
        mapper.register_override(
            "billing.Money",
            ScalarOverride::new(PrimitiveType::String, None),
        );
        assert_eq!(
            mapper.lookup(["billing.Money", "Money"]).map(|o| o.primitive),
            Some(PrimitiveType::String)
        );
        assert_eq!(
            mapper.lookup(["other.Money", "Money"]).map(|o| o.primitive),
            Some(PrimitiveType::Number)
        );
    }
}
