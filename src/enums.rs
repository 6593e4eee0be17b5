//! Enumeration encoding.
//!
//! Enums are emitted either as their member names (string mode) or as their
//! underlying integer values (integer mode). Values that cannot be carried by
//! a signed 64-bit integer fall back to string mode with decimal-string
//! literals. Very large enums are virtualized: only the first `threshold`
//! literals are kept and the node records how many were dropped.

use crate::diagnostics::{DiagnosticCode, DiagnosticEvent, DiagnosticSink, Severity};
use crate::schema::{NodeId, PrimitiveType, SchemaArena, SchemaNode, Virtualization};
use crate::types::{EnumDescriptor, EnumMember, IntegerRepr};
use heck::{ToKebabCase, ToLowerCamelCase, ToShoutySnakeCase, ToSnakeCase, ToUpperCamelCase};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnumMode {
    /// Member names
    #[default]
    String,
    /// Underlying integer values
    Integer,
}

impl EnumMode {
    pub fn parse(s: &str) -> Option<EnumMode> {
        match s.to_ascii_lowercase().as_str() {
            "string" | "name" | "names" => Some(EnumMode::String),
            "integer" | "int" | "numeric" => Some(EnumMode::Integer),
            _ => None,
        }
    }
}

/// Casing applied to enum member names in string mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingPolicy {
    #[default]
    Preserve,
    Camel,
    Pascal,
    Snake,
    Kebab,
    ScreamingSnake,
}

impl NamingPolicy {
    pub fn parse(s: &str) -> Option<NamingPolicy> {
        match s.to_ascii_lowercase().as_str() {
            "preserve" | "none" => Some(NamingPolicy::Preserve),
            "camel" | "camelcase" => Some(NamingPolicy::Camel),
            "pascal" | "pascalcase" => Some(NamingPolicy::Pascal),
            "snake" | "snake_case" => Some(NamingPolicy::Snake),
            "kebab" | "kebab-case" => Some(NamingPolicy::Kebab),
            "screaming" | "screaming_snake" | "screaming-snake" | "shouty" => Some(NamingPolicy::ScreamingSnake),
            _ => None,
        }
    }

    pub fn apply(&self, name: &str) -> String {
        match self {
            NamingPolicy::Preserve => name.to_string(),
            NamingPolicy::Camel => name.to_lower_camel_case(),
            NamingPolicy::Pascal => name.to_upper_camel_case(),
            NamingPolicy::Snake => name.to_snake_case(),
            NamingPolicy::Kebab => name.to_kebab_case(),
            NamingPolicy::ScreamingSnake => name.to_shouty_snake_case(),
        }
    }
}

/// Caller-supplied member renaming function; takes precedence over the policy
pub type EnumRenamer = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Encodes [`EnumDescriptor`]s into schema nodes
pub struct EnumEncoder<'a> {
    pub mode: EnumMode,
    /// Literal count above which the list is truncated; `0` disables
    pub threshold: usize,
    pub naming: NamingPolicy,
    pub renamer: Option<&'a EnumRenamer>,
    pub sink: &'a dyn DiagnosticSink,
}

impl EnumEncoder<'_> {
    fn rename(&self, name: &str) -> String {
        match self.renamer {
            Some(renamer) => renamer(name),
            None => self.naming.apply(name),
        }
    }

    /// `int64` is needed when a wide representation carries a value outside
    /// the signed 32-bit range
    fn needs_int64(repr: IntegerRepr, desc: &EnumDescriptor) -> bool {
        repr.is_wide() && desc.members.iter().any(|m| i32::try_from(m.value).is_err())
    }

    /// First member an unsigned 64-bit representation holds above `i64::MAX`
    fn overflowing_member(repr: IntegerRepr, desc: &EnumDescriptor) -> Option<&EnumMember> {
        if repr.signed {
            return None;
        }
        desc.members.iter().find(|m| i64::try_from(m.value).is_err())
    }

    pub fn encode(&self, arena: &mut SchemaArena, type_name: &str, desc: &EnumDescriptor) -> NodeId {
        let (mut node, literals) = match self.mode {
            EnumMode::String => {
                let literals = desc
                    .members
                    .iter()
                    .map(|m| Value::from(self.rename(&m.name)))
                    .collect::<Vec<_>>();
                (SchemaNode::primitive(PrimitiveType::String), literals)
            }
            EnumMode::Integer => {
                let repr = desc.effective_repr();
                match Self::overflowing_member(repr, desc) {
                    Some(member) => {
                        self.sink.emit(
                            DiagnosticEvent::new(
                                Severity::Warn,
                                DiagnosticCode::EnumOverflow,
                                format!(
                                    "enum '{type_name}' member '{}' = {} does not fit a signed 64-bit integer; emitting string literals",
                                    member.name, member.value
                                ),
                            )
                            .with_context(json!({
                                "type": type_name,
                                "member": member.name,
                                "value": member.value.to_string(),
                            })),
                        );
                        let literals = desc
                            .members
                            .iter()
                            .map(|m| Value::from(m.value.to_string()))
                            .collect();
                        (SchemaNode::primitive(PrimitiveType::String), literals)
                    }
                    None => {
                        let format = if Self::needs_int64(repr, desc) { "int64" } else { "int32" };
                        let literals = desc
                            .members
                            .iter()
                            .filter_map(|m| i64::try_from(m.value).ok())
                            .map(Value::from)
                            .collect();
                        (
                            SchemaNode::primitive(PrimitiveType::Integer).with_format(format),
                            literals,
                        )
                    }
                }
            }
        };

        node.enum_values = literals;
        let total = node.enum_values.len();
        if self.threshold > 0 && total > self.threshold {
            node.enum_values.truncate(self.threshold);
            let truncated = total - self.threshold;
            node.meta.virtualized = Some(Virtualization { total, truncated });
            self.sink.emit(
                DiagnosticEvent::new(
                    Severity::Info,
                    DiagnosticCode::EnumVirtualized,
                    format!(
                        "enum '{type_name}' has {total} members; kept {} and dropped {truncated}",
                        self.threshold
                    ),
                )
                .with_context(json!({ "type": type_name, "total": total, "truncated": truncated })),
            );
        }

        arena.push(node)
    }
}
