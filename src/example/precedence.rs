use super::ExampleSynthesizer;
use crate::schema::{NodeId, SchemaArena};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Example sources declared for one schema, plus the schema itself
#[derive(Debug, Clone, Default)]
pub struct ExampleContext {
    /// Examples are suppressed entirely
    pub blocked: bool,
    /// Named examples in declaration order
    pub named: Vec<(String, Value)>,
    /// A single explicit example
    pub single: Option<Value>,
    /// Key into the shared example map
    pub shared_ref: Option<String>,
    /// Schema to synthesize from when nothing explicit is present
    pub schema: Option<NodeId>,
}

/// Which source produced a resolved example
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", content = "key", rename_all = "snake_case")]
pub enum ExampleSource {
    Named(String),
    Single,
    Shared(String),
    Synthesized,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedExample {
    pub source: ExampleSource,
    pub value: Value,
}

/// Pick the example for `ctx`.
///
/// Precedence: blocked, then the first named example, then the single
/// explicit example, then a resolvable shared reference, then synthesis.
/// Returns `None` when blocked, when nothing applies, or when synthesis is
/// throttled.
pub fn resolve_example(
    ctx: &ExampleContext,
    shared: &BTreeMap<String, Value>,
    arena: &SchemaArena,
    synthesizer: &ExampleSynthesizer,
) -> Option<ResolvedExample> {
    if ctx.blocked {
        return None;
    }
    if let Some((name, value)) = ctx.named.first() {
        return Some(ResolvedExample {
            source: ExampleSource::Named(name.clone()),
            value: value.clone(),
        });
    }
    if let Some(value) = &ctx.single {
        return Some(ResolvedExample {
            source: ExampleSource::Single,
            value: value.clone(),
        });
    }
    if let Some((key, value)) = ctx
        .shared_ref
        .as_ref()
        .and_then(|key| shared.get(key).map(|v| (key, v)))
    {
        return Some(ResolvedExample {
            source: ExampleSource::Shared(key.clone()),
            value: value.clone(),
        });
    }
    let schema = ctx.schema?;
    synthesizer
        .synthesize(arena, schema)
        .map(|value| ResolvedExample {
            source: ExampleSource::Synthesized,
            value,
        })
}
