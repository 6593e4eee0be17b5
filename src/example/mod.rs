//! # Example Synthesis
//!
//! Produces a representative example value for a generated schema. The walk
//! runs under a wall-clock budget: one deadline is created per top-level
//! request and threaded through every recursive step, so nested calls never
//! restart the clock. When the budget is spent the synthesizer gives up,
//! bumps its throttle counter and reports `example_throttled`; the schema is
//! emitted without an example.
//!
//! [`resolve_example`] layers the explicit example sources on top of the
//! synthesizer with a fixed precedence.

mod precedence;

pub use precedence::{resolve_example, ExampleContext, ExampleSource, ResolvedExample};

use crate::diagnostics::{DiagnosticCode, DiagnosticEvent, DiagnosticSink, Severity};
use crate::schema::render::number_value;
use crate::schema::{NodeId, NodeKind, PrimitiveType, SchemaArena, SchemaNode};
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default per-request synthesis budget
pub const DEFAULT_EXAMPLE_BUDGET: Duration = Duration::from_millis(25);

const SAMPLE_UUID: &str = "3fa85f64-5717-4562-b3fc-2c963f66afa6";
const SAMPLE_DATE_TIME: &str = "2024-01-01T00:00:00Z";
const SAMPLE_DATE: &str = "2024-01-01";
const SAMPLE_TIME: &str = "12:00:00";
const SAMPLE_STRING: &str = "string";
/// Padding for `minLength` is appended in chunks of this many characters,
/// with a budget check before each one
const PAD_CHUNK: usize = 16 * 1024;

/// Budget of one top-level synthesis request
#[derive(Debug, Clone, Copy)]
struct Deadline {
    started: Instant,
    budget: Duration,
}

impl Deadline {
    fn new(budget: Duration) -> Self {
        Deadline {
            started: Instant::now(),
            budget,
        }
    }

    fn check(&self, node: &SchemaNode) -> Result<(), Throttled> {
        self.check_kind(node.kind.label())
    }

    fn check_kind(&self, kind: &'static str) -> Result<(), Throttled> {
        let elapsed = self.started.elapsed();
        if elapsed >= self.budget {
            return Err(Throttled {
                elapsed,
                kind,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct Throttled {
    elapsed: Duration,
    kind: &'static str,
}

pub struct ExampleSynthesizer {
    budget: Duration,
    throttled: AtomicU64,
    sink: Arc<dyn DiagnosticSink>,
}

impl std::fmt::Debug for ExampleSynthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExampleSynthesizer")
            .field("budget", &self.budget)
            .field("throttled", &self.throttled_count())
            .finish()
    }
}

impl ExampleSynthesizer {
    pub fn new(budget: Duration, sink: Arc<dyn DiagnosticSink>) -> Self {
        ExampleSynthesizer {
            budget,
            throttled: AtomicU64::new(0),
            sink,
        }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Number of requests abandoned because the budget ran out
    pub fn throttled_count(&self) -> u64 {
        self.throttled.load(Ordering::Relaxed)
    }

    /// Synthesize an example for the subtree at `node`, or `None` when throttled
    pub fn synthesize(&self, arena: &SchemaArena, node: NodeId) -> Option<Value> {
        let deadline = Deadline::new(self.budget);
        match walk(arena, node, &deadline) {
            Ok(value) => Some(value),
            Err(throttled) => {
                self.throttled.fetch_add(1, Ordering::Relaxed);
                self.sink.emit(
                    DiagnosticEvent::new(
                        Severity::Warn,
                        DiagnosticCode::ExampleThrottled,
                        format!(
                            "example synthesis abandoned after {}ms at {} schema",
                            throttled.elapsed.as_millis(),
                            throttled.kind
                        ),
                    )
                    .with_context(json!({
                        "elapsed_ms": throttled.elapsed.as_millis() as u64,
                        "budget_ms": self.budget.as_millis() as u64,
                        "kind": throttled.kind,
                    })),
                );
                None
            }
        }
    }
}

fn sample_string(node: &SchemaNode, deadline: &Deadline) -> Result<Value, Throttled> {
    let sample = match node.format.as_deref() {
        Some("uuid") => SAMPLE_UUID,
        Some("date-time") => SAMPLE_DATE_TIME,
        Some("date") => SAMPLE_DATE,
        Some("time") => SAMPLE_TIME,
        Some("email") => "user@example.com",
        Some("uri") | Some("url") => "https://example.com",
        Some("hostname") => "example.com",
        Some("ipv4") => "192.0.2.1",
        Some("duration") => "PT1H",
        Some("byte") => "c3RyaW5n",
        _ => SAMPLE_STRING,
    };
    if node.format.is_some() {
        return Ok(Value::from(sample));
    }

    let mut text = sample.to_string();
    if let Some(max) = node.constraints.max_length {
        text.truncate(usize::try_from(max).unwrap_or(usize::MAX));
    }
    if let Some(min) = node.constraints.min_length {
        // samples are ASCII, so bytes and chars agree
        let mut missing = usize::try_from(min)
            .unwrap_or(usize::MAX)
            .saturating_sub(text.len());
        while missing > 0 {
            deadline.check_kind("string")?;
            let chunk = missing.min(PAD_CHUNK);
            text.extend(std::iter::repeat('x').take(chunk));
            missing -= chunk;
        }
    }
    Ok(Value::from(text))
}

fn sample_integer(node: &SchemaNode) -> Value {
    let c = &node.constraints;
    let value = match (c.minimum, c.maximum) {
        (Some(min), _) => min.ceil(),
        (None, Some(max)) if max < 0.0 => max.floor(),
        _ => 0.0,
    };
    Value::from(value as i64)
}

fn sample_number(node: &SchemaNode) -> Value {
    let c = &node.constraints;
    match (c.minimum, c.maximum) {
        (Some(min), _) => number_value(min),
        (None, Some(max)) if max < 0.0 => number_value(max),
        _ => Value::from(0.0),
    }
}

fn walk(arena: &SchemaArena, id: NodeId, deadline: &Deadline) -> Result<Value, Throttled> {
    let Some(node) = arena.get(id) else {
        return Ok(Value::Null);
    };
    deadline.check(node)?;

    if let Some(example) = &node.example {
        return Ok(example.clone());
    }
    if let Some(first) = node.enum_values.first() {
        return Ok(first.clone());
    }

    let value = match &node.kind {
        NodeKind::Primitive(PrimitiveType::String) => sample_string(node, deadline)?,
        NodeKind::Primitive(PrimitiveType::Integer) => sample_integer(node),
        NodeKind::Primitive(PrimitiveType::Number) => sample_number(node),
        NodeKind::Primitive(PrimitiveType::Boolean) => Value::Bool(true),
        NodeKind::Primitive(PrimitiveType::Array) => {
            let mut items = Vec::new();
            if let Some(item) = node.items {
                items.push(walk(arena, item, deadline)?);
            }
            Value::Array(items)
        }
        NodeKind::Primitive(PrimitiveType::Object) => {
            let mut map = Map::new();
            for (name, child) in &node.properties {
                map.insert(name.clone(), walk(arena, *child, deadline)?);
            }
            if let Some(additional) = node.additional_properties {
                map.insert(
                    "additionalProp1".to_string(),
                    walk(arena, additional, deadline)?,
                );
            }
            Value::Object(map)
        }
        NodeKind::Null => Value::Null,
        NodeKind::AnyOf(alts) | NodeKind::OneOf(alts) => {
            match alts.iter().find(|alt| !arena[**alt].is_null()) {
                Some(alt) => walk(arena, *alt, deadline)?,
                None => Value::Null,
            }
        }
        NodeKind::AllOf(parts) => {
            let mut merged: Option<Value> = None;
            for part in parts {
                let value = walk(arena, *part, deadline)?;
                merged = Some(match (merged, value) {
                    (Some(Value::Object(mut acc)), Value::Object(more)) => {
                        acc.extend(more);
                        Value::Object(acc)
                    }
                    (Some(existing), _) => existing,
                    (None, value) => value,
                });
            }
            merged.unwrap_or(Value::Null)
        }
        NodeKind::Placeholder(_) => Value::Object(Map::new()),
        NodeKind::Reference(reference) => walk(arena, reference.target, deadline)?,
    };
    Ok(value)
}
