//! # Diagnostics Module
//!
//! Every lossy decision made during schema generation (cycle placeholders,
//! depth cut-offs, enum virtualization, example throttling, constraint
//! conflicts, identifier collisions) is reported as a [`DiagnosticEvent`]
//! through a [`DiagnosticSink`].
//!
//! ## Sinks
//!
//! - [`TracingSink`] - forwards events to `tracing` at the matching level
//! - [`CollectingSink`] - keeps events in memory for callers and tests
//! - [`FanoutSink`] - delivers each event to several sinks in order
//!
//! Sinks are shared between concurrent generation calls, so implementations
//! must be `Send + Sync` and serialize their own mutation.
//!
//! ## Usage
//!
//! ```rust
//! use schemaforge::diagnostics::{CollectingSink, DiagnosticCode, DiagnosticEvent, DiagnosticSink, Severity};
//!
//! let sink = CollectingSink::new();
//! sink.emit(DiagnosticEvent::new(Severity::Warn, DiagnosticCode::CycleDetected, "Node -> Node"));
//! assert_eq!(sink.count(DiagnosticCode::CycleDetected), 1);
//! ```

use crate::ids::DiagnosticId;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;
use tracing::{error, info, warn};

/// Messages longer than this are truncated before emission.
pub const MAX_MESSAGE_CHARS: usize = 512;

static CONTROL_CHARS: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"[\p{Cc}&&[^\t\n]]").ok());

/// Severity level for diagnostic events
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational: a recorded decision, nothing was lost
    Info,
    /// Warning: output degraded but generation continued
    Warn,
    /// Error: configuration problem, default behavior used instead
    Error,
    /// Critical: internal invariant violated
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
            Severity::Critical => "critical",
        };
        write!(f, "{s}")
    }
}

/// Machine-readable diagnostic code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticCode {
    CycleDetected,
    DepthExceeded,
    EnumOverflow,
    EnumVirtualized,
    ObjectVirtualized,
    ExampleThrottled,
    ConstraintConflict,
    InvalidPattern,
    IdCollision,
    ScalarOverride,
    UnsupportedOverride,
    GuardStackMismatch,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticCode::CycleDetected => "cycle_detected",
            DiagnosticCode::DepthExceeded => "depth_exceeded",
            DiagnosticCode::EnumOverflow => "enum_overflow",
            DiagnosticCode::EnumVirtualized => "enum_virtualized",
            DiagnosticCode::ObjectVirtualized => "object_virtualized",
            DiagnosticCode::ExampleThrottled => "example_throttled",
            DiagnosticCode::ConstraintConflict => "constraint_conflict",
            DiagnosticCode::InvalidPattern => "invalid_pattern",
            DiagnosticCode::IdCollision => "id_collision",
            DiagnosticCode::ScalarOverride => "scalar_override",
            DiagnosticCode::UnsupportedOverride => "unsupported_override",
            DiagnosticCode::GuardStackMismatch => "guard_stack_mismatch",
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable record of one diagnostic decision
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticEvent {
    /// Unique, time-ordered id
    pub id: DiagnosticId,
    /// Emission time
    pub timestamp: SystemTime,
    pub severity: Severity,
    pub code: DiagnosticCode,
    /// Human-readable description (already sanitized)
    pub message: String,
    /// Optional structured context (type names, counts, field names)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    /// Whether `message` was altered by sanitization
    pub sanitized: bool,
}

impl DiagnosticEvent {
    /// Create a new event, sanitizing the message.
    pub fn new(severity: Severity, code: DiagnosticCode, message: impl Into<String>) -> Self {
        let id = DiagnosticId::new();
        let (message, sanitized) = sanitize_message(&message.into());
        DiagnosticEvent {
            id,
            timestamp: id.timestamp(),
            severity,
            code,
            message,
            context: None,
            sanitized,
        }
    }

    /// Attach structured context
    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }
}

/// Replace control characters and cap the length of a message.
///
/// Returns the cleaned message and whether it differs from the input.
pub fn sanitize_message(raw: &str) -> (String, bool) {
    let mut cleaned = match CONTROL_CHARS.as_ref() {
        Some(re) => re.replace_all(raw, "\u{FFFD}").into_owned(),
        None => raw.to_string(),
    };
    if cleaned.chars().count() > MAX_MESSAGE_CHARS {
        cleaned = cleaned.chars().take(MAX_MESSAGE_CHARS).collect();
        cleaned.push('…');
    }
    let changed = cleaned != raw;
    (cleaned, changed)
}

/// Consumer of diagnostic events
pub trait DiagnosticSink: Send + Sync {
    fn emit(&self, event: DiagnosticEvent);
}

/// Forwards events to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&self, event: DiagnosticEvent) {
        let context = event
            .context
            .as_ref()
            .map(Value::to_string)
            .unwrap_or_default();
        match event.severity {
            Severity::Info => info!(
                code = event.code.as_str(),
                diagnostic_id = %event.id,
                sanitized = event.sanitized,
                context = %context,
                "{}",
                event.message
            ),
            Severity::Warn => warn!(
                code = event.code.as_str(),
                diagnostic_id = %event.id,
                sanitized = event.sanitized,
                context = %context,
                "{}",
                event.message
            ),
            Severity::Error => error!(
                code = event.code.as_str(),
                diagnostic_id = %event.id,
                sanitized = event.sanitized,
                context = %context,
                "{}",
                event.message
            ),
            Severity::Critical => error!(
                critical = true,
                code = event.code.as_str(),
                diagnostic_id = %event.id,
                sanitized = event.sanitized,
                context = %context,
                "{}",
                event.message
            ),
        }
    }
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<DiagnosticEvent>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all events collected so far, in emission order
    pub fn events(&self) -> Vec<DiagnosticEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Number of events carrying `code`
    pub fn count(&self, code: DiagnosticCode) -> usize {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .filter(|e| e.code == code)
            .count()
    }

    /// Remove and return all collected events
    pub fn drain(&self) -> Vec<DiagnosticEvent> {
        std::mem::take(
            &mut *self
                .events
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_empty()
    }
}

impl DiagnosticSink for CollectingSink {
    fn emit(&self, event: DiagnosticEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }
}

/// Delivers each event to every inner sink, in order
#[derive(Default, Clone)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn DiagnosticSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn DiagnosticSink>>) -> Self {
        Self { sinks }
    }

    pub fn push(&mut self, sink: Arc<dyn DiagnosticSink>) {
        self.sinks.push(sink);
    }
}

impl DiagnosticSink for FanoutSink {
    fn emit(&self, event: DiagnosticEvent) {
        if let Some((last, rest)) = self.sinks.split_last() {
            for sink in rest {
                sink.emit(event.clone());
            }
            last.emit(event);
        }
    }
}

impl<T: DiagnosticSink + ?Sized> DiagnosticSink for Arc<T> {
    fn emit(&self, event: DiagnosticEvent) {
        (**self).emit(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_message_is_not_sanitized() {
        let event = DiagnosticEvent::new(Severity::Info, DiagnosticCode::IdCollision, "Widget");
        assert_eq!(event.message, "Widget");
        assert!(!event.sanitized);
    }

    #[test]
    fn test_control_characters_are_replaced() {
        let (msg, changed) = sanitize_message("bad\u{0007}name");
        assert!(changed);
        assert_eq!(msg, "bad\u{FFFD}name");
    }

    #[test]
    fn test_newlines_and_tabs_survive() {
        let (msg, changed) = sanitize_message("a\tb\nc");
        assert!(!changed);
        assert_eq!(msg, "a\tb\nc");
    }

    #[test]
    fn test_long_messages_are_truncated() {
        let long = "x".repeat(MAX_MESSAGE_CHARS + 10);
        let event = DiagnosticEvent::new(Severity::Warn, DiagnosticCode::DepthExceeded, long);
        assert!(event.sanitized);
        assert_eq!(event.message.chars().count(), MAX_MESSAGE_CHARS + 1);
    }

    #[test]
    fn test_collecting_sink_counts_by_code() {
        let sink = CollectingSink::new();
        sink.emit(DiagnosticEvent::new(Severity::Warn, DiagnosticCode::CycleDetected, "a"));
        sink.emit(DiagnosticEvent::new(Severity::Warn, DiagnosticCode::CycleDetected, "b"));
        sink.emit(
            DiagnosticEvent::new(Severity::Info, DiagnosticCode::IdCollision, "c")
                .with_context(json!({"base": "Widget"})),
        );
        assert_eq!(sink.count(DiagnosticCode::CycleDetected), 2);
        assert_eq!(sink.count(DiagnosticCode::IdCollision), 1);
        assert_eq!(sink.drain().len(), 3);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_fanout_delivers_to_every_sink() {
        let a = Arc::new(CollectingSink::new());
        let b = Arc::new(CollectingSink::new());
        let fanout = FanoutSink::new(vec![a.clone() as Arc<dyn DiagnosticSink>, b.clone()]);
        fanout.emit(DiagnosticEvent::new(Severity::Error, DiagnosticCode::InvalidPattern, "p"));
        assert_eq!(a.events().len(), 1);
        assert_eq!(b.events().len(), 1);
        assert_eq!(a.events()[0].id, b.events()[0].id);
    }

    #[test]
    fn test_event_serializes_code_and_severity_as_strings() {
        let event = DiagnosticEvent::new(Severity::Critical, DiagnosticCode::GuardStackMismatch, "m");
        let v = serde_json::to_value(&event).unwrap();
        assert_eq!(v["severity"], "critical");
        assert_eq!(v["code"], "guard_stack_mismatch");
        assert!(v.get("context").is_none());
    }
}
