//! Recursion guard.
//!
//! Tracks the types currently being expanded within one generation call.
//! Re-entering a type already on the stack, or exceeding the configured
//! depth, yields a placeholder node instead of an expansion. Each type gets
//! at most one placeholder per reason per call; every later cutoff of the
//! same type for the same reason reuses it, and only the first one is
//! reported.

use crate::diagnostics::{DiagnosticCode, DiagnosticEvent, DiagnosticSink, Severity};
use crate::error::GenerationError;
use crate::schema::{NodeId, NodeKind, Placeholder, PlaceholderReason, SchemaArena, SchemaNode};
use crate::types::TypeHandle;
use serde_json::json;
use std::collections::HashMap;

/// Default maximum expansion depth
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Outcome of [`RecursionGuard::enter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The type was pushed; the caller must expand it and then `exit`
    Expand,
    /// The expansion is cut off; use this placeholder node instead
    Substitute(NodeId),
}

/// What the guard needs to build a placeholder
#[derive(Debug, Clone, Copy)]
pub struct Visit<'a> {
    pub ty: TypeHandle,
    pub type_name: &'a str,
    /// Component id the placeholder should reference
    pub identifier: Option<&'a str>,
}

#[derive(Debug)]
pub struct RecursionGuard {
    stack: Vec<TypeHandle>,
    max_depth: usize,
    placeholders: HashMap<(TypeHandle, PlaceholderReason), NodeId>,
}

impl RecursionGuard {
    /// `max_depth` is floored at 1
    pub fn new(max_depth: usize) -> Self {
        RecursionGuard {
            stack: Vec::new(),
            max_depth: max_depth.max(1),
            placeholders: HashMap::new(),
        }
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn is_expanding(&self, ty: TypeHandle) -> bool {
        self.stack.contains(&ty)
    }

    /// Admit an expansion of `visit.ty`, or substitute a placeholder.
    ///
    /// Cycles are checked before depth, so a self-reference at the depth
    /// limit is still reported as a cycle.
    pub fn enter(
        &mut self,
        arena: &mut SchemaArena,
        visit: Visit<'_>,
        sink: &dyn DiagnosticSink,
    ) -> Admission {
        let reason = if self.is_expanding(visit.ty) {
            PlaceholderReason::Cycle
        } else if self.stack.len() >= self.max_depth {
            PlaceholderReason::Depth
        } else {
            self.stack.push(visit.ty);
            return Admission::Expand;
        };
        Admission::Substitute(self.placeholder(arena, visit, reason, sink))
    }

    fn placeholder(
        &mut self,
        arena: &mut SchemaArena,
        visit: Visit<'_>,
        reason: PlaceholderReason,
        sink: &dyn DiagnosticSink,
    ) -> NodeId {
        if let Some(existing) = self.placeholders.get(&(visit.ty, reason)) {
            return *existing;
        }

        let id = arena.push(SchemaNode::new(NodeKind::Placeholder(Placeholder {
            type_name: visit.type_name.to_string(),
            identifier: visit.identifier.map(str::to_string),
            reason,
        })));
        self.placeholders.insert((visit.ty, reason), id);

        let (code, message) = match reason {
            PlaceholderReason::Cycle => (
                DiagnosticCode::CycleDetected,
                format!("cycle detected at type '{}'", visit.type_name),
            ),
            PlaceholderReason::Depth => (
                DiagnosticCode::DepthExceeded,
                format!(
                    "maximum depth {} exceeded at type '{}'",
                    self.max_depth, visit.type_name
                ),
            ),
        };
        sink.emit(
            DiagnosticEvent::new(Severity::Warn, code, message).with_context(json!({
                "type": visit.type_name,
                "depth": self.stack.len(),
                "max_depth": self.max_depth,
            })),
        );
        id
    }

    /// Pop `ty`, which must be the innermost expansion
    pub fn exit(&mut self, ty: TypeHandle) -> Result<(), GenerationError> {
        match self.stack.last() {
            Some(top) if *top == ty => {
                self.stack.pop();
                Ok(())
            }
            other => Err(GenerationError::GuardStackMismatch {
                expected: other.copied(),
                found: ty,
            }),
        }
    }
}

impl Default for RecursionGuard {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CollectingSink;

    fn visit(ty: u32) -> Visit<'static> {
        Visit {
            ty: TypeHandle(ty),
            type_name: "T",
            identifier: None,
        }
    }

    #[test]
    fn test_cycle_yields_single_shared_placeholder() {
        let sink = CollectingSink::new();
        let mut arena = SchemaArena::new();
        let mut guard = RecursionGuard::new(8);

        assert_eq!(guard.enter(&mut arena, visit(1), &sink), Admission::Expand);
        let first = guard.enter(&mut arena, visit(1), &sink);
        let second = guard.enter(&mut arena, visit(1), &sink);
        assert!(matches!(first, Admission::Substitute(_)));
        assert_eq!(first, second);
        assert_eq!(sink.count(DiagnosticCode::CycleDetected), 1);
        assert_eq!(guard.depth(), 1);
    }

    #[test]
    fn test_depth_limit_counts_active_expansions() {
        let sink = CollectingSink::new();
        let mut arena = SchemaArena::new();
        let mut guard = RecursionGuard::new(2);

        assert_eq!(guard.enter(&mut arena, visit(1), &sink), Admission::Expand);
        assert_eq!(guard.enter(&mut arena, visit(2), &sink), Admission::Expand);
        let cut = guard.enter(&mut arena, visit(3), &sink);
        let Admission::Substitute(id) = cut else {
            panic!("expected placeholder");
        };
        match &arena[id].kind {
            NodeKind::Placeholder(p) => assert_eq!(p.reason, PlaceholderReason::Depth),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(sink.count(DiagnosticCode::DepthExceeded), 1);
    }

    #[test]
    fn test_depth_and_cycle_cutoffs_keep_their_own_reason() {
        let sink = CollectingSink::new();
        let mut arena = SchemaArena::new();
        let mut guard = RecursionGuard::new(2);

        // type 3 is cut for depth under 1 -> 2
        guard.enter(&mut arena, visit(1), &sink);
        guard.enter(&mut arena, visit(2), &sink);
        let Admission::Substitute(depth) = guard.enter(&mut arena, visit(3), &sink) else {
            panic!("expected depth placeholder");
        };
        guard.exit(TypeHandle(2)).unwrap();
        guard.exit(TypeHandle(1)).unwrap();

        // later, type 3 re-enters itself
        assert_eq!(guard.enter(&mut arena, visit(3), &sink), Admission::Expand);
        let Admission::Substitute(cycle) = guard.enter(&mut arena, visit(3), &sink) else {
            panic!("expected cycle placeholder");
        };
        assert_ne!(depth, cycle);
        let reason = |id: NodeId| match &arena[id].kind {
            NodeKind::Placeholder(p) => p.reason,
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(reason(depth), PlaceholderReason::Depth);
        assert_eq!(reason(cycle), PlaceholderReason::Cycle);
        assert_eq!(sink.count(DiagnosticCode::DepthExceeded), 1);
        assert_eq!(sink.count(DiagnosticCode::CycleDetected), 1);

        // repeats of either reason reuse the cached node
        assert_eq!(
            guard.enter(&mut arena, visit(3), &sink),
            Admission::Substitute(cycle)
        );
    }

    #[test]
    fn test_zero_depth_is_floored_to_one() {
        let guard = RecursionGuard::new(0);
        assert_eq!(guard.max_depth(), 1);
    }

    #[test]
    fn test_exit_restores_depth_and_rejects_mismatch() {
        let sink = CollectingSink::new();
        let mut arena = SchemaArena::new();
        let mut guard = RecursionGuard::new(4);

        guard.enter(&mut arena, visit(1), &sink);
        guard.enter(&mut arena, visit(2), &sink);
        assert_eq!(
            guard.exit(TypeHandle(1)),
            Err(GenerationError::GuardStackMismatch {
                expected: Some(TypeHandle(2)),
                found: TypeHandle(1),
            })
        );
        assert!(guard.exit(TypeHandle(2)).is_ok());
        assert!(guard.exit(TypeHandle(1)).is_ok());
        assert_eq!(guard.depth(), 0);
        assert!(guard.exit(TypeHandle(1)).is_err());
    }

    #[test]
    fn test_reentry_after_exit_expands_again() {
        let sink = CollectingSink::new();
        let mut arena = SchemaArena::new();
        let mut guard = RecursionGuard::new(4);

        guard.enter(&mut arena, visit(1), &sink);
        guard.exit(TypeHandle(1)).unwrap();
        assert_eq!(guard.enter(&mut arena, visit(1), &sink), Admission::Expand);
        assert!(sink.is_empty());
    }
}
