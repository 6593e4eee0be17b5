//! Nullability encoding.
//!
//! OpenAPI 3.0 marks nullable schemas with a `nullable: true` flag. OpenAPI
//! 3.1 has no such keyword; nullability is expressed as a union with the
//! `null` type instead.

use crate::schema::{NodeId, NodeKind, SchemaArena, SchemaNode};

/// How "may also be null" is written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullabilityEncoding {
    /// `nullable: true` (OpenAPI 3.0)
    Flag,
    /// `anyOf: [T, {type: null}]` (OpenAPI 3.1)
    Union,
}

#[derive(Debug, Clone, Copy)]
pub struct NullabilityResolver {
    encoding: NullabilityEncoding,
}

impl NullabilityResolver {
    pub fn new(encoding: NullabilityEncoding) -> Self {
        NullabilityResolver { encoding }
    }

    pub fn encoding(&self) -> NullabilityEncoding {
        self.encoding
    }

    /// Apply (or clear) nullability on `node`, returning the node to use.
    ///
    /// Placeholders and references are wrapped rather than mutated. Applying
    /// nullability twice never adds a second null alternative.
    pub fn apply(&self, arena: &mut SchemaArena, node: NodeId, nullable: bool) -> NodeId {
        let is_shared = arena[node].is_shared();

        if !nullable {
            if !is_shared {
                arena[node].nullable = false;
            }
            return node;
        }

        match self.encoding {
            NullabilityEncoding::Flag => {
                if is_shared {
                    let mut wrapper = SchemaNode::new(NodeKind::AllOf(vec![node]));
                    wrapper.nullable = true;
                    arena.push(wrapper)
                } else {
                    arena[node].nullable = true;
                    node
                }
            }
            NullabilityEncoding::Union => {
                let alternatives = match &arena[node].kind {
                    NodeKind::AnyOf(alts) | NodeKind::OneOf(alts) => Some(alts.clone()),
                    _ => None,
                };
                match alternatives {
                    Some(alts) => {
                        if !alts.iter().any(|alt| arena[*alt].is_null()) {
                            let null = arena.null_leaf();
                            if let NodeKind::AnyOf(alts) | NodeKind::OneOf(alts) =
                                &mut arena[node].kind
                            {
                                alts.push(null);
                            }
                        }
                        node
                    }
                    None => {
                        let null = arena.null_leaf();
                        arena.push(SchemaNode::new(NodeKind::AnyOf(vec![node, null])))
                    }
                }
            }
        }
    }
}
