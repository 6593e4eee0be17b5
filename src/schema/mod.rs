//! # Schema Node Model
//!
//! Schemas are built into a [`SchemaArena`] and addressed by [`NodeId`].
//! Placeholder nodes created for cycles and depth cutoffs are shared by every
//! occurrence within one generation call, so the arena is a DAG rather than a
//! tree; mutation always goes through the arena, and shared placeholders are
//! never mutated once created. A composite that was already expanded earlier
//! in the same call is emitted as a [`Reference`] to that expansion, which
//! keeps the arena linear in the number of distinct types.
//!
//! Rendering to JSON is deterministic: map keys come out in lexical order and
//! `required` is sorted.

pub(crate) mod render;

pub use render::COMPONENT_REF_PREFIX;


use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::{Index, IndexMut};

/// Index of a node inside a [`SchemaArena`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// OpenAPI primitive `type` keyword values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl PrimitiveType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrimitiveType::String => "string",
            PrimitiveType::Integer => "integer",
            PrimitiveType::Number => "number",
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Array => "array",
            PrimitiveType::Object => "object",
        }
    }
}

/// Why an expansion was replaced by a placeholder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaceholderReason {
    Cycle,
    Depth,
}

impl PlaceholderReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaceholderReason::Cycle => "cycle",
            PlaceholderReason::Depth => "depth",
        }
    }
}

/// Stand-in for a type whose expansion was cut off
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    /// Display name of the cut-off type
    pub type_name: String,
    /// Registered component id, rendered as a `$ref` when present
    pub identifier: Option<String>,
    pub reason: PlaceholderReason,
}

/// Repeat visit to a composite already expanded in the same call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub type_name: String,
    /// Component id, rendered as the `$ref` target
    pub identifier: String,
    /// The completed expansion inside the same arena
    pub target: NodeId,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Primitive(PrimitiveType),
    /// The `null` type leaf used by union nullability encoding
    Null,
    AnyOf(Vec<NodeId>),
    OneOf(Vec<NodeId>),
    AllOf(Vec<NodeId>),
    Placeholder(Placeholder),
    Reference(Reference),
}

impl NodeKind {
    /// Short label for diagnostics
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Primitive(p) => p.as_str(),
            NodeKind::Null => "null",
            NodeKind::AnyOf(_) => "anyOf",
            NodeKind::OneOf(_) => "oneOf",
            NodeKind::AllOf(_) => "allOf",
            NodeKind::Placeholder(_) => "placeholder",
            NodeKind::Reference(_) => "reference",
        }
    }
}

/// Validation keywords attached to a node
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeConstraints {
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    /// `minLength`, or `minItems` on arrays
    pub min_length: Option<u64>,
    /// `maxLength`, or `maxItems` on arrays
    pub max_length: Option<u64>,
    pub pattern: Option<String>,
}

impl NodeConstraints {
    pub fn is_empty(&self) -> bool {
        self.minimum.is_none()
            && self.maximum.is_none()
            && self.min_length.is_none()
            && self.max_length.is_none()
            && self.pattern.is_none()
    }
}

/// Records that a literal or member list was cut to a threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Virtualization {
    pub total: usize,
    pub truncated: usize,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeMeta {
    /// Component id of the composite type this node expands
    pub identifier: Option<String>,
    pub virtualized: Option<Virtualization>,
}

/// One schema object
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaNode {
    pub kind: NodeKind,
    pub format: Option<String>,
    /// Flag-style nullability (`nullable: true`)
    pub nullable: bool,
    /// Enumerated literals, in emission order
    pub enum_values: Vec<Value>,
    pub properties: BTreeMap<String, NodeId>,
    pub required: BTreeSet<String>,
    pub items: Option<NodeId>,
    pub additional_properties: Option<NodeId>,
    pub constraints: NodeConstraints,
    pub example: Option<Value>,
    pub meta: NodeMeta,
}

impl SchemaNode {
    pub fn new(kind: NodeKind) -> Self {
        SchemaNode {
            kind,
            format: None,
            nullable: false,
            enum_values: Vec::new(),
            properties: BTreeMap::new(),
            required: BTreeSet::new(),
            items: None,
            additional_properties: None,
            constraints: NodeConstraints::default(),
            example: None,
            meta: NodeMeta::default(),
        }
    }

    pub fn primitive(primitive: PrimitiveType) -> Self {
        Self::new(NodeKind::Primitive(primitive))
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self.kind, NodeKind::Placeholder(_))
    }

    /// Placeholders and references stand for another node and are never
    /// mutated; keywords go on a wrapper instead
    pub fn is_shared(&self) -> bool {
        matches!(self.kind, NodeKind::Placeholder(_) | NodeKind::Reference(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self.kind, NodeKind::Null)
    }

    pub fn primitive_type(&self) -> Option<PrimitiveType> {
        match self.kind {
            NodeKind::Primitive(p) => Some(p),
            _ => None,
        }
    }
}

/// Owner of every node produced by one generation call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaArena {
    nodes: Vec<SchemaNode>,
}

impl SchemaArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, node: SchemaNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    pub fn get(&self, id: NodeId) -> Option<&SchemaNode> {
        self.nodes.get(id.0)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut SchemaNode> {
        self.nodes.get_mut(id.0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn null_leaf(&mut self) -> NodeId {
        self.push(SchemaNode::new(NodeKind::Null))
    }

    /// Every placeholder node in the arena
    pub fn placeholders(&self) -> impl Iterator<Item = (NodeId, &Placeholder)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, node)| match &node.kind {
                NodeKind::Placeholder(p) => Some((NodeId(i), p)),
                _ => None,
            })
    }

    /// Render the subtree rooted at `id` as an OpenAPI schema object
    pub fn to_json(&self, id: NodeId) -> Value {
        render::render(self, id)
    }
}

impl Index<NodeId> for SchemaArena {
    type Output = SchemaNode;

    fn index(&self, id: NodeId) -> &SchemaNode {
        &self.nodes[id.0]
    }
}

impl IndexMut<NodeId> for SchemaArena {
    fn index_mut(&mut self, id: NodeId) -> &mut SchemaNode {
        &mut self.nodes[id.0]
    }
}
