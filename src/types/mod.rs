//! # Type Descriptor Model
//!
//! The generator never reflects over host-language types itself. It consumes
//! a narrow [`TypeIntrospector`] contract: for any [`TypeHandle`] the provider
//! hands out, `describe` reports the structural shape, nested element/member
//! types, declared constraints and enum members in declaration order.
//!
//! [`TypeGraph`] is the bundled in-memory provider. It interns scalars and
//! generic instantiations, and supports forward declaration so that
//! self-referential graphs can be expressed:
//!
//! ```rust
//! use schemaforge::types::{CollectionAbstraction, FieldDescriptor, ObjectDescriptor, ScalarKind, TypeGraph};
//!
//! let mut graph = TypeGraph::new();
//! let node = graph.declare("app.Node");
//! let name = graph.scalar(ScalarKind::String);
//! let children = graph.collection(CollectionAbstraction::List, vec![node]);
//! graph.define_object(
//!     node,
//!     ObjectDescriptor::new()
//!         .field(FieldDescriptor::new("name", name).required())
//!         .field(FieldDescriptor::new("children", children)),
//! );
//! assert_eq!(graph.len(), 3);
//! ```

mod graph;

pub mod file;

pub use graph::TypeGraph;

use crate::constraints::Constraint;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Opaque handle to a type known by a [`TypeIntrospector`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeHandle(pub(crate) u32);

impl TypeHandle {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Stable identity of a type.
///
/// Two lookups of "the same" type always produce equal identities, within a
/// run and across process restarts. Generic instantiations include their
/// argument identities, e.g. `app.Page<app.Widget>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TypeIdentity(String);

impl TypeIdentity {
    pub fn new(identity: impl Into<String>) -> Self {
        TypeIdentity(identity.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Well-known scalar kinds
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    String,
    Char,
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    Decimal,
    Uuid,
    DateTime,
    Date,
    Time,
    Duration,
    Uri,
    /// Binary blob, rendered as base64 text
    Binary,
    /// Uploaded file handle
    File,
    /// A scalar the built-in table does not know; only an override can map it
    Other(String),
}

impl ScalarKind {
    /// Display name used for identities and base identifiers
    pub fn name(&self) -> &str {
        match self {
            ScalarKind::String => "String",
            ScalarKind::Char => "Char",
            ScalarKind::Boolean => "Boolean",
            ScalarKind::Int8 => "Int8",
            ScalarKind::Int16 => "Int16",
            ScalarKind::Int32 => "Int32",
            ScalarKind::Int64 => "Int64",
            ScalarKind::UInt8 => "UInt8",
            ScalarKind::UInt16 => "UInt16",
            ScalarKind::UInt32 => "UInt32",
            ScalarKind::UInt64 => "UInt64",
            ScalarKind::Float32 => "Float32",
            ScalarKind::Float64 => "Float64",
            ScalarKind::Decimal => "Decimal",
            ScalarKind::Uuid => "Uuid",
            ScalarKind::DateTime => "DateTime",
            ScalarKind::Date => "Date",
            ScalarKind::Time => "Time",
            ScalarKind::Duration => "Duration",
            ScalarKind::Uri => "Uri",
            ScalarKind::Binary => "Binary",
            ScalarKind::File => "File",
            ScalarKind::Other(name) => name,
        }
    }

    /// Parse the lowercase spelling used in type graph files
    pub fn from_keyword(keyword: &str) -> Option<ScalarKind> {
        let kind = match keyword {
            "string" | "str" => ScalarKind::String,
            "char" => ScalarKind::Char,
            "bool" | "boolean" => ScalarKind::Boolean,
            "i8" | "int8" => ScalarKind::Int8,
            "i16" | "int16" => ScalarKind::Int16,
            "i32" | "int32" | "int" => ScalarKind::Int32,
            "i64" | "int64" | "long" => ScalarKind::Int64,
            "u8" | "uint8" | "byte" => ScalarKind::UInt8,
            "u16" | "uint16" => ScalarKind::UInt16,
            "u32" | "uint32" => ScalarKind::UInt32,
            "u64" | "uint64" => ScalarKind::UInt64,
            "f32" | "float" | "float32" => ScalarKind::Float32,
            "f64" | "double" | "float64" => ScalarKind::Float64,
            "decimal" => ScalarKind::Decimal,
            "uuid" => ScalarKind::Uuid,
            "datetime" | "date-time" | "timestamp" => ScalarKind::DateTime,
            "date" => ScalarKind::Date,
            "time" => ScalarKind::Time,
            "duration" => ScalarKind::Duration,
            "uri" | "url" => ScalarKind::Uri,
            "binary" | "bytes" => ScalarKind::Binary,
            "file" => ScalarKind::File,
            _ => return None,
        };
        Some(kind)
    }
}

/// Underlying integer representation of an enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntegerRepr {
    pub bits: u8,
    pub signed: bool,
}

impl IntegerRepr {
    pub const I8: IntegerRepr = IntegerRepr { bits: 8, signed: true };
    pub const I16: IntegerRepr = IntegerRepr { bits: 16, signed: true };
    pub const I32: IntegerRepr = IntegerRepr { bits: 32, signed: true };
    pub const I64: IntegerRepr = IntegerRepr { bits: 64, signed: true };
    pub const U8: IntegerRepr = IntegerRepr { bits: 8, signed: false };
    pub const U16: IntegerRepr = IntegerRepr { bits: 16, signed: false };
    pub const U32: IntegerRepr = IntegerRepr { bits: 32, signed: false };
    pub const U64: IntegerRepr = IntegerRepr { bits: 64, signed: false };

    /// Parse `i8`..`i64` / `u8`..`u64`
    pub fn parse(s: &str) -> Option<IntegerRepr> {
        let repr = match s {
            "i8" => Self::I8,
            "i16" => Self::I16,
            "i32" => Self::I32,
            "i64" => Self::I64,
            "u8" => Self::U8,
            "u16" => Self::U16,
            "u32" => Self::U32,
            "u64" => Self::U64,
            _ => return None,
        };
        Some(repr)
    }
}

impl IntegerRepr {
    fn width(&self) -> u32 {
        u32::from(self.bits.clamp(1, 64))
    }

    pub fn min_value(&self) -> i128 {
        if self.signed {
            -(1i128 << (self.width() - 1))
        } else {
            0
        }
    }

    pub fn max_value(&self) -> i128 {
        if self.signed {
            (1i128 << (self.width() - 1)) - 1
        } else {
            (1i128 << self.width()) - 1
        }
    }

    pub fn contains(&self, value: i128) -> bool {
        (self.min_value()..=self.max_value()).contains(&value)
    }

    /// Whether values of this kind may need a 64-bit integer format
    pub fn is_wide(&self) -> bool {
        self.bits >= 64 || (self.bits == 32 && !self.signed)
    }
}

impl Default for IntegerRepr {
    fn default() -> Self {
        Self::I32
    }
}

/// One declared enumeration member
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumMember {
    pub name: String,
    /// Underlying value; wide enough for both `i64` and `u64` ranges
    pub value: i128,
}

impl EnumMember {
    pub fn new(name: impl Into<String>, value: i128) -> Self {
        EnumMember {
            name: name.into(),
            value,
        }
    }
}

/// Enumeration members in declaration order plus their representation
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnumDescriptor {
    pub members: Vec<EnumMember>,
    pub repr: IntegerRepr,
}

impl EnumDescriptor {
    pub fn new(repr: IntegerRepr) -> Self {
        EnumDescriptor {
            members: Vec::new(),
            repr,
        }
    }

    /// Members named in order with values `0..n`
    pub fn sequential<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let members = names
            .into_iter()
            .enumerate()
            .map(|(i, name)| EnumMember::new(name, i as i128))
            .collect();
        EnumDescriptor {
            members,
            repr: IntegerRepr::I32,
        }
    }

    pub fn member(mut self, name: impl Into<String>, value: i128) -> Self {
        self.members.push(EnumMember::new(name, value));
        self
    }

    /// The declared representation, or the narrowest 64-bit kind that holds
    /// every member when some value falls outside it
    pub fn effective_repr(&self) -> IntegerRepr {
        if self.members.iter().all(|m| self.repr.contains(m.value)) {
            return self.repr;
        }
        if self.members.iter().all(|m| IntegerRepr::I64.contains(m.value)) {
            IntegerRepr::I64
        } else {
            IntegerRepr::U64
        }
    }
}

/// Single- and two-parameter collection abstractions the resolver understands
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CollectionAbstraction {
    List,
    Set,
    Sequence,
    ReadOnlyList,
    Queue,
    Stack,
    Dictionary,
    ReadOnlyDictionary,
    /// Any other generic abstraction; never treated as a collection
    Other(String),
}

impl CollectionAbstraction {
    pub fn name(&self) -> &str {
        match self {
            CollectionAbstraction::List => "List",
            CollectionAbstraction::Set => "Set",
            CollectionAbstraction::Sequence => "Sequence",
            CollectionAbstraction::ReadOnlyList => "ReadOnlyList",
            CollectionAbstraction::Queue => "Queue",
            CollectionAbstraction::Stack => "Stack",
            CollectionAbstraction::Dictionary => "Dictionary",
            CollectionAbstraction::ReadOnlyDictionary => "ReadOnlyDictionary",
            CollectionAbstraction::Other(name) => name,
        }
    }

    /// Closed set of single-type-parameter sequence abstractions
    pub fn is_sequence(&self) -> bool {
        matches!(
            self,
            CollectionAbstraction::List
                | CollectionAbstraction::Set
                | CollectionAbstraction::Sequence
                | CollectionAbstraction::ReadOnlyList
                | CollectionAbstraction::Queue
                | CollectionAbstraction::Stack
        )
    }

    pub fn is_map(&self) -> bool {
        matches!(
            self,
            CollectionAbstraction::Dictionary | CollectionAbstraction::ReadOnlyDictionary
        )
    }

    pub fn from_name(name: &str) -> CollectionAbstraction {
        match name {
            "List" | "Vec" => CollectionAbstraction::List,
            "Set" | "HashSet" | "BTreeSet" => CollectionAbstraction::Set,
            "Sequence" | "Iterable" => CollectionAbstraction::Sequence,
            "ReadOnlyList" => CollectionAbstraction::ReadOnlyList,
            "Queue" | "VecDeque" => CollectionAbstraction::Queue,
            "Stack" => CollectionAbstraction::Stack,
            "Dictionary" | "Map" | "HashMap" | "BTreeMap" => CollectionAbstraction::Dictionary,
            "ReadOnlyDictionary" => CollectionAbstraction::ReadOnlyDictionary,
            other => CollectionAbstraction::Other(other.to_string()),
        }
    }
}

/// A capability implemented by an object type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capability {
    /// The object can be enumerated as a sequence of `T`
    Sequence(TypeHandle),
    /// The object behaves like a map from `key` to `value`
    Map { key: TypeHandle, value: TypeHandle },
}

/// A named member of an object type
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub ty: TypeHandle,
    pub required: bool,
    pub constraints: Vec<Constraint>,
    pub example: Option<Value>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, ty: TypeHandle) -> Self {
        FieldDescriptor {
            name: name.into(),
            ty,
            required: false,
            constraints: Vec::new(),
            example: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn example(mut self, example: Value) -> Self {
        self.example = Some(example);
        self
    }
}

/// Members and capabilities of a composite type
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectDescriptor {
    pub fields: Vec<FieldDescriptor>,
    pub capabilities: Vec<Capability>,
}

impl ObjectDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn capability(mut self, capability: Capability) -> Self {
        self.capabilities.push(capability);
        self
    }
}

/// Structural shape of a type, as reported by the introspector
#[derive(Debug, Clone, PartialEq)]
pub enum TypeShape {
    Scalar(ScalarKind),
    /// `T` or null
    Nullable(TypeHandle),
    Enum(EnumDescriptor),
    /// Native array `T[]`
    Array(TypeHandle),
    /// Instantiation of a known generic abstraction, e.g. `List<T>`
    Collection {
        abstraction: CollectionAbstraction,
        args: Vec<TypeHandle>,
    },
    /// Key/value pair placeholder yielded when enumerating a map
    KeyValuePair { key: TypeHandle, value: TypeHandle },
    Object(ObjectDescriptor),
}

/// Everything the generator needs to know about one type
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    pub identity: TypeIdentity,
    /// Simple display name without namespace or generic arguments
    pub name: String,
    /// Generic arguments in declaration order
    pub generic_args: Vec<TypeHandle>,
    pub shape: TypeShape,
    /// Constraints declared on the type itself
    pub constraints: Vec<Constraint>,
    /// Explicit example declared on the type
    pub example: Option<Value>,
}

/// The narrow contract against the reflection layer
pub trait TypeIntrospector {
    fn describe(&self, ty: TypeHandle) -> Option<&TypeDescriptor>;
}
