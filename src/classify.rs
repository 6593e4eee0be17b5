//! Type classification.
//!
//! Decides how a type is expanded: as a scalar, a byte blob, a nullable
//! wrapper, an enum, a sequence, a string-keyed map, a key/value pair or a
//! plain object. Byte sequences are intercepted before array detection.
//!
//! The collection rules:
//!
//! 1. A native array, or an instantiation of a single-parameter sequence
//!    abstraction, is a sequence of its element type, unless the element is
//!    a key/value pair.
//! 2. A two-parameter map abstraction, or an object implementing a map
//!    capability, is a map only when its key is exactly the string scalar.
//!    Map capabilities are checked before sequence capabilities.
//! 3. Anything else, including non-string-keyed maps, is an object.

use crate::types::{
    Capability, EnumDescriptor, ObjectDescriptor, ScalarKind, TypeDescriptor, TypeHandle,
    TypeIntrospector, TypeShape,
};

/// How a type should be expanded
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Classification<'a> {
    Scalar(&'a ScalarKind),
    /// Byte array rendered as base64 text
    Bytes,
    Nullable(TypeHandle),
    Enum(&'a EnumDescriptor),
    Sequence(TypeHandle),
    /// String-keyed map; carries the value type
    Map(TypeHandle),
    Pair { key: TypeHandle, value: TypeHandle },
    /// Composite with members; `None` for shapes with no member list
    Object(Option<&'a ObjectDescriptor>),
}

/// Result of the collection resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionShape {
    Sequence(TypeHandle),
    Map(TypeHandle),
    NotCollection,
}

fn is_string(types: &dyn TypeIntrospector, ty: TypeHandle) -> bool {
    matches!(
        types.describe(ty).map(|d| &d.shape),
        Some(TypeShape::Scalar(ScalarKind::String))
    )
}

fn is_pair(types: &dyn TypeIntrospector, ty: TypeHandle) -> bool {
    matches!(
        types.describe(ty).map(|d| &d.shape),
        Some(TypeShape::KeyValuePair { .. })
    )
}

fn is_byte(types: &dyn TypeIntrospector, ty: TypeHandle) -> bool {
    matches!(
        types.describe(ty).map(|d| &d.shape),
        Some(TypeShape::Scalar(ScalarKind::UInt8))
    )
}

fn sequence_of(types: &dyn TypeIntrospector, element: TypeHandle) -> CollectionShape {
    if is_pair(types, element) {
        CollectionShape::NotCollection
    } else {
        CollectionShape::Sequence(element)
    }
}

fn map_of(types: &dyn TypeIntrospector, key: TypeHandle, value: TypeHandle) -> CollectionShape {
    if is_string(types, key) {
        CollectionShape::Map(value)
    } else {
        CollectionShape::NotCollection
    }
}

/// Decide whether a type is a sequence, a string-keyed map, or neither
pub fn resolve_collection(types: &dyn TypeIntrospector, desc: &TypeDescriptor) -> CollectionShape {
    match &desc.shape {
        TypeShape::Array(element) => sequence_of(types, *element),
        TypeShape::Collection { abstraction, args } => match args.as_slice() {
            [key, value] if abstraction.is_map() => map_of(types, *key, *value),
            [element] if abstraction.is_sequence() => sequence_of(types, *element),
            _ => CollectionShape::NotCollection,
        },
        TypeShape::Object(object) => {
            let map = object.capabilities.iter().find_map(|c| match c {
                Capability::Map { key, value } if is_string(types, *key) => Some(*value),
                _ => None,
            });
            if let Some(value) = map {
                return CollectionShape::Map(value);
            }
            object
                .capabilities
                .iter()
                .find_map(|c| match c {
                    Capability::Sequence(element) if !is_pair(types, *element) => {
                        Some(CollectionShape::Sequence(*element))
                    }
                    _ => None,
                })
                .unwrap_or(CollectionShape::NotCollection)
        }
        _ => CollectionShape::NotCollection,
    }
}

pub fn classify<'a>(types: &dyn TypeIntrospector, desc: &'a TypeDescriptor) -> Classification<'a> {
    match &desc.shape {
        TypeShape::Array(element) if is_byte(types, *element) => return Classification::Bytes,
        TypeShape::Scalar(kind) => return Classification::Scalar(kind),
        TypeShape::Nullable(inner) => return Classification::Nullable(*inner),
        TypeShape::Enum(descriptor) => return Classification::Enum(descriptor),
        TypeShape::KeyValuePair { key, value } => {
            return Classification::Pair {
                key: *key,
                value: *value,
            }
        }
        _ => {}
    }

    match resolve_collection(types, desc) {
        CollectionShape::Sequence(element) => Classification::Sequence(element),
        CollectionShape::Map(value) => Classification::Map(value),
        CollectionShape::NotCollection => match &desc.shape {
            TypeShape::Object(object) => Classification::Object(Some(object)),
            _ => Classification::Object(None),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CollectionAbstraction, FieldDescriptor, TypeGraph};

    fn classify_handle(graph: &TypeGraph, ty: TypeHandle) -> Classification<'_> {
        classify(graph, graph.describe(ty).unwrap())
    }

    #[test]
    fn test_native_array_is_sequence() {
        let mut graph = TypeGraph::new();
        let s = graph.scalar(ScalarKind::String);
        let arr = graph.array(s);
        assert_eq!(classify_handle(&graph, arr), Classification::Sequence(s));
    }

    #[test]
    fn test_byte_array_is_intercepted() {
        let mut graph = TypeGraph::new();
        let b = graph.scalar(ScalarKind::UInt8);
        let arr = graph.array(b);
        assert_eq!(classify_handle(&graph, arr), Classification::Bytes);
    }

    #[test]
    fn test_string_keyed_dictionary_is_map() {
        let mut graph = TypeGraph::new();
        let s = graph.scalar(ScalarKind::String);
        let i = graph.scalar(ScalarKind::Int32);
        let dict = graph.collection(CollectionAbstraction::Dictionary, vec![s, i]);
        assert_eq!(classify_handle(&graph, dict), Classification::Map(i));
    }

    #[test]
    fn test_int_keyed_dictionary_is_object() {
        let mut graph = TypeGraph::new();
        let i = graph.scalar(ScalarKind::Int32);
        let s = graph.scalar(ScalarKind::String);
        let dict = graph.collection(CollectionAbstraction::Dictionary, vec![i, s]);
        assert_eq!(classify_handle(&graph, dict), Classification::Object(None));
    }

    #[test]
    fn test_sequence_of_pairs_is_not_a_sequence() {
        let mut graph = TypeGraph::new();
        let s = graph.scalar(ScalarKind::String);
        let pair = graph.key_value_pair(s, s);
        let list = graph.collection(CollectionAbstraction::List, vec![pair]);
        assert_eq!(classify_handle(&graph, list), Classification::Object(None));
    }

    #[test]
    fn test_map_capability_wins_over_sequence_capability() {
        let mut graph = TypeGraph::new();
        let s = graph.scalar(ScalarKind::String);
        let i = graph.scalar(ScalarKind::Int64);
        let pair = graph.key_value_pair(s, i);
        let bag = graph.object(
            "app.Bag",
            ObjectDescriptor::new()
                .capability(Capability::Sequence(pair))
                .capability(Capability::Map { key: s, value: i }),
        );
        assert_eq!(classify_handle(&graph, bag), Classification::Map(i));
    }

    #[test]
    fn test_object_with_sequence_capability() {
        let mut graph = TypeGraph::new();
        let s = graph.scalar(ScalarKind::String);
        let tags = graph.object(
            "app.Tags",
            ObjectDescriptor::new().capability(Capability::Sequence(s)),
        );
        assert_eq!(classify_handle(&graph, tags), Classification::Sequence(s));
    }

    #[test]
    fn test_plain_object_and_unknown_abstraction() {
        let mut graph = TypeGraph::new();
        let s = graph.scalar(ScalarKind::String);
        let widget = graph.object(
            "app.Widget",
            ObjectDescriptor::new().field(FieldDescriptor::new("name", s)),
        );
        assert!(matches!(
            classify_handle(&graph, widget),
            Classification::Object(Some(obj)) if obj.fields.len() == 1
        ));

        let lazy = graph.collection(CollectionAbstraction::Other("Lazy".into()), vec![s]);
        assert_eq!(classify_handle(&graph, lazy), Classification::Object(None));
    }
}
