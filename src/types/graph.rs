use super::{
    CollectionAbstraction, EnumDescriptor, ObjectDescriptor, ScalarKind, TypeDescriptor,
    TypeHandle, TypeIdentity, TypeIntrospector, TypeShape,
};
use crate::constraints::Constraint;
use serde_json::Value;
use std::collections::HashMap;

/// In-memory [`TypeIntrospector`].
///
/// Scalars, nullable wrappers, arrays and collection instantiations are
/// interned by identity, so asking twice for `List<Widget>` returns the same
/// handle. Named types are declared once and defined later, which is how
/// self-referential graphs are built.
#[derive(Debug, Clone, Default)]
pub struct TypeGraph {
    types: Vec<TypeDescriptor>,
    by_identity: HashMap<TypeIdentity, TypeHandle>,
}

/// Split `app.models.Widget` (or `app::models::Widget`) into its simple name
fn simple_name(qualified: &str) -> &str {
    let tail = qualified.rsplit("::").next().unwrap_or(qualified);
    tail.rsplit('.').next().unwrap_or(tail)
}

impl TypeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Handle previously interned or declared under `identity`
    pub fn find(&self, identity: &str) -> Option<TypeHandle> {
        self.by_identity.get(&TypeIdentity::new(identity)).copied()
    }

    pub fn identity(&self, ty: TypeHandle) -> Option<&TypeIdentity> {
        self.types.get(ty.index()).map(|d| &d.identity)
    }

    pub fn descriptor_mut(&mut self, ty: TypeHandle) -> Option<&mut TypeDescriptor> {
        self.types.get_mut(ty.index())
    }

    /// Iterate every handle in insertion order
    pub fn handles(&self) -> impl Iterator<Item = TypeHandle> + '_ {
        (0..self.types.len()).map(|i| TypeHandle(i as u32))
    }

    fn intern(
        &mut self,
        identity: TypeIdentity,
        make: impl FnOnce(TypeIdentity) -> TypeDescriptor,
    ) -> TypeHandle {
        if let Some(existing) = self.by_identity.get(&identity) {
            return *existing;
        }
        let handle = TypeHandle(self.types.len() as u32);
        self.types.push(make(identity.clone()));
        self.by_identity.insert(identity, handle);
        handle
    }

    fn identity_of(&self, ty: TypeHandle) -> String {
        self.types
            .get(ty.index())
            .map(|d| d.identity.as_str().to_string())
            .unwrap_or_else(|| format!("?{}", ty.0))
    }

    fn generic_identity(&self, outer: &str, args: &[TypeHandle]) -> TypeIdentity {
        if args.is_empty() {
            return TypeIdentity::new(outer);
        }
        let inner: Vec<String> = args.iter().map(|a| self.identity_of(*a)).collect();
        TypeIdentity::new(format!("{outer}<{}>", inner.join(",")))
    }

    pub fn scalar(&mut self, kind: ScalarKind) -> TypeHandle {
        let name = kind.name().to_string();
        self.intern(TypeIdentity::new(name.clone()), |identity| TypeDescriptor {
            identity,
            name,
            generic_args: Vec::new(),
            shape: TypeShape::Scalar(kind),
            constraints: Vec::new(),
            example: None,
        })
    }

    pub fn nullable(&mut self, inner: TypeHandle) -> TypeHandle {
        let identity = self.generic_identity("Nullable", &[inner]);
        self.intern(identity, |identity| TypeDescriptor {
            identity,
            name: "Nullable".to_string(),
            generic_args: vec![inner],
            shape: TypeShape::Nullable(inner),
            constraints: Vec::new(),
            example: None,
        })
    }

    pub fn array(&mut self, element: TypeHandle) -> TypeHandle {
        let identity = TypeIdentity::new(format!("{}[]", self.identity_of(element)));
        self.intern(identity, |identity| TypeDescriptor {
            identity,
            name: "Array".to_string(),
            generic_args: vec![element],
            shape: TypeShape::Array(element),
            constraints: Vec::new(),
            example: None,
        })
    }

    pub fn collection(
        &mut self,
        abstraction: CollectionAbstraction,
        args: Vec<TypeHandle>,
    ) -> TypeHandle {
        let name = abstraction.name().to_string();
        let identity = self.generic_identity(&name, &args);
        self.intern(identity, |identity| TypeDescriptor {
            identity,
            name,
            generic_args: args.clone(),
            shape: TypeShape::Collection { abstraction, args },
            constraints: Vec::new(),
            example: None,
        })
    }

    pub fn key_value_pair(&mut self, key: TypeHandle, value: TypeHandle) -> TypeHandle {
        let identity = self.generic_identity("KeyValuePair", &[key, value]);
        self.intern(identity, |identity| TypeDescriptor {
            identity,
            name: "KeyValuePair".to_string(),
            generic_args: vec![key, value],
            shape: TypeShape::KeyValuePair { key, value },
            constraints: Vec::new(),
            example: None,
        })
    }

    /// Declare a named type without defining it yet; it starts as an empty object.
    ///
    /// Declaring the same qualified name twice returns the original handle.
    pub fn declare(&mut self, qualified_name: &str) -> TypeHandle {
        self.declare_generic(qualified_name, Vec::new())
    }

    /// Declare a generic instantiation such as `app.Page` over `[Widget]`
    pub fn declare_generic(&mut self, qualified_name: &str, args: Vec<TypeHandle>) -> TypeHandle {
        let identity = self.generic_identity(qualified_name, &args);
        let name = simple_name(qualified_name).to_string();
        self.intern(identity, |identity| TypeDescriptor {
            identity,
            name,
            generic_args: args,
            shape: TypeShape::Object(ObjectDescriptor::default()),
            constraints: Vec::new(),
            example: None,
        })
    }

    /// Replace the shape of a declared type. Returns `false` for unknown handles.
    pub fn define(&mut self, ty: TypeHandle, shape: TypeShape) -> bool {
        match self.types.get_mut(ty.index()) {
            Some(desc) => {
                desc.shape = shape;
                true
            }
            None => false,
        }
    }

    pub fn define_object(&mut self, ty: TypeHandle, object: ObjectDescriptor) -> bool {
        self.define(ty, TypeShape::Object(object))
    }

    /// Declare and define an object in one step
    pub fn object(&mut self, qualified_name: &str, object: ObjectDescriptor) -> TypeHandle {
        let handle = self.declare(qualified_name);
        self.define_object(handle, object);
        handle
    }

    pub fn enumeration(&mut self, qualified_name: &str, descriptor: EnumDescriptor) -> TypeHandle {
        let handle = self.declare(qualified_name);
        self.define(handle, TypeShape::Enum(descriptor));
        handle
    }

    /// Declare a named opaque scalar (e.g. `Money`) that only an override can map
    pub fn opaque_scalar(&mut self, qualified_name: &str) -> TypeHandle {
        let handle = self.declare(qualified_name);
        let name = simple_name(qualified_name).to_string();
        self.define(handle, TypeShape::Scalar(ScalarKind::Other(name)));
        handle
    }

    pub fn set_constraints(&mut self, ty: TypeHandle, constraints: Vec<Constraint>) {
        if let Some(desc) = self.types.get_mut(ty.index()) {
            desc.constraints = constraints;
        }
    }

    pub fn set_example(&mut self, ty: TypeHandle, example: Value) {
        if let Some(desc) = self.types.get_mut(ty.index()) {
            desc.example = Some(example);
        }
    }
}

impl TypeIntrospector for TypeGraph {
    fn describe(&self, ty: TypeHandle) -> Option<&TypeDescriptor> {
        self.types.get(ty.index())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldDescriptor;

    #[test]
    fn test_scalars_are_interned() {
        let mut graph = TypeGraph::new();
        let a = graph.scalar(ScalarKind::String);
        let b = graph.scalar(ScalarKind::String);
        assert_eq!(a, b);
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_generic_identity_includes_arguments() {
        let mut graph = TypeGraph::new();
        let widget = graph.declare("app.models.Widget");
        let list = graph.collection(CollectionAbstraction::List, vec![widget]);
        let page = graph.declare_generic("app.Page", vec![widget]);

        assert_eq!(
            graph.identity(list).map(|i| i.as_str()),
            Some("List<app.models.Widget>")
        );
        assert_eq!(
            graph.identity(page).map(|i| i.as_str()),
            Some("app.Page<app.models.Widget>")
        );
        assert_eq!(graph.describe(page).map(|d| d.name.as_str()), Some("Page"));
        assert_eq!(graph.describe(widget).map(|d| d.name.as_str()), Some("Widget"));
    }

    #[test]
    fn test_forward_declaration_allows_self_reference() {
        let mut graph = TypeGraph::new();
        let node = graph.declare("Node");
        let next = graph.nullable(node);
        graph.define_object(
            node,
            ObjectDescriptor::new().field(FieldDescriptor::new("next", next)),
        );
        let desc = graph.describe(node).unwrap();
        match &desc.shape {
            TypeShape::Object(obj) => assert_eq!(obj.fields[0].ty, next),
            other => panic!("expected object, got {other:?}"),
        }
    }

    #[test]
    fn test_declare_is_idempotent() {
        let mut graph = TypeGraph::new();
        let a = graph.declare("a.Widget");
        let b = graph.declare("a.Widget");
        let c = graph.declare("b.Widget");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_simple_name_handles_both_separators() {
        assert_eq!(simple_name("a.b.C"), "C");
        assert_eq!(simple_name("a::b::C"), "C");
        assert_eq!(simple_name("C"), "C");
    }
}
