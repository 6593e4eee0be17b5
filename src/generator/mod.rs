//! # Schema Generator
//!
//! [`SchemaGenerator`] turns a root type into a schema tree. For every type
//! it visits the pipeline is fixed:
//!
//! 1. classify the type (scalar, bytes, nullable, enum, sequence, map, pair, object)
//! 2. recurse into element/value/member types through the recursion guard
//! 3. apply type-level, then member-level constraints
//! 4. apply nullability for the configured OpenAPI version
//!
//! Composite types are registered with the shared [`IdentifierRegistry`] when
//! their expansion starts, so a cycle placeholder can reference the
//! component being built. Each composite is expanded at most once per call;
//! later occurrences become a `$ref` to that expansion.
//!
//! Each [`generate`](SchemaGenerator::generate) call owns its arena and its
//! recursion guard; the registry, the scalar overrides and the diagnostic
//! sink are shared and safe to use from concurrent calls.
//!
//! ```rust
//! use schemaforge::diagnostics::CollectingSink;
//! use schemaforge::types::{FieldDescriptor, ObjectDescriptor, ScalarKind, TypeGraph};
//! use schemaforge::{GeneratorConfig, SchemaGenerator};
//! use std::sync::Arc;
//!
//! let mut graph = TypeGraph::new();
//! let id = graph.scalar(ScalarKind::Uuid);
//! let widget = graph.object(
//!     "app.Widget",
//!     ObjectDescriptor::new().field(FieldDescriptor::new("id", id).required()),
//! );
//!
//! let generator = SchemaGenerator::new(GeneratorConfig::default(), Arc::new(CollectingSink::new()));
//! let schema = generator.generate(&graph, widget).unwrap();
//! assert_eq!(schema.to_json()["properties"]["id"]["format"], "uuid");
//! ```

mod document;


pub use document::SchemaDocument;

use crate::classify::{classify, Classification};
use crate::config::GeneratorConfig;
use crate::constraints::{annotate, Constraint};
use crate::diagnostics::{DiagnosticCode, DiagnosticEvent, DiagnosticSink, Severity};
use crate::enums::EnumEncoder;
use crate::error::GenerationError;
use crate::example::{resolve_example, ExampleContext, ExampleSynthesizer};
use crate::guard::{Admission, RecursionGuard, Visit};
use crate::nullability::NullabilityResolver;
use crate::registry::IdentifierRegistry;
use crate::scalar::{ScalarMapper, ScalarOverride};
use crate::schema::{
    NodeId, NodeKind, PrimitiveType, Reference, SchemaArena, SchemaNode, Virtualization,
};
use crate::types::{
    FieldDescriptor, ObjectDescriptor, TypeDescriptor, TypeHandle, TypeIdentity, TypeIntrospector,
};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

/// Output of one generation call
#[derive(Debug, Clone)]
pub struct GeneratedSchema {
    pub arena: SchemaArena,
    pub root: NodeId,
    /// Component id to the node expanding that component
    pub identifiers: BTreeMap<String, NodeId>,
    /// Every component id this schema expands or points at with `$ref`
    pub components: BTreeMap<String, TypeHandle>,
}

impl GeneratedSchema {
    pub fn to_json(&self) -> Value {
        self.arena.to_json(self.root)
    }

    pub fn node(&self, id: NodeId) -> Option<&SchemaNode> {
        self.arena.get(id)
    }

    pub fn root_node(&self) -> Option<&SchemaNode> {
        self.arena.get(self.root)
    }

    /// Component ids referenced by `$ref` but not expanded in this arena
    pub fn unresolved(&self) -> impl Iterator<Item = (&String, TypeHandle)> + '_ {
        self.components
            .iter()
            .filter(|(id, _)| !self.identifiers.contains_key(*id))
            .map(|(id, ty)| (id, *ty))
    }
}

pub struct SchemaGenerator {
    config: GeneratorConfig,
    registry: Arc<IdentifierRegistry>,
    scalars: ScalarMapper,
    synthesizer: ExampleSynthesizer,
    sink: Arc<dyn DiagnosticSink>,
}

impl std::fmt::Debug for SchemaGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaGenerator")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish()
    }
}

impl SchemaGenerator {
    pub fn new(config: GeneratorConfig, sink: Arc<dyn DiagnosticSink>) -> Self {
        let registry = Arc::new(IdentifierRegistry::new(Arc::clone(&sink)));
        Self::with_registry(config, registry, sink)
    }

    /// Build a generator that shares an existing registry
    pub fn with_registry(
        config: GeneratorConfig,
        registry: Arc<IdentifierRegistry>,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Self {
        let scalars = ScalarMapper::with_overrides(&config.scalar_overrides, Arc::clone(&sink));
        let synthesizer = ExampleSynthesizer::new(config.example_budget, Arc::clone(&sink));
        SchemaGenerator {
            config,
            registry,
            scalars,
            synthesizer,
            sink,
        }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<IdentifierRegistry> {
        &self.registry
    }

    pub fn scalars(&self) -> &ScalarMapper {
        &self.scalars
    }

    pub fn synthesizer(&self) -> &ExampleSynthesizer {
        &self.synthesizer
    }

    /// Build the schema for `root`
    pub fn generate(
        &self,
        types: &dyn TypeIntrospector,
        root: TypeHandle,
    ) -> Result<GeneratedSchema, GenerationError> {
        let mut traversal = Traversal::new(self, types);
        let root_node = traversal.node_for(root, None)?;
        debug!(
            root = %root,
            nodes = traversal.arena.len(),
            components = traversal.identifiers.len(),
            "schema generated"
        );
        Ok(GeneratedSchema {
            arena: traversal.arena,
            root: root_node,
            identifiers: traversal.identifiers,
            components: traversal.components,
        })
    }

    /// Generate one component per root and collect them into a document.
    ///
    /// Roots are processed in identity order, so the same set of roots
    /// always yields the same document regardless of how it was listed.
    /// Composites expanded along the way become components too, and any
    /// type that is only reachable through a `$ref` (a depth cutoff) is
    /// generated on its own, so every reference in the document resolves.
    pub fn generate_document(
        &self,
        types: &dyn TypeIntrospector,
        roots: &[TypeHandle],
    ) -> Result<SchemaDocument, GenerationError> {
        let mut ordered: Vec<(&TypeIdentity, TypeHandle)> = roots
            .iter()
            .map(|root| {
                types
                    .describe(*root)
                    .map(|d| (&d.identity, *root))
                    .ok_or(GenerationError::UnknownType(*root))
            })
            .collect::<Result<_, _>>()?;
        ordered.sort_by(|a, b| a.0.cmp(b.0));
        ordered.dedup_by(|a, b| a.0 == b.0);

        let mut components = BTreeMap::new();
        let mut generated_roots: HashSet<TypeHandle> = HashSet::new();
        let mut pending: BTreeMap<String, TypeHandle> = BTreeMap::new();

        for (_, root) in &ordered {
            let id = self.registry.assign(types, *root)?;
            let generated = self.generate(types, *root)?;
            generated_roots.insert(*root);
            let schema = self.component_json(types, *root, &generated, generated.root);
            components.insert(id, schema);
            self.collect_components(types, &generated, &mut components, &mut pending);
        }

        // Types cut off by depth everywhere are generated as roots of their own
        while let Some((id, ty)) = pending.pop_first() {
            if components.contains_key(&id) || !generated_roots.insert(ty) {
                continue;
            }
            let generated = self.generate(types, ty)?;
            let schema = self.component_json(types, ty, &generated, generated.root);
            components.insert(id, schema);
            self.collect_components(types, &generated, &mut components, &mut pending);
        }

        info!(
            roots = ordered.len(),
            components = components.len(),
            spec_version = %self.config.spec_version,
            "schema document generated"
        );
        Ok(SchemaDocument {
            spec_version: self.config.spec_version,
            components,
        })
    }

    /// Add the composites expanded in `generated` that no earlier call
    /// supplied, and queue the ones it only references
    fn collect_components(
        &self,
        types: &dyn TypeIntrospector,
        generated: &GeneratedSchema,
        components: &mut BTreeMap<String, Value>,
        pending: &mut BTreeMap<String, TypeHandle>,
    ) {
        for (id, node) in &generated.identifiers {
            if components.contains_key(id) {
                continue;
            }
            if let Some(ty) = generated.components.get(id) {
                let schema = self.component_json(types, *ty, generated, *node);
                components.insert(id.clone(), schema);
            }
        }
        for (id, ty) in generated.unresolved() {
            if !components.contains_key(id) {
                pending.entry(id.clone()).or_insert(ty);
            }
        }
    }

    /// Render `node` as a component, attaching its example when enabled
    fn component_json(
        &self,
        types: &dyn TypeIntrospector,
        ty: TypeHandle,
        generated: &GeneratedSchema,
        node: NodeId,
    ) -> Value {
        let mut schema = generated.arena.to_json(node);
        if self.config.synthesize_examples {
            let declared = types.describe(ty).and_then(|d| d.example.clone());
            let ctx = ExampleContext {
                single: declared,
                schema: Some(node),
                ..ExampleContext::default()
            };
            let resolved =
                resolve_example(&ctx, &BTreeMap::new(), &generated.arena, &self.synthesizer);
            if let (Some(resolved), Value::Object(map)) = (resolved, &mut schema) {
                map.entry("example").or_insert(resolved.value);
            }
        }
        schema
    }
}

/// State of one generation call
struct Traversal<'g> {
    generator: &'g SchemaGenerator,
    types: &'g dyn TypeIntrospector,
    arena: SchemaArena,
    guard: RecursionGuard,
    nullability: NullabilityResolver,
    identifiers: BTreeMap<String, NodeId>,
    components: BTreeMap<String, TypeHandle>,
    rejected_overrides: HashSet<TypeHandle>,
}

impl<'g> Traversal<'g> {
    fn new(generator: &'g SchemaGenerator, types: &'g dyn TypeIntrospector) -> Self {
        Traversal {
            generator,
            types,
            arena: SchemaArena::new(),
            guard: RecursionGuard::new(generator.config.max_depth),
            nullability: NullabilityResolver::new(generator.config.nullability()),
            identifiers: BTreeMap::new(),
            components: BTreeMap::new(),
            rejected_overrides: HashSet::new(),
        }
    }

    fn sink(&self) -> &'g dyn DiagnosticSink {
        self.generator.sink.as_ref()
    }

    fn describe(&self, ty: TypeHandle) -> Result<&'g TypeDescriptor, GenerationError> {
        let types: &'g dyn TypeIntrospector = self.types;
        types.describe(ty).ok_or(GenerationError::UnknownType(ty))
    }

    fn annotate(&mut self, node: NodeId, member: &str, constraints: &[Constraint]) -> NodeId {
        annotate(&mut self.arena, node, member, constraints, self.generator.sink.as_ref())
    }

    fn node_for(
        &mut self,
        ty: TypeHandle,
        field: Option<&'g FieldDescriptor>,
    ) -> Result<NodeId, GenerationError> {
        let desc = self.describe(ty)?;
        let class = classify(self.types, desc);

        if let Classification::Nullable(inner) = class {
            let node = self.node_for(inner, field)?;
            let node = self.annotate(node, &desc.name, &desc.constraints);
            return Ok(self.nullability.apply(&mut self.arena, node, true));
        }

        let node = match self.override_for(ty, desc, &class) {
            Some(mapping) => self.arena.push(mapping.to_node()),
            None => self.expand(ty, desc, class)?,
        };

        let mut node = self.annotate(node, &desc.name, &desc.constraints);
        if let Some(field) = field {
            node = self.annotate(node, &field.name, &field.constraints);
            if let Some(example) = &field.example {
                if !self.arena[node].is_shared() {
                    self.arena[node].example = Some(example.clone());
                }
            }
        }
        Ok(self.nullability.apply(&mut self.arena, node, false))
    }

    fn override_for(
        &mut self,
        ty: TypeHandle,
        desc: &TypeDescriptor,
        class: &Classification<'_>,
    ) -> Option<ScalarOverride> {
        let mapping = self
            .generator
            .scalars
            .lookup([desc.identity.as_str(), desc.name.as_str()])?;
        match class {
            Classification::Scalar(_) | Classification::Bytes | Classification::Object(_) => {
                Some(mapping)
            }
            _ => {
                if self.rejected_overrides.insert(ty) {
                    self.sink().emit(
                        DiagnosticEvent::new(
                            Severity::Error,
                            DiagnosticCode::UnsupportedOverride,
                            format!(
                                "scalar override for '{}' ignored: the type is not a scalar or object",
                                desc.identity
                            ),
                        )
                        .with_context(json!({ "type": desc.identity.as_str() })),
                    );
                }
                None
            }
        }
    }

    fn expand(
        &mut self,
        ty: TypeHandle,
        desc: &'g TypeDescriptor,
        class: Classification<'g>,
    ) -> Result<NodeId, GenerationError> {
        match class {
            Classification::Scalar(kind) => {
                Ok(self.generator.scalars.node_for(&mut self.arena, kind))
            }
            Classification::Bytes => Ok(self.generator.scalars.bytes_node(&mut self.arena)),
            Classification::Enum(descriptor) => {
                let config = &self.generator.config;
                let encoder = EnumEncoder {
                    mode: config.enum_mode,
                    threshold: config.enum_threshold,
                    naming: config.enum_naming,
                    renamer: config.enum_renamer.as_ref(),
                    sink: self.generator.sink.as_ref(),
                };
                Ok(encoder.encode(&mut self.arena, &desc.name, descriptor))
            }
            Classification::Nullable(inner) => self.node_for(inner, None),
            Classification::Sequence(element) => self.guarded(ty, desc, None, |t| {
                let items = t.node_for(element, None)?;
                let mut node = SchemaNode::primitive(PrimitiveType::Array);
                node.items = Some(items);
                Ok(t.arena.push(node))
            }),
            Classification::Map(value) => self.guarded(ty, desc, None, |t| {
                let values = t.node_for(value, None)?;
                let mut node = SchemaNode::primitive(PrimitiveType::Object);
                node.additional_properties = Some(values);
                Ok(t.arena.push(node))
            }),
            Classification::Pair { key, value } => self.guarded(ty, desc, None, |t| {
                let key_node = t.node_for(key, None)?;
                let value_node = t.node_for(value, None)?;
                let mut node = SchemaNode::primitive(PrimitiveType::Object);
                node.properties.insert("key".to_string(), key_node);
                node.properties.insert("value".to_string(), value_node);
                node.required.insert("key".to_string());
                node.required.insert("value".to_string());
                Ok(t.arena.push(node))
            }),
            Classification::Object(Some(object)) => self.expand_object(ty, desc, object),
            Classification::Object(None) => {
                Ok(self.arena.push(SchemaNode::primitive(PrimitiveType::Object)))
            }
        }
    }

    /// Run `build` between a guard `enter` and `exit`, or return the placeholder
    fn guarded(
        &mut self,
        ty: TypeHandle,
        desc: &TypeDescriptor,
        identifier: Option<&str>,
        build: impl FnOnce(&mut Self) -> Result<NodeId, GenerationError>,
    ) -> Result<NodeId, GenerationError> {
        let visit = Visit {
            ty,
            type_name: &desc.name,
            identifier,
        };
        if let Admission::Substitute(placeholder) =
            self.guard
                .enter(&mut self.arena, visit, self.generator.sink.as_ref())
        {
            if let Some(identifier) = identifier {
                self.components.entry(identifier.to_string()).or_insert(ty);
            }
            return Ok(placeholder);
        }
        let node = build(self)?;
        if let Err(err) = self.guard.exit(ty) {
            self.sink().emit(
                DiagnosticEvent::new(
                    Severity::Critical,
                    DiagnosticCode::GuardStackMismatch,
                    err.to_string(),
                )
                .with_context(json!({ "type": desc.identity.as_str() })),
            );
            return Err(err);
        }
        Ok(node)
    }

    fn expand_object(
        &mut self,
        ty: TypeHandle,
        desc: &'g TypeDescriptor,
        object: &'g ObjectDescriptor,
    ) -> Result<NodeId, GenerationError> {
        let identifier = self.generator.registry.assign(self.types, ty)?;
        self.components.entry(identifier.clone()).or_insert(ty);
        if let Some(target) = self.identifiers.get(&identifier).copied() {
            return Ok(self.arena.push(SchemaNode::new(NodeKind::Reference(Reference {
                type_name: desc.name.clone(),
                identifier,
                target,
            }))));
        }
        let reference = identifier.clone();

        self.guarded(ty, desc, Some(reference.as_str()), move |t| {
            let mut fields: Vec<&'g FieldDescriptor> = object.fields.iter().collect();
            fields.sort_by(|a, b| a.name.cmp(&b.name));

            let total = fields.len();
            let mut virtualized = None;
            if let Some(limit) = t.generator.config.object_member_threshold {
                if total > limit {
                    fields.truncate(limit);
                    let truncated = total - limit;
                    virtualized = Some(Virtualization { total, truncated });
                    t.sink().emit(
                        DiagnosticEvent::new(
                            Severity::Info,
                            DiagnosticCode::ObjectVirtualized,
                            format!(
                                "object '{}' has {total} members; kept {limit} and dropped {truncated}",
                                desc.name
                            ),
                        )
                        .with_context(json!({
                            "type": desc.identity.as_str(),
                            "total": total,
                            "truncated": truncated,
                        })),
                    );
                }
            }

            let mut node = SchemaNode::primitive(PrimitiveType::Object);
            for field in fields {
                let child = t.node_for(field.ty, Some(field))?;
                node.properties.insert(field.name.clone(), child);
                if field.required {
                    node.required.insert(field.name.clone());
                }
            }
            node.meta.identifier = Some(identifier.clone());
            node.meta.virtualized = virtualized;

            // The recorded expansion stays untouched; the caller gets a copy
            // that field constraints and nullability may modify
            let component = t.arena.push(node.clone());
            t.identifiers.entry(identifier).or_insert(component);
            Ok(t.arena.push(node))
        })
    }
}
