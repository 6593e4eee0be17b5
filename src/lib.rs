//! # schemaforge
//!
//! **schemaforge** compiles runtime type descriptors into
//! [OpenAPI](https://spec.openapis.org/oas/v3.1.0) 3.0 / 3.1 schema objects.
//!
//! ## Overview
//!
//! Given a possibly self-referential graph of types (scalars, nullable
//! wrappers, enumerations, sequences, string-keyed maps and objects with
//! named fields and constraints), the generator produces a schema tree that:
//!
//! - **terminates** on cyclic or arbitrarily deep graphs, substituting
//!   placeholder nodes at cycles and at the depth limit
//! - is **deterministic**: the same set of types renders to byte-identical
//!   JSON across runs and processes
//! - **degrades** by truncating oversized enums and objects instead of failing,
//!   and records a [`DiagnosticEvent`](diagnostics::DiagnosticEvent) for every
//!   lossy decision
//!
//! ## Architecture
//!
//! - **[`types`]** - the type descriptor model, the [`TypeIntrospector`](types::TypeIntrospector)
//!   trait, the in-memory [`TypeGraph`](types::TypeGraph) and the type graph file format
//! - **[`classify`]** - shape classification and collection resolution
//! - **[`scalar`]** - scalar kind to primitive type/format mapping, with overrides
//! - **[`enums`]** - enumeration encoding (string or integer) and virtualization
//! - **[`constraints`]** - range, length and pattern annotation
//! - **[`guard`]** - cycle and depth protection
//! - **[`registry`]** - stable, collision-free component identifiers
//! - **[`nullability`]** - `nullable: true` (3.0) or a null union (3.1)
//! - **[`example`]** - bounded example synthesis and example precedence
//! - **[`schema`]** - the arena-backed schema node model and its JSON rendering
//! - **[`generator`]** - [`SchemaGenerator`] and multi-root [`SchemaDocument`]s
//! - **[`diagnostics`]** - diagnostic events and sinks
//! - **[`config`]** - [`GeneratorConfig`] with environment and TOML loading
//! - **[`cli`]** / **[`logging`]** - the `schemaforge` binary
//!
//! ### Generation Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Caller
//!     participant Gen as SchemaGenerator
//!     participant Guard as RecursionGuard
//!     participant Reg as IdentifierRegistry
//!     participant Null as NullabilityResolver
//!
//!     Caller->>Gen: generate(types, root)
//!     Gen->>Gen: classify(root)
//!     Gen->>Reg: assign(object type)
//!     Gen->>Guard: enter(type)
//!     alt cycle or depth limit
//!         Guard-->>Gen: Substitute(placeholder)
//!     else
//!         Guard-->>Gen: Expand
//!         Gen->>Gen: recurse into members
//!         Gen->>Guard: exit(type)
//!     end
//!     Gen->>Gen: annotate constraints
//!     Gen->>Null: apply(node, nullable)
//!     Gen-->>Caller: GeneratedSchema
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use schemaforge::diagnostics::CollectingSink;
//! use schemaforge::types::{FieldDescriptor, ObjectDescriptor, ScalarKind, TypeGraph};
//! use schemaforge::{GeneratorConfig, OpenApiVersion, SchemaGenerator};
//! use std::sync::Arc;
//!
//! let mut graph = TypeGraph::new();
//! let node = graph.declare("app.Node");
//! let label = graph.scalar(ScalarKind::String);
//! let parent = graph.nullable(node);
//! graph.define_object(
//!     node,
//!     ObjectDescriptor::new()
//!         .field(FieldDescriptor::new("label", label).required())
//!         .field(FieldDescriptor::new("parent", parent)),
//! );
//!
//! let config = GeneratorConfig::default().with_spec_version(OpenApiVersion::V3_0);
//! let generator = SchemaGenerator::new(config, Arc::new(CollectingSink::new()));
//! let document = generator.generate_document(&graph, &[node]).unwrap();
//!
//! let json = document.to_json();
//! assert_eq!(json["openapi"], "3.0.3");
//! assert_eq!(json["components"]["schemas"]["Node"]["required"][0], "label");
//! ```
//!
//! ## Command Line
//!
//! ```bash
//! schemaforge generate --types types.yaml --root Order --format yaml
//! schemaforge fingerprint --types types.yaml
//! schemaforge ids --types types.yaml
//! ```
//!
//! See [`cli`] for the flags and [`types::file`] for the type graph format.

pub mod classify;
pub mod cli;
pub mod config;
pub mod constraints;
pub mod diagnostics;
pub mod enums;
pub mod error;
pub mod example;
pub mod generator;
pub mod guard;
pub mod ids;
pub mod logging;
pub mod nullability;
pub mod registry;
pub mod scalar;
pub mod schema;
pub mod types;

pub use config::{load_config, GeneratorConfig, OpenApiVersion};
pub use diagnostics::{DiagnosticCode, DiagnosticEvent, DiagnosticSink, Severity};
pub use error::GenerationError;
pub use generator::{GeneratedSchema, SchemaDocument, SchemaGenerator};
pub use registry::IdentifierRegistry;
pub use types::{TypeGraph, TypeHandle, TypeIntrospector};
