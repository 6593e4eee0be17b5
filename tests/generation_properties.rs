#![allow(clippy::unwrap_used, clippy::expect_used)]

use schemaforge::constraints::{annotate, Constraint};
use schemaforge::diagnostics::{CollectingSink, DiagnosticCode};
use schemaforge::enums::{EnumEncoder, EnumMode, NamingPolicy};
use schemaforge::example::{resolve_example, ExampleContext, ExampleSource, ExampleSynthesizer};
use schemaforge::nullability::{NullabilityEncoding, NullabilityResolver};
use schemaforge::registry::IdentifierRegistry;
use schemaforge::schema::{NodeKind, PrimitiveType, SchemaArena, SchemaNode};
use schemaforge::types::{
    CollectionAbstraction, EnumDescriptor, FieldDescriptor, IntegerRepr, ObjectDescriptor,
    ScalarKind, TypeIdentity,
};
use schemaforge::{GeneratorConfig, SchemaGenerator, TypeGraph, TypeHandle};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

fn generator(config: GeneratorConfig) -> (SchemaGenerator, Arc<CollectingSink>) {
    let sink = Arc::new(CollectingSink::new());
    let config = config.with_example_budget(Duration::from_secs(5));
    (SchemaGenerator::new(config, sink.clone()), sink)
}

/// Category tree with a nullable back-reference, a list of children,
/// a string-keyed map and an enum
fn catalog() -> (TypeGraph, TypeHandle) {
    let mut graph = TypeGraph::new();
    let category = graph.declare("catalog.Category");
    let string = graph.scalar(ScalarKind::String);
    let count = graph.scalar(ScalarKind::Int64);
    let parent = graph.nullable(category);
    let children = graph.collection(CollectionAbstraction::List, vec![category]);
    let tags = graph.collection(CollectionAbstraction::Dictionary, vec![string, count]);
    let status = graph.enumeration(
        "catalog.Status",
        EnumDescriptor::sequential(["Draft", "Live", "Retired"]),
    );
    graph.define_object(
        category,
        ObjectDescriptor::new()
            .field(FieldDescriptor::new("name", string).required())
            .field(FieldDescriptor::new("parent", parent))
            .field(FieldDescriptor::new("children", children))
            .field(FieldDescriptor::new("tags", tags))
            .field(FieldDescriptor::new("status", status).required()),
    );
    (graph, category)
}

/// Longest chain of nested `properties` expansions below `schema`
fn expansion_depth(schema: &Value) -> usize {
    let mut deepest = 0;
    let children = ["items", "additionalProperties"]
        .iter()
        .filter_map(|k| schema.get(*k))
        .chain(
            ["anyOf", "oneOf", "allOf"]
                .iter()
                .filter_map(|k| schema.get(*k))
                .filter_map(Value::as_array)
                .flatten(),
        );
    for child in children {
        deepest = deepest.max(expansion_depth(child));
    }
    if let Some(props) = schema.get("properties").and_then(Value::as_object) {
        for child in props.values() {
            deepest = deepest.max(1 + expansion_depth(child));
        }
    }
    deepest
}

#[test]
fn identical_inputs_render_identically() {
    let render = || {
        let (graph, root) = catalog();
        let (generator, _) = generator(GeneratorConfig::default());
        let document = generator.generate_document(&graph, &[root]).unwrap();
        (
            document.to_json().to_string(),
            document.fingerprint(),
            generator.registry().assigned(),
        )
    };
    let first = render();
    let second = render();
    assert_eq!(first.0, second.0);
    assert_eq!(first.1, second.1);
    assert_eq!(first.2, second.2);
}

#[test]
fn self_reference_yields_one_placeholder_per_cycle_root() {
    let (graph, root) = catalog();
    let (generator, sink) = generator(GeneratorConfig::default());
    let schema = generator.generate(&graph, root).unwrap();

    let placeholders: Vec<_> = schema.arena.placeholders().collect();
    assert_eq!(placeholders.len(), 1);
    assert_eq!(placeholders[0].1.type_name, "Category");
    assert_eq!(sink.count(DiagnosticCode::CycleDetected), 1);

    let json = schema.to_json();
    assert_eq!(
        json["properties"]["children"]["items"]["$ref"],
        "#/components/schemas/Category"
    );
}

#[test]
fn three_type_cycle_terminates() {
    let mut graph = TypeGraph::new();
    let a = graph.declare("A");
    let b = graph.declare("B");
    let c = graph.declare("C");
    graph.define_object(a, ObjectDescriptor::new().field(FieldDescriptor::new("b", b)));
    graph.define_object(b, ObjectDescriptor::new().field(FieldDescriptor::new("c", c)));
    graph.define_object(c, ObjectDescriptor::new().field(FieldDescriptor::new("a", a)));

    let (generator, _) = generator(GeneratorConfig::default());
    let schema = generator.generate(&graph, a).unwrap();
    let placeholders: Vec<_> = schema.arena.placeholders().collect();
    assert_eq!(placeholders.len(), 1);
    assert_eq!(placeholders[0].1.type_name, "A");
    assert_eq!(
        schema.to_json()["properties"]["b"]["properties"]["c"]["properties"]["a"]["x-placeholder"]
            ["reason"],
        "cycle"
    );
}

#[test]
fn no_expansion_exceeds_max_depth() {
    let mut graph = TypeGraph::new();
    let links: Vec<TypeHandle> = (0..12).map(|i| graph.declare(&format!("Link{i}"))).collect();
    for pair in links.windows(2) {
        graph.define_object(
            pair[0],
            ObjectDescriptor::new().field(FieldDescriptor::new("next", pair[1])),
        );
    }

    for max_depth in [1, 3, 5] {
        let (generator, _) = generator(GeneratorConfig::default().with_max_depth(max_depth));
        let json = generator.generate(&graph, links[0]).unwrap().to_json();
        assert_eq!(expansion_depth(&json), max_depth, "max_depth = {max_depth}");
    }
}

#[test]
fn collision_suffixes_and_slot_reuse() {
    let sink = Arc::new(CollectingSink::new());
    let registry = IdentifierRegistry::new(sink.clone());
    let a = TypeIdentity::new("app.a.Widget");
    let b = TypeIdentity::new("app.b.Widget");
    let c = TypeIdentity::new("app.c.Widget");
    let d = TypeIdentity::new("app.d.Widget");

    assert_eq!(registry.claim(&a, "Widget"), "Widget");
    assert_eq!(registry.claim(&b, "Widget"), "Widget_dup1");
    assert_eq!(registry.claim(&c, "Widget"), "Widget_dup2");
    assert_eq!(sink.count(DiagnosticCode::IdCollision), 2);

    assert_eq!(registry.deregister(&b).as_deref(), Some("Widget_dup1"));
    assert_eq!(registry.claim(&d, "Widget"), "Widget_dup1");

    let entries = registry.entries();
    assert_eq!(entries.len(), 1);
    let ids: Vec<&str> = entries[0].claimants.iter().map(|(_, id)| id.as_str()).collect();
    assert_eq!(ids, vec!["Widget", "Widget_dup2", "Widget_dup1"]);
}

#[test]
fn unsigned_overflow_forces_string_literals() {
    let sink = CollectingSink::new();
    let encoder = EnumEncoder {
        mode: EnumMode::Integer,
        threshold: 0,
        naming: NamingPolicy::Preserve,
        renamer: None,
        sink: &sink,
    };
    let desc = EnumDescriptor::new(IntegerRepr::U64)
        .member("Low", 1)
        .member("Mid", 2)
        .member("Max", u64::MAX as i128);

    let mut arena = SchemaArena::new();
    let node = encoder.encode(&mut arena, "Flags", &desc);
    assert_eq!(
        arena.to_json(node),
        json!({"type": "string", "enum": ["1", "2", "18446744073709551615"]})
    );
    assert_eq!(sink.count(DiagnosticCode::EnumOverflow), 1);
}

#[test]
fn enum_threshold_keeps_first_members() {
    let sink = CollectingSink::new();
    let encoder = EnumEncoder {
        mode: EnumMode::String,
        threshold: 4,
        naming: NamingPolicy::Preserve,
        renamer: None,
        sink: &sink,
    };
    let desc = EnumDescriptor::sequential(["A", "B", "C", "D", "E"]);
    let mut arena = SchemaArena::new();
    let node = encoder.encode(&mut arena, "Letters", &desc);

    let json = arena.to_json(node);
    assert_eq!(json["enum"], json!(["A", "B", "C", "D"]));
    assert_eq!(json["x-virtualized"], json!({"total": 5, "truncated": 1}));
    assert_eq!(sink.count(DiagnosticCode::EnumVirtualized), 1);
}

#[test]
fn nullability_flag_and_idempotent_union() {
    let mut arena = SchemaArena::new();
    let flag = NullabilityResolver::new(NullabilityEncoding::Flag);
    let scalar = arena.push(SchemaNode::primitive(PrimitiveType::String));
    let flagged = flag.apply(&mut arena, scalar, true);
    assert_eq!(flagged, scalar);
    assert_eq!(arena.to_json(flagged), json!({"type": "string", "nullable": true}));

    let union = NullabilityResolver::new(NullabilityEncoding::Union);
    let scalar = arena.push(SchemaNode::primitive(PrimitiveType::Integer));
    let once = union.apply(&mut arena, scalar, true);
    let twice = union.apply(&mut arena, once, true);
    assert_eq!(once, twice);
    match &arena[twice].kind {
        NodeKind::AnyOf(alts) => {
            assert_eq!(alts.len(), 2);
            assert_eq!(alts.iter().filter(|a| arena[**a].is_null()).count(), 1);
        }
        other => panic!("expected anyOf, got {other:?}"),
    }
}

#[test]
fn example_precedence_chain() {
    let sink = Arc::new(CollectingSink::new());
    let synth = ExampleSynthesizer::new(Duration::from_secs(5), sink);
    let shared = BTreeMap::new();
    let mut arena = SchemaArena::new();
    let string = arena.push(SchemaNode::primitive(PrimitiveType::String));
    let integer = arena.push(SchemaNode::primitive(PrimitiveType::Integer));
    let id = arena.push(SchemaNode::primitive(PrimitiveType::Integer));
    let name = arena.push(SchemaNode::primitive(PrimitiveType::String));
    let mut object = SchemaNode::primitive(PrimitiveType::Object);
    object.properties.insert("id".into(), id);
    object.properties.insert("name".into(), name);
    let object = arena.push(object);

    let named = ExampleContext {
        named: vec![("x".into(), json!("A"))],
        single: Some(json!("B")),
        schema: Some(string),
        ..ExampleContext::default()
    };
    let resolved = resolve_example(&named, &shared, &arena, &synth).unwrap();
    assert_eq!(resolved.value, json!("A"));
    assert_eq!(resolved.source, ExampleSource::Named("x".into()));

    let single = ExampleContext {
        single: Some(json!("B")),
        schema: Some(integer),
        ..ExampleContext::default()
    };
    assert_eq!(
        resolve_example(&single, &shared, &arena, &synth).unwrap().value,
        json!("B")
    );

    let synthesized = ExampleContext {
        schema: Some(object),
        ..ExampleContext::default()
    };
    let value = resolve_example(&synthesized, &shared, &arena, &synth)
        .unwrap()
        .value;
    let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
    assert_eq!(keys, vec!["id", "name"]);

    let blocked = ExampleContext {
        blocked: true,
        named: vec![("x".into(), json!("A"))],
        ..ExampleContext::default()
    };
    assert!(resolve_example(&blocked, &shared, &arena, &synth).is_none());
}

#[test]
fn later_length_bound_wins_with_one_conflict() {
    let sink = CollectingSink::new();
    let mut arena = SchemaArena::new();
    let node = arena.push(SchemaNode::primitive(PrimitiveType::String));

    annotate(
        &mut arena,
        node,
        "code",
        &[
            Constraint::Length {
                min: Some(1),
                max: Some(10),
            },
            Constraint::Pattern {
                pattern: "^[a-z]+$".into(),
            },
        ],
        &sink,
    );
    assert_eq!(arena[node].constraints.min_length, Some(1));
    assert_eq!(arena[node].constraints.max_length, Some(10));
    assert_eq!(sink.count(DiagnosticCode::ConstraintConflict), 0);

    annotate(
        &mut arena,
        node,
        "code",
        &[Constraint::Length {
            min: Some(2),
            max: Some(5),
        }],
        &sink,
    );
    assert_eq!(arena[node].constraints.min_length, Some(2));
    assert_eq!(arena[node].constraints.max_length, Some(5));
    assert_eq!(arena[node].constraints.pattern.as_deref(), Some("^[a-z]+$"));
    assert_eq!(sink.count(DiagnosticCode::ConstraintConflict), 1);
}

fn collect_refs(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(target)) = map.get("$ref") {
                out.push(target.clone());
            }
            map.values().for_each(|v| collect_refs(v, out));
        }
        Value::Array(items) => items.iter().for_each(|v| collect_refs(v, out)),
        _ => {}
    }
}

#[test]
fn every_document_reference_resolves() {
    let mut graph = TypeGraph::new();
    let string = graph.scalar(ScalarKind::String);
    let person = graph.declare("crm.Person");
    let company = graph.declare("crm.Company");
    let staff = graph.collection(CollectionAbstraction::List, vec![person]);
    let employer = graph.nullable(company);
    graph.define_object(
        person,
        ObjectDescriptor::new()
            .field(FieldDescriptor::new("name", string).required())
            .field(FieldDescriptor::new("employer", employer))
            .field(FieldDescriptor::new("manager", person)),
    );
    graph.define_object(
        company,
        ObjectDescriptor::new()
            .field(FieldDescriptor::new("staff", staff))
            .field(FieldDescriptor::new("owner", person)),
    );
    let invoice = graph.object(
        "crm.Invoice",
        ObjectDescriptor::new()
            .field(FieldDescriptor::new("billed", company).required())
            .field(FieldDescriptor::new("contact", person)),
    );

    for max_depth in [1, 2, 32] {
        let (generator, _) = generator(GeneratorConfig::default().with_max_depth(max_depth));
        let document = generator.generate_document(&graph, &[invoice]).unwrap();
        let mut targets = Vec::new();
        collect_refs(&document.to_json(), &mut targets);
        assert!(!targets.is_empty());
        for target in targets {
            let id = target.trim_start_matches("#/components/schemas/");
            assert!(
                document.component(id).is_some(),
                "max_depth = {max_depth}: dangling {target}"
            );
        }
        let ids: Vec<&String> = document.components.keys().collect();
        assert_eq!(ids, vec!["Company", "Invoice", "Person"]);
    }
}
