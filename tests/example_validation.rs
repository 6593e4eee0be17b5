#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Synthesized examples must validate against the schema they were built from.

use schemaforge::constraints::Constraint;
use schemaforge::diagnostics::{CollectingSink, DiagnosticCode};
use schemaforge::types::{
    CollectionAbstraction, EnumDescriptor, FieldDescriptor, ObjectDescriptor, ScalarKind,
};
use schemaforge::{GeneratorConfig, SchemaGenerator, TypeGraph, TypeHandle};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

fn validate(schema: &Value, instance: &Value) -> Result<(), Vec<String>> {
    let validator = jsonschema::validator_for(schema).expect("schema should compile");
    let errors: Vec<String> = validator
        .iter_errors(instance)
        .map(|e| format!("{e}"))
        .collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Acyclic order model covering every scalar family and container shape
fn order_graph() -> (TypeGraph, Vec<TypeHandle>) {
    let mut graph = TypeGraph::new();
    let string = graph.scalar(ScalarKind::String);
    let uuid = graph.scalar(ScalarKind::Uuid);
    let placed = graph.scalar(ScalarKind::DateTime);
    let quantity = graph.scalar(ScalarKind::Int32);
    let price = graph.scalar(ScalarKind::Decimal);
    let gift = graph.scalar(ScalarKind::Boolean);
    let byte = graph.scalar(ScalarKind::UInt8);
    let signature = graph.array(byte);
    let note = graph.nullable(string);
    let weight = graph.scalar(ScalarKind::Float64);
    let weights = graph.collection(CollectionAbstraction::Dictionary, vec![string, weight]);

    let status = graph.enumeration(
        "shop.Status",
        EnumDescriptor::sequential(["Pending", "Paid", "Shipped"]),
    );
    let address = graph.object(
        "shop.Address",
        ObjectDescriptor::new()
            .field(
                FieldDescriptor::new("postcode", string)
                    .required()
                    .constraint(Constraint::Length {
                        min: Some(3),
                        max: Some(8),
                    }),
            )
            .field(FieldDescriptor::new("city", string).required()),
    );
    let line = graph.object(
        "shop.Line",
        ObjectDescriptor::new()
            .field(FieldDescriptor::new("sku", string).required())
            .field(
                FieldDescriptor::new("quantity", quantity)
                    .required()
                    .constraint(Constraint::Range {
                        min: Some(5.0),
                        max: Some(10.0),
                    }),
            )
            .field(FieldDescriptor::new("unit_price", price)),
    );
    let lines = graph.collection(CollectionAbstraction::List, vec![line]);
    let order = graph.object(
        "shop.Order",
        ObjectDescriptor::new()
            .field(FieldDescriptor::new("id", uuid).required())
            .field(FieldDescriptor::new("placed_at", placed).required())
            .field(FieldDescriptor::new("status", status).required())
            .field(FieldDescriptor::new("lines", lines).required())
            .field(FieldDescriptor::new("ship_to", address))
            .field(FieldDescriptor::new("note", note))
            .field(FieldDescriptor::new("gift", gift))
            .field(FieldDescriptor::new("signature", signature))
            .field(FieldDescriptor::new("weights", weights)),
    );
    (graph, vec![order, line, address, status])
}

#[test]
fn synthesized_examples_validate_against_3_1_schemas() {
    let (graph, roots) = order_graph();
    let sink = Arc::new(CollectingSink::new());
    let config = GeneratorConfig::default().with_example_budget(Duration::from_secs(5));
    let generator = SchemaGenerator::new(config, sink.clone());
    let document = generator.generate_document(&graph, &roots).unwrap();
    assert_eq!(document.components.len(), 4);

    for (id, component) in &document.components {
        let mut schema = component.clone();
        let example = schema
            .as_object_mut()
            .and_then(|map| map.remove("example"))
            .unwrap_or_else(|| panic!("component {id} has no example"));
        if let Err(errors) = validate(&schema, &example) {
            panic!("example for {id} does not validate: {errors:?}\n{example}");
        }
    }
    assert_eq!(sink.count(DiagnosticCode::ExampleThrottled), 0);
}

#[test]
fn constrained_members_are_honoured() {
    let (graph, roots) = order_graph();
    let config = GeneratorConfig::default().with_example_budget(Duration::from_secs(5));
    let generator = SchemaGenerator::new(config, Arc::new(CollectingSink::new()));
    let document = generator.generate_document(&graph, &roots).unwrap();

    let line = document.component("Line").unwrap();
    assert_eq!(line["properties"]["quantity"]["minimum"], 5);
    assert_eq!(line["example"]["quantity"], 5);

    let address = document.component("Address").unwrap();
    let postcode = address["example"]["postcode"].as_str().unwrap();
    assert!((3..=8).contains(&postcode.len()), "{postcode}");
}

#[test]
fn invalid_instances_are_rejected() {
    let (graph, roots) = order_graph();
    let config = GeneratorConfig::default().with_example_budget(Duration::from_secs(5));
    let generator = SchemaGenerator::new(config, Arc::new(CollectingSink::new()));
    let document = generator.generate_document(&graph, &roots).unwrap();

    let mut line = document.component("Line").unwrap().clone();
    line.as_object_mut().unwrap().remove("example");
    let too_many = serde_json::json!({"sku": "A-1", "quantity": 11});
    assert!(validate(&line, &too_many).is_err());
    let missing_sku = serde_json::json!({"quantity": 6});
    assert!(validate(&line, &missing_sku).is_err());
}
