//! End-to-end tests over the parse → expand → validate pipeline.
//!
//! Covers the named scenarios (required property, unanchored pattern, root
//! `$ref`, cross-document reference), the expansion properties (dangling
//! set, idempotence, cycles) and the relationship between the two
//! validation modes.

use hyperschema_core::{ErrorKind, HyperschemaError, SchemaConfig};
use hyperschema_schema::{DocumentStore, Expander, Mode, Parser, SchemaGraph, SchemaSet};
use serde_json::{json, Value};

fn compile(schema: Value) -> (SchemaSet, hyperschema_core::NodeId) {
    let mut set = SchemaSet::default();
    let root = set.compile(&schema).expect("schema compiles");
    (set, root)
}

fn expand_errors(schema: Value) -> Vec<(ErrorKind, String)> {
    let mut set = SchemaSet::default();
    match set.compile(&schema) {
        Err(HyperschemaError::Expand(errors)) => errors
            .into_iter()
            .map(|e| (e.kind, e.message))
            .collect(),
        other => panic!("expected expansion errors, got {other:?}"),
    }
}

// =========================================================================
// Scenarios
// =========================================================================

#[test]
fn required_name_scenario() {
    let (set, root) = compile(json!({
        "type": "object",
        "required": ["name"],
        "properties": { "name": { "type": "string" } }
    }));
    assert!(set.validate(root, &json!({ "name": "x" })).is_ok());

    let errors = set.validate(root, &json!({})).unwrap_err();
    assert_eq!(errors.len(), 1);
    assert!(errors.errors()[0].message.contains("\"name\""));
    assert_eq!(errors.to_string(), "#: \"name\" wasn't supplied.");
}

#[test]
fn pattern_scenario() {
    let (set, root) = compile(json!({ "type": "string", "pattern": "^[a-z]+$" }));
    assert!(set.validate(root, &json!("abc")).is_ok());
    let errors = set.validate(root, &json!("ABC")).unwrap_err();
    assert_eq!(errors.errors()[0].kind, ErrorKind::PatternFailed);
}

#[test]
fn root_reference_scenario() {
    let (set, root) = compile(json!({
        "$ref": "#/definitions/x",
        "definitions": { "x": { "type": "integer" } }
    }));
    assert!(set.validate(root, &json!(5)).is_ok());
    let errors = set.validate(root, &json!("5")).unwrap_err();
    assert_eq!(errors.errors()[0].kind, ErrorKind::TypeFailed);
}

#[test]
fn preloaded_store_scenario() {
    let mut set = SchemaSet::default();
    set.initialize_store(&[json!({
        "id": "/schemata/app",
        "definitions": {
            "name": { "type": "string", "minLength": 3, "pattern": "^[a-z-]+$" }
        }
    })])
    .unwrap();

    let root = set
        .compile(&json!({ "$ref": "/schemata/app#/definitions/name" }))
        .unwrap();
    assert_eq!(set.graph().node(root).uri.as_deref(), Some("/schemata/app"));
    assert!(set.validate(root, &json!("my-app")).is_ok());
    let errors = set.validate(root, &json!("AB")).unwrap_err();
    assert_eq!(
        errors.iter().map(|e| e.kind).collect::<Vec<_>>(),
        vec![ErrorKind::MinLengthFailed, ErrorKind::PatternFailed]
    );
}

#[test]
fn hyper_schema_document() {
    let (set, root) = compile(json!({
        "id": "/schemata/app",
        "definitions": {
            "name": { "type": "string", "pattern": "^[a-z][a-z0-9-]{2,30}$" },
            "identity": { "anyOf": [{ "$ref": "#/definitions/name" }] }
        },
        "properties": { "name": { "$ref": "#/definitions/name" } },
        "links": [{
            "href": "/apps/{(%23%2Fdefinitions%2Fidentity)}",
            "method": "PATCH",
            "rel": "update",
            "schema": {
                "properties": { "name": { "$ref": "#/definitions/name" } },
                "strictProperties": true
            },
            "targetSchema": { "$ref": "#" }
        }]
    }));
    let graph = set.graph();
    let link = graph.node(root).keywords.links[0];
    let request = graph.node(link).link.as_ref().unwrap().schema.unwrap();

    assert!(set.validate(request, &json!({ "name": "my-app" })).is_ok());
    let errors = set.validate(request, &json!({ "name": "x", "extra": 1 })).unwrap_err();
    assert_eq!(
        errors.iter().map(|e| e.kind).collect::<Vec<_>>(),
        vec![ErrorKind::PatternFailed, ErrorKind::InvalidKeys]
    );
    assert_eq!(errors.errors()[0].pointer, "#/links/0/schema/properties/name");
    assert_eq!(errors.errors()[0].path.to_string(), "#/name");

    let target = graph.node(link).link.as_ref().unwrap().target_schema.unwrap();
    assert!(set.validate(target, &json!({ "name": "my-app" })).is_ok());
}

// =========================================================================
// Expansion properties
// =========================================================================

#[test]
fn dangling_references_are_reported_sorted() {
    let errors = expand_errors(json!({
        "properties": {
            "b": { "$ref": "#/definitions/zeta" },
            "a": { "$ref": "#/definitions/alpha" },
            "c": { "$ref": "#/definitions/alpha" }
        }
    }));
    let (kind, message) = errors.last().unwrap();
    assert_eq!(*kind, ErrorKind::UnresolvedReferences);
    assert_eq!(
        message,
        "Couldn't resolve references: #/definitions/alpha, #/definitions/zeta."
    );
    assert_eq!(
        errors
            .iter()
            .filter(|(kind, _)| *kind == ErrorKind::UnresolvedReferences)
            .count(),
        1
    );
}

#[test]
fn well_formed_schema_expands_completely() {
    let config = SchemaConfig::new();
    let mut graph = SchemaGraph::new();
    let root = Parser::new(&config)
        .parse(
            &mut graph,
            &json!({
                "definitions": {
                    "tree": {
                        "type": "object",
                        "properties": {
                            "children": { "type": "array", "items": { "$ref": "#/definitions/tree" } },
                            "parent": { "$ref": "#/definitions/tree" },
                            "label": { "$ref": "#/definitions/label" }
                        }
                    },
                    "label": { "type": "string" }
                },
                "allOf": [{ "$ref": "#/definitions/tree" }]
            }),
        )
        .unwrap();
    Expander::new(&config)
        .expand(&mut graph, root, &DocumentStore::new())
        .unwrap();
    assert!(graph
        .reachable(root)
        .into_iter()
        .all(|id| !graph.node(id).is_unresolved()));
}

#[test]
fn expansion_is_idempotent() {
    let config = SchemaConfig::new();
    let mut graph = SchemaGraph::new();
    let root = Parser::new(&config)
        .parse(
            &mut graph,
            &json!({
                "definitions": { "a": { "type": "integer" } },
                "items": { "$ref": "#/definitions/a" },
                "not": { "$ref": "#/raw/b" },
                "raw": { "b": { "type": "string" } }
            }),
        )
        .unwrap();
    let store = DocumentStore::new();
    Expander::new(&config).expand(&mut graph, root, &store).unwrap();
    let nodes = graph.len();
    let pointers: Vec<String> = graph.reachable(root).into_iter().map(|id| graph.pointer(id)).collect();

    Expander::new(&config).expand(&mut graph, root, &store).unwrap();
    assert_eq!(graph.len(), nodes);
    let again: Vec<String> = graph.reachable(root).into_iter().map(|id| graph.pointer(id)).collect();
    assert_eq!(pointers, again);
}

#[test]
fn cycle_through_concrete_content_expands() {
    let (set, root) = compile(json!({
        "definitions": {
            "a": { "type": "object", "properties": { "b": { "$ref": "#/definitions/b" } } },
            "b": { "type": "object", "properties": { "a": { "$ref": "#/definitions/a" } } }
        },
        "$schema": "http://json-schema.org/draft-04/hyper-schema",
        "properties": { "start": { "$ref": "#/definitions/a" } }
    }));
    assert!(set
        .validate(root, &json!({ "start": { "b": { "a": { "b": {} } } } }))
        .is_ok());
    let errors = set
        .validate(root, &json!({ "start": { "b": { "a": 7 } } }))
        .unwrap_err();
    assert_eq!(errors.errors()[0].path.to_string(), "#/start/b/a");
}

#[test]
fn cycle_without_concrete_content_is_a_loop() {
    let errors = expand_errors(json!({
        "definitions": {
            "a": { "$ref": "#/definitions/b" },
            "b": { "$ref": "#/definitions/c" },
            "c": { "$ref": "#/definitions/a" }
        },
        "properties": { "x": { "$ref": "#/definitions/a" } }
    }));
    assert!(errors.iter().any(|(kind, _)| *kind == ErrorKind::LoopDetected));
    assert_eq!(errors.last().map(|(kind, _)| *kind), Some(ErrorKind::UnresolvedReferences));
}

#[test]
fn self_reference_is_a_loop() {
    let errors = expand_errors(json!({ "$ref": "#" }));
    assert_eq!(errors[0].0, ErrorKind::LoopDetected);
}

#[test]
fn remote_documents_are_never_fetched() {
    let errors = expand_errors(json!({
        "properties": { "a": { "$ref": "http://json-schema.org/draft-04/schema#" } }
    }));
    assert_eq!(errors[0].0, ErrorKind::SchemeNotSupported);
    assert!(errors[0].1.contains("http"));
}

#[test]
fn unknown_relative_document_is_unresolved() {
    let errors = expand_errors(json!({
        "id": "/schemata/app",
        "properties": { "a": { "$ref": "other#/definitions/x" } }
    }));
    assert_eq!(errors[0].0, ErrorKind::UnresolvedPointer);
    assert_eq!(errors[0].1, "Couldn't resolve URI: /schemata/app/other.");
}

#[test]
fn subschema_ids_are_resolvable_documents() {
    let (set, root) = compile(json!({
        "id": "http://example.com/root",
        "definitions": {
            "inner": {
                "id": "http://example.com/inner",
                "definitions": { "code": { "type": "integer" } }
            }
        },
        "properties": { "code": { "$ref": "http://example.com/inner#/definitions/code" } }
    }));
    assert!(set.validate(root, &json!({ "code": 1 })).is_ok());
    assert!(set.validate(root, &json!({ "code": "1" })).is_err());
}

#[test]
fn store_subschema_ids_are_resolvable_documents() {
    let mut set = SchemaSet::default();
    set.initialize_store(&[json!({
        "id": "/schemata",
        "definitions": {
            "user": { "id": "user", "type": "object", "required": ["name"] }
        }
    })])
    .unwrap();

    let root = set.compile(&json!({ "$ref": "/schemata/user#" })).unwrap();
    assert!(set.validate(root, &json!({ "name": "x" })).is_ok());
    let errors = set.validate(root, &json!({})).unwrap_err();
    assert_eq!(errors.errors()[0].kind, ErrorKind::RequiredFailed);
}

#[test]
fn root_reference_keeps_its_document_for_later_references() {
    let (set, root) = compile(json!({
        "$ref": "#/definitions/x",
        "definitions": {
            "x": { "type": "object", "properties": { "a": { "$ref": "#/definitions/y" } } },
            "y": { "type": "integer" }
        }
    }));
    assert!(set.validate(root, &json!({ "a": 1 })).is_ok());
    let errors = set.validate(root, &json!({ "a": "1" })).unwrap_err();
    assert_eq!(errors.errors()[0].path.to_string(), "#/a");
}

// =========================================================================
// Modes
// =========================================================================

#[test]
fn fail_fast_returns_exactly_one_error() {
    let (set, root) = compile(json!({
        "type": "object",
        "required": ["a", "b"],
        "properties": {
            "c": { "type": "string", "maxLength": 1 },
            "d": { "allOf": [{ "type": "integer" }, { "minimum": 5 }] }
        },
        "additionalProperties": false
    }));
    let data = json!({ "c": "long", "d": 1.5, "e": null });
    let all = set.validate(root, &data).unwrap_err();
    assert!(all.len() >= 4);
    let first = set.validate_with(root, &data, Mode::FailFast).unwrap_err();
    assert_eq!(first.len(), 1);
    assert_eq!(first.errors()[0], all.errors()[0]);
}

#[test]
fn structural_errors_prevent_expansion() {
    let mut set = SchemaSet::default();
    let err = set
        .compile(&json!({ "properties": { "a": { "type": "decimal" } } }))
        .unwrap_err();
    let HyperschemaError::Parse(errors) = err else {
        panic!("expected parse errors")
    };
    assert_eq!(errors.errors()[0].kind, ErrorKind::UnknownType);
    assert_eq!(errors.errors()[0].pointer, "#/properties/a");
}
