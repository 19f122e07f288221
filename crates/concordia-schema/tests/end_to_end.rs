//! # End-to-End Behaviour
//!
//! Compile, validate, and conformance scenarios exercised through the
//! public API only. Every test uses its own hook registry so hooks installed
//! here never leak into other tests running in parallel.

use std::sync::Arc;

use concordia_schema::{
    Compiler, ConcordiaError, ConformanceError, DataError, HookError, HookPhase, HookRegistry,
    InstancePath, ReferenceError, Schema, SchemaError, SchemaKind, StaticFetcher,
};
use serde_json::{json, Value};

fn private_compiler() -> Compiler {
    Compiler::new().with_hooks(Arc::new(HookRegistry::new()))
}

fn compile(document: Value) -> Schema {
    private_compiler().compile(document).unwrap()
}

const NAME_URL: &str = "https://schemas.example.com/name.json";

fn name_fetcher() -> StaticFetcher {
    let mut fetcher = StaticFetcher::new();
    fetcher.insert(
        NAME_URL,
        r#"{"type":"object","schema":[{"name":"first","type":"string"},{"name":"last","type":"string"}]}"#,
    );
    fetcher
}

// ---------------------------------------------------------------------------
// Data validation
// ---------------------------------------------------------------------------

#[test]
fn required_number_optional_string() {
    let schema = compile(json!({"type": "object", "schema": [
        {"name": "n", "type": "number"},
        {"name": "s", "type": "string", "optional": true}
    ]}));

    assert_eq!(schema.validate_data(r#"{"n":3}"#).unwrap(), json!({"n": 3}));

    match schema.validate_data(json!({"n": "x"})) {
        Err(ConcordiaError::Data(DataError::TypeMismatch { path, expected, found })) => {
            assert_eq!(path.as_str(), "/n");
            assert_eq!(expected, SchemaKind::Number);
            assert_eq!(found, "\"x\"");
        }
        other => panic!("expected a type error on n, got {other:?}"),
    }

    match schema.validate_data(json!({"s": "y"})) {
        Err(ConcordiaError::Data(DataError::MissingField { path, name })) => {
            assert!(path.is_root());
            assert_eq!(name, "n");
        }
        other => panic!("expected a missing-field error on n, got {other:?}"),
    }
}

#[test]
fn null_is_valid_exactly_when_optional() {
    let fragments = |optional: bool| {
        [
            json!({"type": "boolean", "optional": optional}),
            json!({"type": "number", "optional": optional}),
            json!({"type": "string", "optional": optional}),
            json!({"type": "object", "optional": optional, "schema": []}),
            json!({"type": "array", "optional": optional, "schema": {"type": "number"}}),
        ]
    };
    for optional in [true, false] {
        for fragment in fragments(optional) {
            let schema = compile(json!({"type": "array", "schema": [fragment.clone()]}));
            let result = schema.validate_data(json!([null]));
            assert_eq!(result.is_ok(), optional, "{fragment}: {result:?}");
            if !optional {
                assert!(matches!(
                    result,
                    Err(ConcordiaError::Data(DataError::NullNotOptional { .. }))
                ));
            }
        }
    }
}

#[test]
fn constant_length_rejects_short_data_even_with_optional_tail() {
    let schema = compile(json!({"type": "array", "schema": [
        {"type": "number"},
        {"type": "number", "optional": true}
    ]}));
    assert!(matches!(
        schema.validate_data(json!([5])),
        Err(ConcordiaError::Data(DataError::LengthMismatch {
            expected: 2,
            found: 1,
            ..
        }))
    ));
    assert!(schema.validate_data(json!([5, null])).is_ok());
    assert!(schema.validate_data(json!([5, 6])).is_ok());
}

#[test]
fn deep_error_path() {
    let schema = compile(json!({"type": "object", "schema": [
        {"name": "readings", "type": "array", "schema": {
            "type": "array", "schema": [{"type": "string"}, {"type": "number"}]
        }}
    ]}));
    match schema.validate_data(json!({"readings": [["a", 1], ["b", true]]})) {
        Err(ConcordiaError::Data(e)) => {
            assert_eq!(e.path().map(InstancePath::as_str), Some("/readings/1/1"));
        }
        other => panic!("expected data error, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// References
// ---------------------------------------------------------------------------

#[test]
fn aggregation_collision_and_resolution() {
    let compiler = private_compiler().with_fetcher(name_fetcher());

    let colliding = json!({"type": "object", "schema": [
        {"name": "last", "type": "string"},
        {"$ref": NAME_URL}
    ]});
    match compiler.compile(&colliding) {
        Err(ConcordiaError::Schema(e @ SchemaError::DuplicateField { .. })) => {
            assert!(e.to_string().contains("'last' is defined multiple times"));
        }
        other => panic!("expected a duplicate-field error, got {other:?}"),
    }

    let distinct = json!({"type": "object", "schema": [
        {"name": "nickname", "type": "string"},
        {"$ref": NAME_URL}
    ]});
    let schema = compiler.compile(&distinct).unwrap();
    assert_eq!(schema.root().field_names(), ["nickname", "first", "last"]);

    assert!(schema
        .validate_data(json!({"nickname": "Al", "first": "Alan", "last": "Turing"}))
        .is_ok());
    assert!(matches!(
        schema.validate_data(json!({"nickname": "Al", "first": "Alan"})),
        Err(ConcordiaError::Data(DataError::MissingField { ref name, .. })) if name == "last"
    ));
}

#[test]
fn named_reference_optionality_governs_absence() {
    let compiler = private_compiler().with_fetcher(name_fetcher());
    let schema = compiler
        .compile(json!({"type": "object", "schema": [
            {"name": "author", "$ref": NAME_URL},
            {"name": "editor", "$ref": NAME_URL, "optional": true}
        ]}))
        .unwrap();

    let author = json!({"first": "Ada", "last": "Lovelace"});
    assert!(schema.validate_data(json!({"author": author})).is_ok());
    assert!(schema
        .validate_data(json!({"author": author, "editor": null}))
        .is_ok());
    assert!(matches!(
        schema.validate_data(json!({"author": null})),
        Err(ConcordiaError::Data(DataError::NullNotOptional { .. }))
    ));
    match schema.validate_data(json!({"author": {"first": "Ada"}})) {
        Err(ConcordiaError::Data(DataError::MissingField { path, name })) => {
            assert_eq!(path.as_str(), "/author");
            assert_eq!(name, "last");
        }
        other => panic!("expected a missing-field error, got {other:?}"),
    }
}

#[test]
fn fetch_failures_are_distinguishable() {
    let mut fetcher = StaticFetcher::new();
    fetcher.insert("mem://empty", "");
    fetcher.insert("mem://text", "this is not json");
    let compiler = private_compiler().with_fetcher(fetcher);

    let root_cause = |url: &str| -> String {
        let document = json!({"type": "object", "schema": [{"name": "x", "$ref": url}]});
        match compiler.compile(document) {
            Err(ConcordiaError::Reference(e)) => {
                let kind = match e.root_cause() {
                    ReferenceError::Status { .. } => "status",
                    ReferenceError::EmptyBody { .. } => "empty",
                    ReferenceError::Invalid { source, .. } => match **source {
                        ConcordiaError::Json(_) => "parse",
                        _ => "invalid",
                    },
                    _ => "other",
                };
                format!("{kind}: {e}")
            }
            other => panic!("expected a reference error for {url}, got {other:?}"),
        }
    };

    let missing = root_cause("mem://missing");
    assert!(missing.starts_with("status: "));
    assert!(missing.contains("404"));
    assert!(root_cause("mem://empty").starts_with("empty: "));
    assert!(root_cause("mem://text").starts_with("parse: "));
}

#[test]
fn references_are_fetched_once_and_never_at_validation_time() {
    let fetcher = Arc::new(name_fetcher());
    let compiler = private_compiler().with_shared_fetcher(fetcher.clone());
    let schema = compiler
        .compile(json!({"type": "object", "schema": [
            {"name": "author", "$ref": NAME_URL},
            {"name": "reviewers", "type": "array", "schema": {"$ref": NAME_URL}}
        ]}))
        .unwrap();
    assert_eq!(fetcher.request_count(NAME_URL), 1);

    let person = json!({"first": "Grace", "last": "Hopper"});
    for _ in 0..3 {
        assert!(schema
            .validate_data(json!({"author": person, "reviewers": [person, person]}))
            .is_ok());
    }
    assert_eq!(fetcher.request_count(NAME_URL), 1);
}

#[test]
fn reference_cycles_are_fatal() {
    let mut fetcher = StaticFetcher::new();
    fetcher.insert("mem://tree", r#"{"type":"object","schema":[{"name":"children","type":"array","schema":{"$ref":"mem://tree"}}]}"#);
    let compiler = private_compiler().with_fetcher(fetcher);
    match compiler.compile(json!({"type": "object", "schema": [{"name": "root", "$ref": "mem://tree"}]})) {
        Err(ConcordiaError::Reference(e)) => {
            assert!(matches!(e.root_cause(), ReferenceError::Cycle { .. }));
        }
        other => panic!("expected a cycle error, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Conformance
// ---------------------------------------------------------------------------

#[test]
fn conformance_narrowing_rule() {
    let optional_f = json!({"type": "object", "schema": [{"name": "f", "type": "number", "optional": true}]});
    let required_f = json!({"type": "object", "schema": [{"name": "f", "type": "number"}]});

    // Narrowing: the original allows absence, the extender requires f.
    assert!(compile(required_f.clone())
        .conforms_to(&compile(optional_f.clone()))
        .is_ok());

    // Widening: the original requires f, the extender makes it optional.
    assert!(matches!(
        compile(optional_f).conforms_to(&compile(required_f)),
        Err(ConformanceError::OptionalityWidened { .. })
    ));
}

#[test]
fn conformance_across_references() {
    let compiler = private_compiler().with_fetcher(name_fetcher());
    let original = compiler
        .compile(json!({"type": "object", "schema": [{"name": "author", "$ref": NAME_URL}]}))
        .unwrap();
    let inline = compiler
        .compile(json!({"type": "object", "schema": [{"name": "author", "type": "object", "schema": [
            {"name": "first", "type": "string"},
            {"name": "last", "type": "string"},
            {"name": "orcid", "type": "string", "optional": true}
        ]}]}))
        .unwrap();
    let partial = compiler
        .compile(json!({"type": "object", "schema": [{"name": "author", "type": "object", "schema": [
            {"name": "first", "type": "string"}
        ]}]}))
        .unwrap();

    assert!(inline.conforms_to(&original).is_ok());
    assert!(original.conforms_to(&original).is_ok());
    assert!(matches!(
        partial.conforms_to(&original),
        Err(ConformanceError::MissingField { ref name, .. }) if name == "last"
    ));
}

// ---------------------------------------------------------------------------
// Hooks
// ---------------------------------------------------------------------------

#[test]
fn throwing_number_hook_fails_compilation_until_removed() {
    let hooks = Arc::new(HookRegistry::new());
    let compiler = Compiler::new().with_hooks(Arc::clone(&hooks));
    let document = json!({"type": "object", "schema": [
        {"name": "label", "type": "string"},
        {"name": "count", "type": "number"}
    ]});

    hooks.set_schema_hook(SchemaKind::Number, |_| Err(HookError::new("numbers are disabled")));
    match compiler.compile(&document) {
        Err(ConcordiaError::Hook(e)) => assert_eq!(e, HookError::new("numbers are disabled")),
        other => panic!("expected the hook's error, got {other:?}"),
    }

    // Schemas without numbers are unaffected.
    assert!(compiler
        .compile(json!({"type": "array", "schema": {"type": "string"}}))
        .is_ok());

    assert!(hooks.remove(SchemaKind::Number, HookPhase::Schema));
    assert!(compiler.compile(&document).is_ok());
}

#[test]
fn hook_failure_inside_a_referenced_document_is_reachable() {
    let hooks = Arc::new(HookRegistry::new());
    let compiler = Compiler::new()
        .with_hooks(Arc::clone(&hooks))
        .with_fetcher(name_fetcher());
    hooks.set_schema_hook(SchemaKind::String, |_| Err(HookError::new("strings are disabled")));

    let err = compiler
        .compile(json!({"type": "object", "schema": [{"name": "who", "$ref": NAME_URL}]}))
        .unwrap_err();
    assert!(matches!(err, ConcordiaError::Reference(_)));
    assert_eq!(err.hook_error(), Some(&HookError::new("strings are disabled")));
}

#[test]
fn range_hooks_read_extra_keywords() {
    let hooks = Arc::new(HookRegistry::new());
    hooks.set_schema_hook(SchemaKind::Number, |fragment| {
        for bound in ["min", "max"] {
            match fragment.get(bound) {
                Some(value) if value.is_number() => {}
                Some(_) => return Err(HookError::new(format!("The '{bound}' value is not a number."))),
                None => return Err(HookError::new(format!("The '{bound}' value is missing."))),
            }
        }
        Ok(())
    });
    hooks.set_data_hook(SchemaKind::Number, |fragment, data| {
        let Some(n) = data.as_f64() else {
            return Ok(());
        };
        let min = fragment["min"].as_f64().unwrap_or(f64::MIN);
        let max = fragment["max"].as_f64().unwrap_or(f64::MAX);
        if n < min {
            Err(HookError::new("The data is invalid because its value is less than the minimum."))
        } else if n > max {
            Err(HookError::new("The data is invalid because its value is greater than the maximum."))
        } else {
            Ok(())
        }
    });
    let compiler = Compiler::new().with_hooks(hooks);

    match compiler.compile(json!({"type": "array", "schema": {"type": "number", "min": 0}})) {
        Err(ConcordiaError::Hook(e)) => assert_eq!(e.message(), "The 'max' value is missing."),
        other => panic!("expected the hook's error, got {other:?}"),
    }

    let schema = compiler
        .compile(json!({"type": "object", "schema": [
            {"name": "score", "type": "number", "min": 0, "max": 10, "optional": true}
        ]}))
        .unwrap();
    assert_eq!(
        schema.root().field_names(),
        ["score"]
    );
    assert!(schema.validate_data(json!({"score": 7})).is_ok());
    assert!(schema.validate_data(json!({"score": null})).is_ok());
    assert!(matches!(
        schema.validate_data(json!({"score": 11})),
        Err(ConcordiaError::Hook(_))
    ));
}
