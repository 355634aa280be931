#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::ir::*;
use super::*;
use crate::spec::{parse_spec, Schema, Swagger};
use http::Method;
use indexmap::IndexMap;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

fn schema(value: Value) -> Schema {
    serde_json::from_value(value).unwrap()
}

fn definitions(value: Value) -> IndexMap<String, Schema> {
    serde_json::from_value(value).unwrap()
}

fn document(yaml: &str) -> Swagger {
    parse_spec(yaml, true).unwrap()
}

fn compile_defs(value: Value) -> Result<ModelIr, CompileError> {
    compile_model(&definitions(value), &Scope::new())
}

fn compile(yaml: &str) -> Result<(ModelIr, RouterIr), CompileError> {
    compile_document(&document(yaml), &GeneratorConfig::default())
}

fn compile_err(yaml: &str) -> ErrorKind {
    compile(yaml).unwrap_err().kind
}

/// A document with the given `paths` block and a few shared definitions.
fn with_paths(paths: &str) -> String {
    format!(
        r##"
swagger: "2.0"
paths:
{paths}
definitions:
  Widget:
    type: object
    required: [name]
    properties:
      name: {{ type: string, minLength: 1 }}
      size: {{ type: integer }}
  Gadget:
    type: object
    properties:
      id: {{ type: string, readOnly: true }}
      label: {{ type: string }}
  ErrorX:
    type: string
    x-error: true
  NotFound:
    type: object
    x-error: true
    properties:
      message: {{ type: string }}
"##
    )
}

// ---------------------------------------------------------------------------
// Type compiler
// ---------------------------------------------------------------------------

#[test]
fn test_primitive_mapping() {
    let cases = [
        (json!({"type": "boolean"}), Primitive::Bool),
        (json!({"type": "integer"}), Primitive::Int64),
        (json!({"type": "number"}), Primitive::Float64),
        (json!({"type": "string"}), Primitive::String),
        (json!({"type": "string", "format": "date-time"}), Primitive::Timestamp),
        (json!({"type": "string", "format": "password"}), Primitive::String),
    ];
    for (definition, expected) in cases {
        let model = compile_defs(json!({ "Value": definition.clone() })).unwrap();
        let t = model.find("Value").unwrap();
        assert_eq!(
            t.kind,
            TypeKind::Alias {
                target: TypeRef::Primitive(expected),
                link: None
            },
            "{definition}"
        );
    }
}

#[test]
fn test_unsupported_string_format() {
    let err = compile_defs(json!({"Value": {"type": "string", "format": "uuid"}})).unwrap_err();
    assert_eq!(
        err.kind,
        ErrorKind::UnsupportedFormat {
            format: "uuid".to_string()
        }
    );
    assert_eq!(err.scope.get("definition"), Some("Value"));
}

#[test]
fn test_optional_validated_property_fails_for_every_keyword() {
    let validated = [
        json!({"type": "string", "minLength": 1}),
        json!({"type": "string", "maxLength": 4}),
        json!({"type": "string", "pattern": "^a"}),
        json!({"type": "string", "enum": ["a"]}),
        json!({"type": "integer", "minimum": 0}),
        json!({"type": "integer", "maximum": 10}),
        json!({"type": "integer", "enum": [1, 2]}),
        json!({"type": "number", "maximum": 1.5}),
        json!({"type": "array", "items": {"type": "string"}, "minItems": 1}),
        json!({"type": "array", "items": {"type": "string"}, "maxItems": 3}),
        json!({"type": "array", "items": {"type": "string"}, "uniqueItems": true}),
    ];
    for property in validated {
        let optional = json!({"Thing": {"type": "object", "properties": {"p": property.clone()}}});
        let err = compile_defs(optional).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ValidationRequiresRequired, "{property}");
        assert_eq!(err.scope.get("property"), Some("p"));

        let required = json!({"Thing": {"type": "object", "required": ["p"], "properties": {"p": property.clone()}}});
        assert!(compile_defs(required).is_ok(), "{property}");
    }
}

#[test]
fn test_compilation_does_not_depend_on_definition_order() {
    let entries = vec![
        ("zebra", json!({"type": "object", "required": ["tag"], "properties": {"tag": {"type": "string", "pattern": "^z"}, "b": {"type": "boolean"}, "a": {"$ref": "#/definitions/apple"}}})),
        ("apple", json!({"type": "string"})),
        ("herd", json!({"type": "array", "items": {"$ref": "#/definitions/zebra"}})),
        ("mango", json!({"$ref": "#/definitions/zebra"})),
        ("when", json!({"type": "string", "format": "date-time"})),
    ];
    let forward: IndexMap<String, Schema> = entries
        .iter()
        .map(|(k, v)| (k.to_string(), schema(v.clone())))
        .collect();
    let backward: IndexMap<String, Schema> = entries
        .iter()
        .rev()
        .map(|(k, v)| (k.to_string(), schema(v.clone())))
        .collect();

    let a = compile_model(&forward, &Scope::new()).unwrap();
    let b = compile_model(&backward, &Scope::new()).unwrap();
    assert_eq!(a, b);
    assert_eq!(format!("{a:?}"), format!("{b:?}"));

    let names: Vec<&str> = a.types.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Apple", "Herd", "Mango", "When", "Zebra"]);
    let zebra: Vec<&str> = a.find("Zebra").unwrap().props().iter().map(|p| p.name.as_str()).collect();
    assert_eq!(zebra, vec!["A", "B", "Tag"]);
    assert!(a.needs_time);
}

#[test]
fn test_read_only_array_is_promoted() {
    let model = compile_defs(json!({
        "Foo": {"type": "object", "properties": {"id": {"type": "string", "readOnly": true}}},
        "Baz": {"type": "array", "items": {"$ref": "#/definitions/Foo"}},
    }))
    .unwrap();
    assert!(model.is_read_only("Foo"));
    assert!(model.is_read_only("Baz"));
    assert!(model.find("Baz").unwrap().has_read_only_props);
}

#[test]
fn test_struct_cannot_reference_read_only_type() {
    let err = compile_defs(json!({
        "Foo": {"type": "object", "properties": {"id": {"type": "string", "readOnly": true}}},
        "Bar": {"type": "object", "properties": {"f": {"$ref": "#/definitions/Foo"}}},
    }))
    .unwrap_err();
    assert_eq!(err.kind, ErrorKind::ReadOnlyReference("Foo".to_string()));
    assert_eq!(err.scope.get("type"), Some("Bar"));

    let err = compile_defs(json!({
        "Foo": {"type": "object", "properties": {"id": {"type": "string", "readOnly": true}}},
        "Bar": {"type": "object", "properties": {"fs": {"type": "array", "items": {"$ref": "#/definitions/Foo"}}}},
    }))
    .unwrap_err();
    assert_eq!(err.kind, ErrorKind::ReadOnlyReference("Foo".to_string()));
}

#[test]
fn test_promoted_array_cannot_be_referenced() {
    let err = compile_defs(json!({
        "Foo": {"type": "object", "properties": {"id": {"type": "string", "readOnly": true}}},
        "Baz": {"type": "array", "items": {"$ref": "#/definitions/Foo"}},
        "Qux": {"type": "array", "items": {"$ref": "#/definitions/Baz"}},
    }))
    .unwrap_err();
    assert_eq!(err.kind, ErrorKind::ReadOnlyArrayReference("Baz".to_string()));
    assert_eq!(err.scope.get("type"), Some("Qux"));
}

#[test]
fn test_unknown_reference() {
    let err = compile_defs(json!({
        "Bar": {"type": "object", "properties": {"f": {"$ref": "#/definitions/Missing"}}},
    }))
    .unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnknownType("Missing".to_string()));
}

#[test]
fn test_alias_links_to_referenced_type() {
    let model = compile_defs(json!({
        "Inner": {"type": "object", "properties": {"x": {"type": "integer"}}},
        "Middle": {"$ref": "#/definitions/Inner"},
        "Outer": {"$ref": "#/definitions/Middle"},
    }))
    .unwrap();
    let outer = model.find("Outer").unwrap();
    match &outer.kind {
        TypeKind::Alias { link: Some(id), .. } => assert_eq!(model.get(*id).unwrap().name, "Middle"),
        other => panic!("unexpected kind {other:?}"),
    }
    assert_eq!(model.resolve_alias(outer).name, "Inner");
}

#[test]
fn test_unsupported_schema_shapes() {
    let cases = [
        (json!({"type": ["string", "integer"]}), ErrorKind::UnionType("string, integer".to_string())),
        (json!({"description": "nothing"}), ErrorKind::MissingType),
        (json!({"type": "array"}), ErrorKind::ArrayWithoutItems),
        (
            json!({"type": "array", "items": {"type": "array", "items": {"type": "string"}}}),
            ErrorKind::NestedArray,
        ),
        (
            json!({"type": "object", "properties": {"inner": {"type": "object"}}}),
            ErrorKind::NestedObject,
        ),
        (
            json!({"$ref": "other.yaml#/definitions/Thing"}),
            ErrorKind::UnsupportedReference("other.yaml#/definitions/Thing".to_string()),
        ),
    ];
    for (definition, expected) in cases {
        let err = compile_defs(json!({ "Thing": definition.clone() })).unwrap_err();
        assert_eq!(err.kind, expected, "{definition}");
    }
}

#[test]
fn test_unsupported_keywords_are_reported_together() {
    let err = compile_defs(json!({
        "Thing": {"type": "object", "additionalProperties": true, "allOf": [{"type": "string"}], "properties": {}},
    }))
    .unwrap_err();
    match err.kind {
        ErrorKind::UnsupportedFields { kind, fields } => {
            assert_eq!(kind, "object");
            assert!(fields.contains(&"additionalProperties".to_string()));
            assert!(fields.contains(&"allOf".to_string()));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_error_type_rules() {
    let err = compile_defs(json!({
        "Oops": {"type": "object", "x-error": true, "properties": {"id": {"type": "string", "readOnly": true}}},
    }))
    .unwrap_err();
    assert_eq!(err.kind, ErrorKind::ErrorTypeWithReadOnly);

    let err = compile_defs(json!({
        "Oops": {"type": "object", "x-error": true, "required": ["code"], "properties": {"code": {"type": "integer", "minimum": 1}}},
    }))
    .unwrap_err();
    assert_eq!(err.kind, ErrorKind::ErrorTypeWithValidation);

    let model = compile_defs(json!({
        "Oops": {"type": "object", "x-error": true, "required": ["code"], "properties": {"code": {"type": "integer"}}},
    }))
    .unwrap();
    assert!(model.is_error_type("Oops"));
}

#[test]
fn test_error_aliases_of_every_primitive_and_arrays() {
    let model = compile_defs(json!({
        "Code": {"type": "integer", "x-error": true},
        "Ratio": {"type": "number", "x-error": true},
        "Failed": {"type": "boolean", "x-error": true},
        "FailedAt": {"type": "string", "format": "date-time", "x-error": true},
        "Codes": {"type": "array", "items": {"type": "integer"}, "x-error": true},
    }))
    .unwrap();
    for name in ["Code", "Ratio", "Failed", "FailedAt", "Codes"] {
        assert!(model.is_error_type(name), "{name}");
    }

    let err = compile_defs(json!({
        "Codes": {"type": "array", "items": {"type": "integer", "minimum": 1}, "x-error": true},
    }))
    .unwrap_err();
    assert_eq!(err.kind, ErrorKind::ErrorTypeWithValidation);

    let err = compile_defs(json!({
        "Codes": {"type": "array", "minItems": 1, "items": {"type": "integer"}, "x-error": true},
    }))
    .unwrap_err();
    assert_eq!(err.kind, ErrorKind::ErrorTypeWithValidation);
}

#[test]
fn test_integer_error_alias_renders_display() {
    let source = r##"
swagger: "2.0"
paths:
  /jobs/{id}:
    get:
      operationId: getJob
      parameters:
        - { name: id, in: path, required: true, type: string }
      responses:
        "200": { description: ok }
        "404": { description: missing, schema: { $ref: "#/definitions/Code" } }
definitions:
  Code:
    type: integer
    x-error: true
"##;
    let (model, router) = compile(source).unwrap();
    assert_eq!(router.routes[0].result_errors[0].type_name, "Code");

    let artifacts = render_artifacts(&model, &router, source, "api.yaml").unwrap();
    let errors_rs = &artifacts.iter().find(|a| a.name == "errors.rs").unwrap().content;
    assert!(errors_rs.contains("impl fmt::Display for Code {"));
    assert!(errors_rs.contains("write!(f, \"{}\", self.0)"));
}

#[test]
fn test_patterns_are_collected_per_property() {
    let model = compile_defs(json!({
        "User": {"type": "object", "required": ["email", "tags"], "properties": {
            "email": {"type": "string", "pattern": "^.+@.+$"},
            "tags": {"type": "array", "items": {"type": "string", "pattern": "^[a-z]+$"}},
        }},
        "Code": {"type": "string", "pattern": "^[A-Z]{3}$"},
    }))
    .unwrap();
    let patterns: Vec<(&str, &str)> = model
        .patterns
        .iter()
        .map(|p| (p.name.as_str(), p.pattern.as_str()))
        .collect();
    assert_eq!(
        patterns,
        vec![("Code", "^[A-Z]{3}$"), ("UserEmail", "^.+@.+$"), ("UserTags", "^[a-z]+$")]
    );
}

#[test]
fn test_pattern_names_that_collide_are_rejected() {
    let err = compile_defs(json!({
        "A": {"type": "object", "required": ["bC"], "properties": {"bC": {"type": "string", "pattern": "^a$"}}},
        "AB": {"type": "object", "required": ["c"], "properties": {"c": {"type": "string", "pattern": "^b$"}}},
    }))
    .unwrap_err();
    assert_eq!(
        err.kind,
        ErrorKind::PatternNameCollision {
            name: "REGEX_ABC".to_string(),
            other: "ABC".to_string(),
        }
    );
    assert_eq!(err.scope.get("type"), Some("AB"));
    assert_eq!(err.scope.get("property"), Some("c"));

    // a top-level alias taking the same static name
    let err = compile_defs(json!({
        "A": {"type": "object", "required": ["bC"], "properties": {"bC": {"type": "string", "pattern": "^a$"}}},
        "ABC": {"type": "string", "pattern": "^c$"},
    }))
    .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::PatternNameCollision { .. }));
}

#[test]
fn test_colliding_pattern_names_with_the_same_regex_share_a_static() {
    let model = compile_defs(json!({
        "A": {"type": "object", "required": ["bC"], "properties": {"bC": {"type": "string", "pattern": "^a$"}}},
        "AB": {"type": "object", "required": ["c"], "properties": {"c": {"type": "string", "pattern": "^a$"}}},
    }))
    .unwrap();
    assert_eq!(model.patterns.len(), 1);
    assert_eq!(regex_static(&model.patterns[0].name), "REGEX_ABC");
}

// ---------------------------------------------------------------------------
// Route compiler
// ---------------------------------------------------------------------------

#[test]
fn test_widget_route() {
    let (model, router) = compile(&with_paths(
        r##"
  /widgets/{id}:
    get:
      operationId: getWidget
      tags: [Widgets]
      parameters:
        - { name: id, in: path, required: true, type: string }
      responses:
        "200": { description: ok, schema: { $ref: "#/definitions/Widget" } }
"##,
    ))
    .unwrap();
    assert!(!model.is_read_only("Widget"));

    assert_eq!(router.routes.len(), 1);
    let route = &router.routes[0];
    assert_eq!(route.method, Method::GET);
    assert_eq!(route.route, "/widgets/:id");
    assert_eq!(route.handler_name, "GetWidget");
    assert_eq!(route.name, "getWidget");
    assert_eq!(route.fn_name, "get_widget");
    assert_eq!(route.tag, "Widgets");
    assert!(route.new_block);

    assert_eq!(route.params.len(), 1);
    let param = &route.params[0];
    assert_eq!(param.name, "ID");
    assert_eq!(param.raw_name, "id");
    assert_eq!(param.arg_name, "path_id");
    assert_eq!(param.location, ParameterLocation::Path);
    assert_eq!(param.primitive, Primitive::String);
    assert!(param.required);
    assert!(!param.validation.has_validation());

    assert_eq!(
        route.result,
        Some(ResultDescriptor {
            type_name: "Widget".to_string(),
            is_array: false,
            read_only: false,
        })
    );
    assert!(!route.has_validation);
    assert!(route.result_errors.is_empty());
    assert_eq!(router.bad_request_errors, vec![STRING_ERROR.to_string()]);
    assert_eq!(router.internal_server_errors, vec![STRING_ERROR.to_string()]);
    assert!(router.all_errors.is_empty());
    assert_eq!(router.model_package, "super::model");
}

#[test]
fn test_string_parameter_validation() {
    let (_, router) = compile(&with_paths(
        r##"
  /search:
    get:
      operationId: search
      parameters:
        - { name: q, in: query, type: string, minLength: 1, maxLength: 10, enum: [a, b] }
      responses:
        "200": { description: ok }
"##,
    ))
    .unwrap();
    let route = &router.routes[0];
    assert_eq!(route.tag, "Other");
    let param = &route.params[0];
    assert!(!param.required);
    assert_eq!(
        param.validation,
        Validation::String(StringValidation {
            enum_values: vec!["a".to_string(), "b".to_string()],
            min_length: Some(1),
            max_length: Some(10),
            pattern: None,
        })
    );
    assert!(route.has_validation);
    assert!(route.result.is_none());
}

#[test]
fn test_pattern_on_parameter_is_rejected() {
    let err = compile(&with_paths(
        r##"
  /search:
    get:
      operationId: search
      parameters:
        - { name: q, in: query, type: string, pattern: "^a" }
      responses:
        "200": { description: ok }
"##,
    ))
    .unwrap_err();
    match &err.kind {
        ErrorKind::UnsupportedFields { fields, .. } => assert_eq!(fields, &vec!["pattern".to_string()]),
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(err.scope.get("parameter"), Some("q"));
    assert_eq!(err.scope.get("operation"), Some("search"));
}

#[test]
fn test_duplicate_error_type_in_one_operation() {
    let kind = compile_err(&with_paths(
        r##"
  /widgets:
    post:
      operationId: createWidget
      parameters:
        - { name: widget, in: body, required: true, schema: { $ref: "#/definitions/Widget" } }
      responses:
        "200": { description: ok }
        "400": { description: bad, schema: { $ref: "#/definitions/ErrorX" } }
        "404": { description: missing, schema: { $ref: "#/definitions/ErrorX" } }
"##,
    ));
    assert_eq!(
        kind,
        ErrorKind::DuplicateErrorType {
            type_name: "ErrorX".to_string(),
            status: 400
        }
    );
}

#[test]
fn test_error_groups_list_every_route() {
    let (_, router) = compile(&with_paths(
        r##"
  /a:
    get:
      operationId: routeA
      responses:
        "200": { description: ok }
        "404": { description: missing, schema: { $ref: "#/definitions/NotFound" } }
  /b:
    put:
      operationId: routeB
      responses:
        "200": { description: ok }
        "409": { description: conflict, schema: { $ref: "#/definitions/NotFound" } }
  /c:
    delete:
      operationId: routeC
      responses:
        "200": { description: ok }
        "500": { description: broken, schema: { $ref: "#/definitions/ErrorX" } }
"##,
    ))
    .unwrap();

    assert_eq!(router.all_errors.len(), 2);
    let not_found = router.all_errors.iter().find(|g| g.type_name == "NotFound").unwrap();
    assert_eq!(
        not_found.routes,
        vec![
            ErrorRoute {
                handler_name: "RouteA".to_string(),
                status: 404
            },
            ErrorRoute {
                handler_name: "RouteB".to_string(),
                status: 409
            },
        ]
    );
    assert_eq!(
        router.internal_server_errors,
        vec!["ErrorX".to_string(), STRING_ERROR.to_string()]
    );
    let c = router.routes.iter().find(|r| r.handler_name == "RouteC").unwrap();
    assert_eq!(c.catch_all_error.as_deref(), Some("ErrorX"));
}

#[test]
fn test_bad_request_errors_only_count_validated_routes() {
    let (_, router) = compile(&with_paths(
        r##"
  /widgets:
    post:
      operationId: createWidget
      parameters:
        - { name: widget, in: body, required: true, schema: { $ref: "#/definitions/Widget" } }
      responses:
        "200": { description: ok }
        "400": { description: bad, schema: { $ref: "#/definitions/ErrorX" } }
    get:
      operationId: listWidgets
      responses:
        "200": { description: ok, schema: { type: array, items: { $ref: "#/definitions/Widget" } } }
        "400": { description: bad, schema: { $ref: "#/definitions/NotFound" } }
"##,
    ))
    .unwrap();

    // listWidgets declares 400 but has nothing to validate: it only warns.
    let list = router.routes.iter().find(|r| r.handler_name == "ListWidgets").unwrap();
    assert!(!list.has_validation);
    assert_eq!(list.validation_error.as_deref(), Some("NotFound"));
    assert_eq!(
        list.result,
        Some(ResultDescriptor {
            type_name: "Widget".to_string(),
            is_array: true,
            read_only: false,
        })
    );

    let create = router.routes.iter().find(|r| r.handler_name == "CreateWidget").unwrap();
    assert!(create.has_validation);
    assert_eq!(
        create.body,
        Some(BodyDescriptor {
            name: "bodyWidget".to_string(),
            arg_name: "body_widget".to_string(),
            type_name: "Widget".to_string(),
        })
    );
    assert_eq!(router.bad_request_errors, vec!["ErrorX".to_string()]);
}

/// Log sink for a scoped subscriber.
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl CapturedLogs {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

fn compile_capturing_warnings(yaml: &str) -> (Result<(ModelIr, RouterIr), CompileError>, String) {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::WARN)
        .finish();
    let result = tracing::subscriber::with_default(subscriber, || compile(yaml));
    (result, logs.text())
}

#[test]
fn test_bad_request_without_validation_warns() {
    let (result, logs) = compile_capturing_warnings(&with_paths(
        r##"
  /widgets:
    get:
      operationId: listWidgets
      responses:
        "200": { description: ok }
        "400": { description: bad, schema: { $ref: "#/definitions/ErrorX" } }
"##,
    ));
    let (_, router) = result.unwrap();
    assert!(!router.routes[0].has_validation);
    assert!(logs.contains("WARN"), "{logs}");
    assert!(logs.contains("declares a 400 response but has no input that needs validation"), "{logs}");
    assert!(logs.contains("operation=listWidgets"), "{logs}");
}

#[test]
fn test_validated_bad_request_does_not_warn() {
    let (result, logs) = compile_capturing_warnings(&with_paths(
        r##"
  /widgets/{id}:
    get:
      operationId: getWidget
      parameters:
        - { name: id, in: path, required: true, type: string, minLength: 3 }
      responses:
        "200": { description: ok }
        "400": { description: bad, schema: { $ref: "#/definitions/ErrorX" } }
"##,
    ));
    let (_, router) = result.unwrap();
    assert!(router.routes[0].has_validation);
    assert!(!logs.contains("400 response"), "{logs}");
}

#[test]
fn test_routes_are_sorted_by_tag_route_and_method() {
    let (_, router) = compile(&with_paths(
        r##"
  /b:
    delete:
      operationId: deleteB
      tags: [Beta]
      responses: { "200": { description: ok } }
    get:
      operationId: getB
      tags: [Beta]
      responses: { "200": { description: ok } }
  /a:
    put:
      operationId: putA
      tags: [Beta]
      responses: { "200": { description: ok } }
  /z:
    post:
      operationId: postZ
      tags: [Alpha]
      responses: { "200": { description: ok } }
"##,
    ))
    .unwrap();
    let order: Vec<(&str, bool)> = router
        .routes
        .iter()
        .map(|r| (r.handler_name.as_str(), r.new_block))
        .collect();
    assert_eq!(
        order,
        vec![("PostZ", true), ("PutA", true), ("GetB", false), ("DeleteB", false)]
    );
}

#[test]
fn test_parameter_merge_and_shared_references() {
    let (_, router) = compile(
        r##"
swagger: "2.0"
parameters:
  Limit: { name: limit, in: query, type: string, maxLength: 3 }
paths:
  /items/{itemId}:
    parameters:
      - { name: itemId, in: path, type: string, minLength: 2 }
      - { name: X-Trace, in: header, type: string }
    get:
      operationId: getItem
      parameters:
        - { name: itemId, in: path, required: true, type: string }
        - $ref: "#/parameters/Limit"
      responses: { "200": { description: ok } }
"##,
    )
    .unwrap();
    let params: Vec<(&str, ParameterLocation, &str, bool)> = router.routes[0]
        .params
        .iter()
        .map(|p| (p.name.as_str(), p.location, p.arg_name.as_str(), p.validation.has_validation()))
        .collect();
    assert_eq!(
        params,
        vec![
            ("ItemID", ParameterLocation::Path, "path_item_id", false),
            ("XTrace", ParameterLocation::Header, "header_x_trace", false),
            ("Limit", ParameterLocation::Query, "query_limit", true),
        ]
    );
}

#[test]
fn test_array_and_timestamp_parameters() {
    let (_, router) = compile(&with_paths(
        r##"
  /events:
    get:
      operationId: listEvents
      parameters:
        - { name: since, in: query, type: string, format: date-time }
        - name: kinds
          in: query
          type: array
          collectionFormat: csv
          maxItems: 3
          items: { type: string, enum: [a, b] }
      responses: { "200": { description: ok } }
"##,
    ))
    .unwrap();
    let route = &router.routes[0];
    assert!(route.has_validation);
    assert!(router.needs_time);
    let kinds = route.params.iter().find(|p| p.raw_name == "kinds").unwrap();
    assert!(kinds.is_array);
    assert_eq!(
        kinds.validation,
        Validation::Array(ArrayValidation {
            min_items: None,
            max_items: Some(3),
            unique_items: false,
        })
    );
    assert!(kinds.item_validation.has_validation());
    let since = route.params.iter().find(|p| p.raw_name == "since").unwrap();
    assert_eq!(since.primitive, Primitive::Timestamp);
}

#[test]
fn test_read_only_result() {
    let (_, router) = compile(&with_paths(
        r##"
  /gadgets:
    get:
      operationId: listGadgets
      responses:
        "200": { description: ok, schema: { type: array, items: { $ref: "#/definitions/Gadget" } } }
"##,
    ))
    .unwrap();
    let result = router.routes[0].result.as_ref().unwrap();
    assert!(result.read_only);
    assert!(result.is_array);
}

#[test]
fn test_unsupported_operations() {
    let cases = [
        (
            r##"
  /x:
    head:
      operationId: headX
      responses: { "200": { description: ok } }
"##,
            ErrorKind::UnsupportedMethod("HEAD".to_string()),
        ),
        (
            r##"
  /x:
    get:
      responses: { "200": { description: ok } }
"##,
            ErrorKind::MissingOperationId,
        ),
        (
            r##"
  /x:
    get:
      operationId: getX
      tags: [A, B]
      responses: { "200": { description: ok } }
"##,
            ErrorKind::MultipleTags(vec!["A".to_string(), "B".to_string()]),
        ),
        (
            r##"
  /x:
    get:
      operationId: getX
      responses: { default: { description: anything } }
"##,
            ErrorKind::DefaultResponse,
        ),
        (
            r##"
  /x:
    post:
      operationId: postX
      parameters:
        - { name: f, in: formData, type: string }
      responses: { "200": { description: ok } }
"##,
            ErrorKind::FormDataParameter,
        ),
        (
            r##"
  /x:
    post:
      operationId: postX
      parameters:
        - { name: w, in: body, schema: { $ref: "#/definitions/Widget" } }
      responses: { "200": { description: ok } }
"##,
            ErrorKind::OptionalBody,
        ),
        (
            r##"
  /x:
    post:
      operationId: postX
      parameters:
        - { name: w, in: body, required: true, schema: { type: object } }
      responses: { "200": { description: ok } }
"##,
            ErrorKind::InlineSchema("body"),
        ),
        (
            r##"
  /x:
    get:
      operationId: getX
      parameters:
        - { name: n, in: query, type: integer }
      responses: { "200": { description: ok } }
"##,
            ErrorKind::UnsupportedParameterType("integer".to_string()),
        ),
        (
            r##"
  /x:
    get:
      operationId: getX
      parameters:
        - { name: n, in: query, type: array, collectionFormat: pipes, items: { type: string } }
      responses: { "200": { description: ok } }
"##,
            ErrorKind::UnsupportedCollectionFormat("pipes".to_string()),
        ),
        (
            r##"
  /x:
    get:
      operationId: getX
      parameters:
        - { name: n, in: query, type: array, items: { type: integer } }
      responses: { "200": { description: ok } }
"##,
            ErrorKind::UnsupportedArrayItems,
        ),
        (
            r##"
  /x:
    get:
      operationId: getX
      responses:
        "200": { description: ok }
        "201": { description: created }
"##,
            ErrorKind::MultipleSuccessResponses,
        ),
        (
            r##"
  /x:
    get:
      operationId: getX
      responses:
        "200": { description: ok }
        "404": { description: missing, schema: { $ref: "#/definitions/Widget" } }
"##,
            ErrorKind::NotAnErrorType {
                type_name: "Widget".to_string(),
                status: 404,
            },
        ),
        (
            r##"
  /x:
    get:
      operationId: getX
      produces: [text/plain]
      responses: { "200": { description: ok } }
"##,
            ErrorKind::UnsupportedMediaType("text/plain".to_string()),
        ),
        (
            r##"
  /x:
    get:
      operationId: getX
      responses: { "200": { description: ok, schema: { $ref: "#/definitions/Nope" } } }
"##,
            ErrorKind::UnknownType("Nope".to_string()),
        ),
    ];
    for (paths, expected) in cases {
        assert_eq!(compile_err(&with_paths(paths)), expected, "{paths}");
    }
}

#[test]
fn test_duplicate_operation_id() {
    let err = compile(&with_paths(
        r##"
  /x:
    get:
      operationId: fetch
      responses: { "200": { description: ok } }
  /y:
    get:
      operationId: fetch
      responses: { "200": { description: ok } }
"##,
    ))
    .unwrap_err();
    assert_eq!(err.kind, ErrorKind::DuplicateOperationId("fetch".to_string()));
    assert_eq!(err.scope.get("path"), Some("/y"));
    assert_eq!(err.scope.get("previous_path"), Some("/x"));
}

#[test]
fn test_error_message_carries_scope() {
    let err = compile(&with_paths(
        r##"
  /x:
    options:
      operationId: optionsX
      responses: { "200": { description: ok } }
"##,
    ))
    .unwrap_err();
    assert_eq!(err.to_string(), "unsupported method OPTIONS [path=/x, method=OPTIONS]");
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

#[test]
fn test_render_artifacts() {
    let source = with_paths(
        r##"
  /widgets/{id}:
    get:
      operationId: getWidget
      tags: [Widgets]
      summary: Fetch one widget
      parameters:
        - { name: id, in: path, required: true, type: string }
        - { name: since, in: query, type: string, format: date-time }
      responses:
        "200": { description: ok, schema: { $ref: "#/definitions/Widget" } }
        "404": { description: missing, schema: { $ref: "#/definitions/NotFound" } }
    put:
      operationId: putWidget
      tags: [Widgets]
      parameters:
        - { name: id, in: path, required: true, type: string }
        - { name: widget, in: body, required: true, schema: { $ref: "#/definitions/Widget" } }
      responses:
        "200": { description: ok }
        "400": { description: bad, schema: { $ref: "#/definitions/ErrorX" } }
  /gadgets:
    get:
      operationId: listGadgets
      responses:
        "200": { description: ok, schema: { type: array, items: { $ref: "#/definitions/Gadget" } } }
"##,
    );
    let (model, router) = compile(&source).unwrap();
    let artifacts = render_artifacts(&model, &router, &source, "api.yaml").unwrap();
    let names: Vec<&str> = artifacts.iter().map(|a| a.name).collect();
    assert_eq!(
        names,
        vec!["mod.rs", "swagger.rs", "model.rs", "validate.rs", "errors.rs", "route_errors.rs", "router.rs"]
    );
    let file = |name: &str| &artifacts.iter().find(|a| a.name == name).unwrap().content;

    let model_rs = file("model.rs");
    assert!(model_rs.contains("pub struct Widget {"));
    assert!(model_rs.contains("pub struct ReadOnlyGadget {"));
    assert!(model_rs.contains("#[serde(rename = \"name\", default, skip_serializing_if = \"Option::is_none\")]"));
    assert!(model_rs.contains("pub struct ErrorX(pub String);"));

    assert!(model_rs.contains("/// ReadOnlyGadget\n"));
    assert!(!model_rs.contains("No description provided"));

    let validate_rs = file("validate.rs");
    assert!(validate_rs.contains("impl Validate for Widget {"));
    assert!(validate_rs.contains("None => errors.push(format!(\"name is required\")),"));
    assert!(validate_rs.contains("value.chars().count() < 1"));

    let errors_rs = file("errors.rs");
    assert!(errors_rs.contains("impl fmt::Display for ErrorX {"));
    assert!(errors_rs.contains("impl std::error::Error for NotFound {}"));

    let route_errors_rs = file("route_errors.rs");
    assert!(route_errors_rs.contains("pub enum GetWidgetError {"));
    assert!(route_errors_rs.contains("NotFound(model::NotFound),"));
    assert!(route_errors_rs.contains("Self::NotFound(_) => 404,"));
    assert!(route_errors_rs.contains("impl From<model::ErrorX> for PutWidgetError {"));

    let router_rs = file("router.rs");
    assert!(router_rs.contains("use super::model as model;"));
    assert!(router_rs.contains("use chrono::{DateTime, Utc};"));
    assert!(router_rs.contains(".route(\"/widgets/:id\", get(get_widget::<H, T>).put(put_widget::<H, T>))"));
    assert!(router_rs.contains("/// Fetch one widget"));
    assert!(router_rs.contains("path_id: String,"));
    assert!(router_rs.contains("query_since: Option<DateTime<Utc>>,"));
    assert!(router_rs.contains("body_widget: model::Widget,"));
    assert!(router_rs.contains("Result<Vec<model::ReadOnlyGadget>, ListGadgetsError>"));
    assert!(router_rs.contains("fn validation_errors_to_error_x(&self, errors: Vec<String>) -> model::ErrorX;"));
    assert!(router_rs.contains("fn error_to_string(&self, error: String) -> String;"));

    let swagger_rs = file("swagger.rs");
    assert!(swagger_rs.contains("pub const SWAGGER: &str = r##\""));
    assert!(swagger_rs.contains("operationId: getWidget"));
}
