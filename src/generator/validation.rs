//! Extraction of the supported validation keywords.
//!
//! Each value kind has an allow-list of keywords. Every other keyword present on
//! the schema or parameter is collected and reported in a single error.

use super::error::{CompileError, ErrorKind};
use super::ir::{
    ArrayValidation, IntValidation, NumberValidation, ObjectValidation, Primitive,
    StringValidation, TypeRef, Validation,
};
use super::scope::Scope;
use crate::spec::{CommonValidations, Schema};
use serde_json::Value;
use std::fmt;

/// What a schema resolved to, which decides its allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind<'a> {
    Primitive(Primitive),
    Object,
    Array(&'a TypeRef),
}

impl fmt::Display for SchemaKind<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaKind::Primitive(p) => write!(f, "{p}"),
            SchemaKind::Object => write!(f, "object"),
            SchemaKind::Array(_) => write!(f, "array"),
        }
    }
}

/// What a non-body parameter resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterKind {
    String,
    Timestamp,
    Array,
    /// The string items of an array parameter
    ArrayItems,
}

impl fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterKind::String => write!(f, "string parameter"),
            ParameterKind::Timestamp => write!(f, "date-time parameter"),
            ParameterKind::Array => write!(f, "array parameter"),
            ParameterKind::ArrayItems => write!(f, "array parameter items"),
        }
    }
}

const ARRAY_FIELDS: &[&str] = &["items", "minItems", "maxItems", "uniqueItems", "readOnly", "x-error"];
const NUMERIC_FIELDS: &[&str] = &[
    "enum",
    "maximum",
    "exclusiveMaximum",
    "minimum",
    "exclusiveMinimum",
    "readOnly",
    "x-error",
];
const STRING_FIELDS: &[&str] = &[
    "enum",
    "format",
    "minLength",
    "maxLength",
    "pattern",
    "readOnly",
    "x-error",
];
const BOOL_FIELDS: &[&str] = &["readOnly", "x-error"];
const TIMESTAMP_FIELDS: &[&str] = &["format", "readOnly", "x-error"];
const OBJECT_FIELDS: &[&str] = &["properties", "required", "readOnly", "x-error"];

const PARAM_STRING_FIELDS: &[&str] = &["enum", "minLength", "maxLength"];
const PARAM_TIMESTAMP_FIELDS: &[&str] = &[];
const PARAM_ARRAY_FIELDS: &[&str] = &["minItems", "maxItems", "uniqueItems"];

/// Keywords present on a schema, in a fixed order.
///
/// Annotations (`title`, `description`, `example`, `xml`, `externalDocs`) are
/// never reported.
fn schema_keywords(schema: &Schema) -> Vec<String> {
    let flags: [(bool, &str); 29] = [
        (schema.additional_items.is_some(), "additionalItems"),
        (schema.additional_properties.is_some(), "additionalProperties"),
        (schema.default.is_some(), "default"),
        (schema.enum_values.is_some(), "enum"),
        (schema.items.is_some(), "items"),
        (schema.maximum.is_some(), "maximum"),
        (schema.max_items.is_some(), "maxItems"),
        (schema.max_length.is_some(), "maxLength"),
        (schema.max_properties.is_some(), "maxProperties"),
        (schema.minimum.is_some(), "minimum"),
        (schema.min_items.is_some(), "minItems"),
        (schema.min_length.is_some(), "minLength"),
        (schema.min_properties.is_some(), "minProperties"),
        (schema.multiple_of.is_some(), "multipleOf"),
        (schema.not.is_some(), "not"),
        (!schema.all_of.is_empty(), "allOf"),
        (!schema.any_of.is_empty(), "anyOf"),
        (!schema.definitions.is_empty(), "definitions"),
        (!schema.dependencies.is_empty(), "dependencies"),
        (schema.discriminator.is_some(), "discriminator"),
        (schema.format.as_deref().is_some_and(|f| !f.is_empty()), "format"),
        (!schema.one_of.is_empty(), "oneOf"),
        (schema.pattern.as_deref().is_some_and(|p| !p.is_empty()), "pattern"),
        (!schema.pattern_properties.is_empty(), "patternProperties"),
        (!schema.properties.is_empty(), "properties"),
        (!schema.required.is_empty(), "required"),
        (schema.exclusive_maximum, "exclusiveMaximum"),
        (schema.exclusive_minimum, "exclusiveMinimum"),
        (schema.read_only, "readOnly"),
    ];

    let mut present: Vec<String> = flags
        .iter()
        .filter(|(set, _)| *set)
        .map(|(_, name)| name.to_string())
        .collect();
    if schema.unique_items {
        present.push("uniqueItems".to_string());
    }
    if schema.is_error {
        present.push("x-error".to_string());
    }
    present.extend(schema.extra.keys().cloned());
    present
}

fn parameter_keywords(v: &CommonValidations) -> Vec<String> {
    let flags: [(bool, &str); 13] = [
        (v.default.is_some(), "default"),
        (v.enum_values.is_some(), "enum"),
        (v.maximum.is_some(), "maximum"),
        (v.max_items.is_some(), "maxItems"),
        (v.max_length.is_some(), "maxLength"),
        (v.minimum.is_some(), "minimum"),
        (v.min_items.is_some(), "minItems"),
        (v.min_length.is_some(), "minLength"),
        (v.multiple_of.is_some(), "multipleOf"),
        (v.pattern.as_deref().is_some_and(|p| !p.is_empty()), "pattern"),
        (v.exclusive_maximum, "exclusiveMaximum"),
        (v.exclusive_minimum, "exclusiveMinimum"),
        (v.unique_items, "uniqueItems"),
    ];
    flags
        .iter()
        .filter(|(set, _)| *set)
        .map(|(_, name)| name.to_string())
        .collect()
}

fn check_unsupported_fields(
    kind: impl fmt::Display,
    present: Vec<String>,
    allowed: &[&str],
    scope: &Scope,
) -> Result<(), CompileError> {
    let fields: Vec<String> = present
        .into_iter()
        .filter(|f| !allowed.contains(&f.as_str()))
        .collect();
    if fields.is_empty() {
        return Ok(());
    }
    Err(scope.fail(ErrorKind::UnsupportedFields {
        kind: kind.to_string(),
        fields,
    }))
}

/// Extract the validation of a schema that resolved to `kind`.
///
/// Pure references are not passed here; they carry no validation of their own.
///
/// # Errors
///
/// Fails when a keyword outside the kind's allow-list is present, when an enum
/// value or bound has the wrong shape, or when a pattern does not compile.
pub fn schema_validation(
    kind: SchemaKind<'_>,
    schema: &Schema,
    scope: &Scope,
) -> Result<Validation, CompileError> {
    let scope = scope.with("validation", kind);
    let present = schema_keywords(schema);

    match kind {
        SchemaKind::Array(item) => {
            check_unsupported_fields(kind, present, ARRAY_FIELDS, &scope)?;
            if schema.unique_items {
                if let TypeRef::Named(name) = item {
                    return Err(scope.fail(ErrorKind::NonPrimitiveUniqueItems(name.clone())));
                }
            }
            Ok(array_validation(schema.min_items, schema.max_items, schema.unique_items))
        }
        SchemaKind::Object => {
            check_unsupported_fields(kind, present, OBJECT_FIELDS, &scope)?;
            if schema.required.is_empty() {
                Ok(Validation::None)
            } else {
                Ok(Validation::Object(ObjectValidation {
                    required: schema.required.clone(),
                }))
            }
        }
        SchemaKind::Primitive(Primitive::Bool) => {
            check_unsupported_fields(kind, present, BOOL_FIELDS, &scope)?;
            Ok(Validation::None)
        }
        SchemaKind::Primitive(Primitive::Timestamp) => {
            check_unsupported_fields(kind, present, TIMESTAMP_FIELDS, &scope)?;
            Ok(Validation::None)
        }
        SchemaKind::Primitive(Primitive::Int64) => {
            check_unsupported_fields(kind, present, NUMERIC_FIELDS, &scope)?;
            int_validation(schema, &scope)
        }
        SchemaKind::Primitive(Primitive::Float64) => {
            check_unsupported_fields(kind, present, NUMERIC_FIELDS, &scope)?;
            number_validation(schema, &scope)
        }
        SchemaKind::Primitive(Primitive::String) => {
            check_unsupported_fields(kind, present, STRING_FIELDS, &scope)?;
            string_validation(
                schema.enum_values.as_deref(),
                schema.min_length,
                schema.max_length,
                schema.pattern.as_deref().filter(|p| !p.is_empty()),
                &scope,
            )
        }
    }
}

/// Extract the validation of a path, query or header parameter.
///
/// # Errors
///
/// Fails when a keyword outside the parameter kind's allow-list is present or a
/// string enum value is not a string.
pub fn parameter_validation(
    kind: ParameterKind,
    validations: &CommonValidations,
    scope: &Scope,
) -> Result<Validation, CompileError> {
    let scope = scope.with("validation", kind);
    let present = parameter_keywords(validations);

    match kind {
        ParameterKind::Timestamp => {
            check_unsupported_fields(kind, present, PARAM_TIMESTAMP_FIELDS, &scope)?;
            Ok(Validation::None)
        }
        ParameterKind::Array => {
            check_unsupported_fields(kind, present, PARAM_ARRAY_FIELDS, &scope)?;
            Ok(array_validation(
                validations.min_items,
                validations.max_items,
                validations.unique_items,
            ))
        }
        ParameterKind::String | ParameterKind::ArrayItems => {
            check_unsupported_fields(kind, present, PARAM_STRING_FIELDS, &scope)?;
            string_validation(
                validations.enum_values.as_deref(),
                validations.min_length,
                validations.max_length,
                None,
                &scope,
            )
        }
    }
}

fn array_validation(min_items: Option<u64>, max_items: Option<u64>, unique_items: bool) -> Validation {
    if min_items.is_none() && max_items.is_none() && !unique_items {
        return Validation::None;
    }
    Validation::Array(ArrayValidation {
        min_items,
        max_items,
        unique_items,
    })
}

fn as_integer(value: f64) -> Option<i64> {
    if value.fract() == 0.0 && value >= i64::MIN as f64 && value <= i64::MAX as f64 {
        Some(value as i64)
    } else {
        None
    }
}

fn integer_bound(keyword: &str, value: Option<f64>, scope: &Scope) -> Result<Option<i64>, CompileError> {
    match value {
        None => Ok(None),
        Some(v) => as_integer(v).map(Some).ok_or_else(|| {
            scope.fail(ErrorKind::NotAnInteger {
                keyword: keyword.to_string(),
                value: v.to_string(),
            })
        }),
    }
}

fn int_validation(schema: &Schema, scope: &Scope) -> Result<Validation, CompileError> {
    let mut enum_values = Vec::new();
    for value in schema.enum_values.iter().flatten() {
        let int = match value {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(as_integer)),
            _ => None,
        };
        match int {
            Some(i) => enum_values.push(i),
            None => {
                return Err(scope.fail(ErrorKind::InvalidEnumValue {
                    value: value.to_string(),
                    expected: "integer".to_string(),
                }))
            }
        }
    }

    let v = IntValidation {
        enum_values,
        maximum: integer_bound("maximum", schema.maximum, scope)?,
        exclusive_maximum: schema.exclusive_maximum,
        minimum: integer_bound("minimum", schema.minimum, scope)?,
        exclusive_minimum: schema.exclusive_minimum,
    };
    if v.enum_values.is_empty() && v.maximum.is_none() && v.minimum.is_none() {
        return Ok(Validation::None);
    }
    Ok(Validation::Int(v))
}

fn number_validation(schema: &Schema, scope: &Scope) -> Result<Validation, CompileError> {
    let mut enum_values = Vec::new();
    for value in schema.enum_values.iter().flatten() {
        match value.as_f64() {
            Some(n) => enum_values.push(n),
            None => {
                return Err(scope.fail(ErrorKind::InvalidEnumValue {
                    value: value.to_string(),
                    expected: "number".to_string(),
                }))
            }
        }
    }

    let v = NumberValidation {
        enum_values,
        maximum: schema.maximum,
        exclusive_maximum: schema.exclusive_maximum,
        minimum: schema.minimum,
        exclusive_minimum: schema.exclusive_minimum,
    };
    if v.enum_values.is_empty() && v.maximum.is_none() && v.minimum.is_none() {
        return Ok(Validation::None);
    }
    Ok(Validation::Number(v))
}

fn string_validation(
    enum_values: Option<&[Value]>,
    min_length: Option<u64>,
    max_length: Option<u64>,
    pattern: Option<&str>,
    scope: &Scope,
) -> Result<Validation, CompileError> {
    let mut values = Vec::new();
    for value in enum_values.into_iter().flatten() {
        match value.as_str() {
            Some(s) => values.push(s.to_string()),
            None => {
                return Err(scope.fail(ErrorKind::InvalidEnumValue {
                    value: value.to_string(),
                    expected: "string".to_string(),
                }))
            }
        }
    }

    if let Some(p) = pattern {
        if let Err(e) = regex::Regex::new(p) {
            return Err(scope.fail(ErrorKind::InvalidPattern {
                pattern: p.to_string(),
                reason: e.to_string(),
            }));
        }
    }

    let v = StringValidation {
        enum_values: values,
        min_length,
        max_length,
        pattern: pattern.map(str::to_string),
    };
    if v.enum_values.is_empty() && v.min_length.is_none() && v.max_length.is_none() && v.pattern.is_none() {
        return Ok(Validation::None);
    }
    Ok(Validation::String(v))
}
