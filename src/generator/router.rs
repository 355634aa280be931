//! Compilation of `paths` into the Router IR.

use super::error::{CompileError, ErrorKind};
use super::ir::{
    BodyDescriptor, ErrorRoute, ErrorTypeGroup, ModelIr, ParamDescriptor, ParameterLocation,
    Primitive, ResultDescriptor, ResultError, RouteDescriptor, RouterIr, Validation, STRING_ERROR,
};
use super::naming::{format_name, lower_start, to_snake_case};
use super::reference::{resolve_definition_ref, resolve_parameter_ref};
use super::scope::Scope;
use super::validation::{parameter_validation, ParameterKind};
use crate::spec::{Operation, Parameter, ParameterIn, PathItem, Schema, Swagger};
use http::Method;
use indexmap::IndexMap;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, info, warn};

/// Settings that are not part of the Swagger document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterOptions {
    /// Rust path of the generated model module, as seen from the router module
    pub model_package: String,
    /// Tag for operations that declare none
    pub default_tag: String,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            model_package: "super::model".to_string(),
            default_tag: "Other".to_string(),
        }
    }
}

fn method_rank(method: &Method) -> u8 {
    match *method {
        Method::GET => 0,
        Method::POST => 1,
        Method::PUT => 2,
        Method::DELETE => 3,
        _ => 4,
    }
}

/// Rewrite `{name}` path segments to `:name`.
pub fn format_route(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut chars = path.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '{' {
            out.push(c);
            continue;
        }
        let mut name = String::new();
        let mut closed = false;
        for n in chars.by_ref() {
            if n == '}' {
                closed = true;
                break;
            }
            name.push(n);
        }
        if closed {
            out.push(':');
            out.push_str(&name);
        } else {
            out.push('{');
            out.push_str(&name);
        }
    }
    out
}

fn check_media_types(types: &[String], scope: &Scope) -> Result<(), CompileError> {
    for t in types {
        if !t.starts_with("application/json") {
            return Err(scope.fail(ErrorKind::UnsupportedMediaType(t.clone())));
        }
    }
    Ok(())
}

/// Compile every path of the document into a sorted Router IR.
///
/// # Errors
///
/// Returns the first unsupported construct found.
pub fn compile_router(
    swagger: &Swagger,
    model: &ModelIr,
    options: &RouterOptions,
    scope: &Scope,
) -> Result<RouterIr, CompileError> {
    check_media_types(&swagger.consumes, &scope.with("field", "consumes"))?;
    check_media_types(&swagger.produces, &scope.with("field", "produces"))?;

    let mut routes = Vec::new();
    let mut operation_ids: HashMap<String, String> = HashMap::new();

    for (path, item) in &swagger.paths {
        let scope = scope.with("path", path);
        info!(path = %path, "Compiling path");

        if item.reference.is_some() {
            return Err(scope.fail(ErrorKind::PathItemReference));
        }
        for (method, present) in [
            ("HEAD", item.head.is_some()),
            ("OPTIONS", item.options.is_some()),
            ("PATCH", item.patch.is_some()),
        ] {
            if present {
                return Err(scope.with("method", method).fail(ErrorKind::UnsupportedMethod(method.to_string())));
            }
        }

        for (method, operation) in [
            (Method::GET, &item.get),
            (Method::POST, &item.post),
            (Method::PUT, &item.put),
            (Method::DELETE, &item.delete),
        ] {
            let Some(operation) = operation else {
                continue;
            };
            let scope = scope.with("method", &method);
            let route = compile_route(swagger, model, options, path, item, method, operation, &scope)?;

            let raw_id = operation.operation_id.clone().unwrap_or_default();
            if let Some(previous) = operation_ids.insert(route.handler_name.clone(), path.clone()) {
                return Err(scope
                    .with("previous_path", previous)
                    .fail(ErrorKind::DuplicateOperationId(raw_id)));
            }
            routes.push(route);
        }
    }

    routes.sort_by(|a, b| {
        a.tag
            .cmp(&b.tag)
            .then_with(|| a.route.cmp(&b.route))
            .then_with(|| method_rank(&a.method).cmp(&method_rank(&b.method)))
    });

    let mut prev_tag: Option<&str> = None;
    let mut new_blocks = Vec::with_capacity(routes.len());
    for r in &routes {
        new_blocks.push(prev_tag != Some(r.tag.as_str()));
        prev_tag = Some(r.tag.as_str());
    }
    for (r, new_block) in routes.iter_mut().zip(new_blocks) {
        r.new_block = new_block;
    }

    let all_errors = group_errors(&routes);
    let bad_request_errors = fallback_set(
        routes
            .iter()
            .filter(|r| r.has_validation)
            .map(|r| r.validation_error.as_deref()),
    );
    let internal_server_errors = fallback_set(routes.iter().map(|r| r.catch_all_error.as_deref()));
    let needs_time = routes
        .iter()
        .flat_map(|r| &r.params)
        .any(|p| p.primitive == Primitive::Timestamp);

    info!(
        routes_count = routes.len(),
        error_types_count = all_errors.len(),
        "Router compiled"
    );

    Ok(RouterIr {
        routes,
        model_package: options.model_package.clone(),
        bad_request_errors,
        internal_server_errors,
        all_errors,
        needs_time,
    })
}

/// Sorted, de-duplicated error type names; routes without one use `"string"`.
fn fallback_set<'a>(errors: impl Iterator<Item = Option<&'a str>>) -> Vec<String> {
    let mut set: BTreeSet<String> = errors
        .map(|e| e.unwrap_or(STRING_ERROR).to_string())
        .collect();
    if set.is_empty() {
        set.insert(STRING_ERROR.to_string());
    }
    set.into_iter().collect()
}

/// Invert the per-route error lists into one entry per error type.
pub fn group_errors(routes: &[RouteDescriptor]) -> Vec<ErrorTypeGroup> {
    let mut groups: BTreeMap<&str, Vec<ErrorRoute>> = BTreeMap::new();
    for r in routes {
        for e in &r.result_errors {
            groups.entry(e.type_name.as_str()).or_default().push(ErrorRoute {
                handler_name: r.handler_name.clone(),
                status: e.status,
            });
        }
    }
    groups
        .into_iter()
        .map(|(type_name, mut routes)| {
            routes.sort_by(|a, b| a.handler_name.cmp(&b.handler_name).then(a.status.cmp(&b.status)));
            ErrorTypeGroup {
                type_name: type_name.to_string(),
                routes,
            }
        })
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn compile_route(
    swagger: &Swagger,
    model: &ModelIr,
    options: &RouterOptions,
    path: &str,
    item: &PathItem,
    method: Method,
    operation: &Operation,
    scope: &Scope,
) -> Result<RouteDescriptor, CompileError> {
    let operation_id = operation
        .operation_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| scope.fail(ErrorKind::MissingOperationId))?;
    let scope = scope.with("operation", operation_id);
    debug!(operation = %operation_id, "Compiling operation");

    if operation.tags.len() > 1 {
        return Err(scope.fail(ErrorKind::MultipleTags(operation.tags.clone())));
    }
    let tag = operation
        .tags
        .first()
        .cloned()
        .unwrap_or_else(|| options.default_tag.clone());

    if let Some(consumes) = &operation.consumes {
        check_media_types(consumes, &scope.with("field", "consumes"))?;
    }
    if let Some(produces) = &operation.produces {
        check_media_types(produces, &scope.with("field", "produces"))?;
    }

    let handler_name = format_name(operation_id);
    let merged = merge_params(&swagger.parameters, &item.parameters, &operation.parameters, &scope)?;

    let mut body = None;
    let mut params = Vec::new();
    for parameter in merged.values() {
        let param_scope = scope.with("parameter", &parameter.name);
        match parameter.location {
            Some(ParameterIn::Body) => body = Some(compile_body(parameter, model, &param_scope)?),
            Some(ParameterIn::FormData) => return Err(param_scope.fail(ErrorKind::FormDataParameter)),
            Some(ParameterIn::Path) => params.push(compile_param(ParameterLocation::Path, parameter, &param_scope)?),
            Some(ParameterIn::Header) => params.push(compile_param(ParameterLocation::Header, parameter, &param_scope)?),
            Some(ParameterIn::Query) => params.push(compile_param(ParameterLocation::Query, parameter, &param_scope)?),
            None => return Err(param_scope.fail(ErrorKind::MissingParameterLocation)),
        }
    }
    params.sort_by(|a, b| a.location.cmp(&b.location).then_with(|| a.name.cmp(&b.name)));

    let responses = compile_responses(&operation.responses, model, &scope)?;

    let has_validation = body.is_some()
        || params.iter().any(|p| {
            p.validation.has_validation()
                || p.item_validation.has_validation()
                || p.primitive == Primitive::Timestamp
        });

    if responses.declares_bad_request && !has_validation {
        warn!(
            operation = %operation_id,
            path = %path,
            "Route declares a 400 response but has no input that needs validation"
        );
    }

    Ok(RouteDescriptor {
        method,
        path: path.to_string(),
        route: format_route(path),
        name: lower_start(&handler_name),
        fn_name: to_snake_case(&handler_name),
        handler_name,
        summary: operation.summary.clone().unwrap_or_default(),
        tag,
        body,
        params,
        result: responses.result,
        result_errors: responses.errors,
        validation_error: responses.validation_error,
        catch_all_error: responses.catch_all_error,
        has_validation,
        new_block: false,
    })
}

/// Merge path level and operation level parameters.
///
/// Entries are keyed by location and name; later entries replace earlier ones.
/// There is at most one body, whatever its name.
fn merge_params(
    shared: &IndexMap<String, Parameter>,
    path_level: &[Parameter],
    operation_level: &[Parameter],
    scope: &Scope,
) -> Result<IndexMap<(ParameterIn, String), Parameter>, CompileError> {
    let mut merged = IndexMap::new();
    for parameter in path_level.iter().chain(operation_level) {
        let parameter = match &parameter.reference {
            Some(reference) => resolve_parameter_ref(reference, shared, &scope.with("reference", reference))?,
            None => parameter,
        };
        let location = parameter
            .location
            .ok_or_else(|| scope.with("parameter", &parameter.name).fail(ErrorKind::MissingParameterLocation))?;
        let key = match location {
            ParameterIn::Body => (ParameterIn::Body, String::new()),
            other => (other, parameter.name.clone()),
        };
        merged.insert(key, parameter.clone());
    }
    Ok(merged)
}

fn compile_body(parameter: &Parameter, model: &ModelIr, scope: &Scope) -> Result<BodyDescriptor, CompileError> {
    if !parameter.required {
        return Err(scope.fail(ErrorKind::OptionalBody));
    }
    let schema = parameter
        .schema
        .as_ref()
        .ok_or_else(|| scope.fail(ErrorKind::MissingBodySchema))?;
    let reference = schema
        .reference
        .as_deref()
        .ok_or_else(|| scope.fail(ErrorKind::InlineSchema("body")))?;
    let type_name = known_type(reference, model, scope)?;

    let name = format!("body{}", format_name(&parameter.name));
    Ok(BodyDescriptor {
        arg_name: to_snake_case(&name),
        name,
        type_name,
    })
}

fn known_type(reference: &str, model: &ModelIr, scope: &Scope) -> Result<String, CompileError> {
    let name = resolve_definition_ref(reference, scope)?;
    if model.find(&name).is_none() {
        return Err(scope.fail(ErrorKind::UnknownType(name)));
    }
    Ok(name)
}

fn string_primitive(format: Option<&str>, scope: &Scope) -> Result<Primitive, CompileError> {
    match format.unwrap_or("") {
        "" | "password" => Ok(Primitive::String),
        "date-time" => Ok(Primitive::Timestamp),
        other => Err(scope.fail(ErrorKind::UnsupportedFormat {
            format: other.to_string(),
        })),
    }
}

fn compile_param(location: ParameterLocation, parameter: &Parameter, scope: &Scope) -> Result<ParamDescriptor, CompileError> {
    let param_type = parameter.param_type.as_deref().unwrap_or("");
    let scope = scope.with("parameter_type", param_type);

    let (primitive, is_array, validation, item_validation) = match param_type {
        "string" => {
            let primitive = string_primitive(parameter.format.as_deref(), &scope)?;
            let kind = match primitive {
                Primitive::Timestamp => ParameterKind::Timestamp,
                _ => ParameterKind::String,
            };
            let validation = parameter_validation(kind, &parameter.validations, &scope)?;
            (primitive, false, validation, Validation::None)
        }
        "array" => {
            let items = parameter
                .items
                .as_ref()
                .ok_or_else(|| scope.fail(ErrorKind::UnsupportedArrayItems))?;
            let plain_string = items.item_type.as_deref() == Some("string")
                && items.format.as_deref().unwrap_or("").is_empty()
                && items.items.is_none();
            if !plain_string {
                return Err(scope.fail(ErrorKind::UnsupportedArrayItems));
            }
            match parameter.collection_format.as_deref().unwrap_or("") {
                "" | "csv" => {}
                other => return Err(scope.fail(ErrorKind::UnsupportedCollectionFormat(other.to_string()))),
            }
            let validation = parameter_validation(ParameterKind::Array, &parameter.validations, &scope)?;
            let item_validation = parameter_validation(ParameterKind::ArrayItems, &items.validations, &scope)?;
            (Primitive::String, true, validation, item_validation)
        }
        other => return Err(scope.fail(ErrorKind::UnsupportedParameterType(other.to_string()))),
    };

    let name = format_name(&parameter.name);
    Ok(ParamDescriptor {
        arg_name: to_snake_case(&format!("{location}{name}")),
        name,
        raw_name: parameter.name.clone(),
        location,
        primitive,
        is_array,
        // path parameters are always present when the route matches
        required: parameter.required || location == ParameterLocation::Path,
        validation,
        item_validation,
    })
}

#[derive(Debug, Default)]
struct CompiledResponses {
    result: Option<ResultDescriptor>,
    errors: Vec<ResultError>,
    validation_error: Option<String>,
    catch_all_error: Option<String>,
    declares_bad_request: bool,
}

fn success_result(schema: &Schema, model: &ModelIr, scope: &Scope) -> Result<ResultDescriptor, CompileError> {
    let (reference, is_array) = match (&schema.reference, schema.types.as_slice()) {
        (Some(reference), _) => (reference.as_str(), false),
        (None, [t]) if t == "array" => {
            let reference = schema
                .single_items()
                .and_then(|items| items.reference.as_deref())
                .ok_or_else(|| scope.fail(ErrorKind::InlineSchema("success response items")))?;
            (reference, true)
        }
        _ => return Err(scope.fail(ErrorKind::InlineSchema("success response"))),
    };
    let type_name = known_type(reference, model, scope)?;
    Ok(ResultDescriptor {
        read_only: model.is_read_only(&type_name),
        type_name,
        is_array,
    })
}

fn compile_responses(
    responses: &IndexMap<String, crate::spec::Response>,
    model: &ModelIr,
    scope: &Scope,
) -> Result<CompiledResponses, CompileError> {
    let mut out = CompiledResponses::default();
    let mut has_success = false;
    let mut seen_errors: HashMap<String, u16> = HashMap::new();

    for (code, response) in responses {
        let scope = scope.with("response", code);
        if code == "default" {
            return Err(scope.fail(ErrorKind::DefaultResponse));
        }
        let status: u16 = code
            .parse()
            .ok()
            .filter(|s| (100..600).contains(s))
            .ok_or_else(|| scope.fail(ErrorKind::InvalidStatusCode(code.clone())))?;
        if let Some(reference) = &response.reference {
            return Err(scope.fail(ErrorKind::ResponseReference(reference.clone())));
        }

        if (200..300).contains(&status) {
            if has_success {
                return Err(scope.fail(ErrorKind::MultipleSuccessResponses));
            }
            has_success = true;
            if let Some(schema) = &response.schema {
                out.result = Some(success_result(schema, model, &scope)?);
            }
            continue;
        }

        if status == 400 {
            out.declares_bad_request = true;
        }
        let Some(schema) = &response.schema else {
            continue;
        };
        let reference = schema
            .reference
            .as_deref()
            .ok_or_else(|| scope.fail(ErrorKind::InlineSchema("error response")))?;
        let type_name = known_type(reference, model, &scope)?;
        if !model.is_error_type(&type_name) {
            return Err(scope.fail(ErrorKind::NotAnErrorType { type_name, status }));
        }
        if let Some(previous) = seen_errors.insert(type_name.clone(), status) {
            return Err(scope.fail(ErrorKind::DuplicateErrorType {
                type_name,
                status: previous,
            }));
        }

        match status {
            400 => out.validation_error = Some(type_name.clone()),
            500 => out.catch_all_error = Some(type_name.clone()),
            _ => {}
        }
        out.errors.push(ResultError { type_name, status });
    }

    out.errors.sort_by_key(|e| e.status);
    Ok(out)
}
