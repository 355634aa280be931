use askama::Template;
use indexmap::IndexMap;

use super::ir::{
    ModelIr, ParamDescriptor, ParameterLocation, Primitive, PropertyDescriptor, PropertyType,
    RouteDescriptor, RouterIr, TypeDescriptor, TypeKind, TypeRef, Validation, STRING_ERROR,
};
use super::naming::{regex_static, rust_ident, to_snake_case};

/// A rendered output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// File name inside the output directory
    pub name: &'static str,
    pub content: String,
}

// ---------------------------------------------------------------------------
// Shared views
// ---------------------------------------------------------------------------

/// One `if <condition> { errors.push(<message>); }` statement.
#[derive(Debug, Clone)]
pub struct CheckView {
    pub condition: String,
    pub message: String,
}

/// Everything to check on a bound `value`, and on each `item` of it.
#[derive(Debug, Clone, Default)]
pub struct ValueChecksView {
    pub checks: Vec<CheckView>,
    /// `value` is a model type with its own `validate`
    pub nested: bool,
    pub item_checks: Vec<CheckView>,
    pub item_nested: bool,
}

impl ValueChecksView {
    pub fn has_items_loop(&self) -> bool {
        !self.item_checks.is_empty() || self.item_nested
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty() && !self.nested && !self.has_items_loop()
    }
}

/// Escape text for use inside a `format!` string literal.
fn format_text(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('{', "{{")
        .replace('}', "}}")
}

fn message(text: String) -> String {
    format!("format!(\"{text}\")")
}

/// Build the checks for `validation` on `binding`, labelled `label` in messages.
///
/// `label` is already escaped and may contain format placeholders such as `{i}`.
fn checks_for(validation: &Validation, binding: &str, label: &str, regex: Option<&str>) -> Vec<CheckView> {
    let mut out = Vec::new();
    match validation {
        Validation::None | Validation::Object(_) => {}
        Validation::Array(a) => {
            if let Some(max) = a.max_items {
                out.push(CheckView {
                    condition: format!("{binding}.len() > {max}"),
                    message: message(format!("{label} should have no more than {max} elements")),
                });
            }
            if let Some(min) = a.min_items {
                out.push(CheckView {
                    condition: format!("{binding}.len() < {min}"),
                    message: message(format!("{label} should have no less than {min} elements")),
                });
            }
            if a.unique_items {
                out.push(CheckView {
                    condition: format!("{binding}.iter().enumerate().any(|(j, a)| {binding}[..j].contains(a))"),
                    message: message(format!("{label} contains duplicate elements")),
                });
            }
        }
        Validation::Int(v) => {
            if !v.enum_values.is_empty() {
                let values: Vec<String> = v.enum_values.iter().map(i64::to_string).collect();
                out.push(CheckView {
                    condition: format!("![{}].contains({binding})", values.join(", ")),
                    message: message(format!("{{{binding}}} is not an allowed value for {label}")),
                });
            }
            if let Some(max) = v.maximum {
                let (op, words) = if v.exclusive_maximum { (">=", "less than") } else { (">", "at most") };
                out.push(CheckView {
                    condition: format!("*{binding} {op} {max}"),
                    message: message(format!("{label} should be {words} {max}")),
                });
            }
            if let Some(min) = v.minimum {
                let (op, words) = if v.exclusive_minimum { ("<=", "more than") } else { ("<", "at least") };
                out.push(CheckView {
                    condition: format!("*{binding} {op} {min}"),
                    message: message(format!("{label} should be {words} {min}")),
                });
            }
        }
        Validation::Number(v) => {
            if !v.enum_values.is_empty() {
                let values: Vec<String> = v.enum_values.iter().map(|n| format!("{n:?}")).collect();
                out.push(CheckView {
                    condition: format!("![{}].contains({binding})", values.join(", ")),
                    message: message(format!("{{{binding}}} is not an allowed value for {label}")),
                });
            }
            if let Some(max) = v.maximum {
                let (op, words) = if v.exclusive_maximum { (">=", "less than") } else { (">", "at most") };
                out.push(CheckView {
                    condition: format!("*{binding} {op} {max:?}"),
                    message: message(format!("{label} should be {words} {max}")),
                });
            }
            if let Some(min) = v.minimum {
                let (op, words) = if v.exclusive_minimum { ("<=", "more than") } else { ("<", "at least") };
                out.push(CheckView {
                    condition: format!("*{binding} {op} {min:?}"),
                    message: message(format!("{label} should be {words} {min}")),
                });
            }
        }
        Validation::String(v) => {
            if !v.enum_values.is_empty() {
                let values: Vec<String> = v.enum_values.iter().map(|s| format!("{s:?}")).collect();
                out.push(CheckView {
                    condition: format!("![{}].contains(&{binding}.as_str())", values.join(", ")),
                    message: message(format!("{{{binding}}} is not an allowed value for {label}")),
                });
            }
            if let Some(max) = v.max_length {
                out.push(CheckView {
                    condition: format!("{binding}.chars().count() > {max}"),
                    message: message(format!("{label} should be no longer than {max} characters")),
                });
            }
            if let Some(min) = v.min_length {
                out.push(CheckView {
                    condition: format!("{binding}.chars().count() < {min}"),
                    message: message(format!("{label} should be no shorter than {min} characters")),
                });
            }
            if let (Some(pattern), Some(regex)) = (&v.pattern, regex) {
                out.push(CheckView {
                    condition: format!("!{}.is_match({binding})", regex_static(regex)),
                    message: message(format!("{label} should match the regex {}", format_text(pattern))),
                });
            }
        }
    }
    out
}

fn value_checks(
    validation: &Validation,
    target: &TypeRef,
    item: Option<(&TypeRef, &Validation)>,
    label: &str,
    regex: Option<&str>,
) -> ValueChecksView {
    let label = format_text(label);
    let mut view = ValueChecksView {
        checks: checks_for(validation, "value", &label, regex),
        ..Default::default()
    };
    match item {
        Some((item, item_validation)) => {
            view.item_checks = checks_for(item_validation, "item", &format!("{label}[{{i}}]"), regex);
            view.item_nested = item.named().is_some();
        }
        None => view.nested = target.named().is_some(),
    }
    view
}

fn local_type(t: &TypeRef) -> String {
    match t {
        TypeRef::Primitive(p) => p.rust_type().to_string(),
        TypeRef::Named(name) => name.clone(),
    }
}

/// First doc line of a generated type: the name, then the description if any.
fn doc_line(name: &str, description: &str) -> String {
    if description.trim().is_empty() {
        name.to_string()
    } else {
        format!("{name}: {}", doc_text(description, ""))
    }
}

/// Continue multi-line text as further `///` lines at `indent`.
fn doc_text(text: &str, indent: &str) -> String {
    text.trim().lines().collect::<Vec<_>>().join(&format!("\n{indent}/// "))
}

// ---------------------------------------------------------------------------
// model.rs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct FieldView {
    pub field: String,
    pub wire: String,
    pub doc: String,
    pub rust_type: String,
}

impl FieldView {
    fn new(p: &PropertyDescriptor) -> Self {
        let rust_type = match &p.ty {
            PropertyType::Scalar(t) => local_type(t),
            PropertyType::Slice { item, .. } => format!("Vec<{}>", local_type(item)),
        };
        FieldView {
            field: rust_ident(&to_snake_case(&p.name)),
            wire: p.wire_name.clone(),
            doc: doc_text(&p.description, "    "),
            rust_type,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TypeView {
    pub name: String,
    pub doc: String,
    /// Doc line of the read-only variant
    pub ro_doc: String,
    pub is_struct: bool,
    pub is_slice: bool,
    pub has_read_only: bool,
    /// Writable struct fields
    pub fields: Vec<FieldView>,
    /// Read-only struct fields
    pub ro_fields: Vec<FieldView>,
    /// Slice item type, or alias target type
    pub inner_type: String,
    /// Slice item type of the read-only variant
    pub ro_inner_type: String,
    /// Constructor arguments forwarded to the struct an alias resolves to
    pub forward_args: Vec<FieldView>,
    pub has_forward: bool,
}

#[derive(Template)]
#[template(path = "model.rs.txt", escape = "none")]
pub struct ModelTemplateData {
    pub types: Vec<TypeView>,
    pub needs_time: bool,
}

fn type_view(model: &ModelIr, t: &TypeDescriptor) -> TypeView {
    let mut view = TypeView {
        name: t.name.clone(),
        doc: doc_line(&t.name, &t.description),
        ro_doc: doc_line(&format!("ReadOnly{}", t.name), &t.description),
        has_read_only: t.has_read_only_props,
        ..Default::default()
    };
    match &t.kind {
        TypeKind::Struct { props } => {
            view.is_struct = true;
            view.fields = props.iter().filter(|p| !p.read_only).map(FieldView::new).collect();
            view.ro_fields = props.iter().filter(|p| p.read_only).map(FieldView::new).collect();
        }
        TypeKind::Slice { item, .. } => {
            view.is_slice = true;
            view.inner_type = local_type(item);
            view.ro_inner_type = match item.named() {
                Some(name) if model.is_read_only(name) => format!("ReadOnly{name}"),
                _ => view.inner_type.clone(),
            };
        }
        TypeKind::Alias { target, .. } => {
            view.inner_type = local_type(target);
            let resolved = model.resolve_alias(t);
            if resolved.is_struct() && resolved.name != t.name {
                view.has_forward = true;
                view.forward_args = resolved
                    .props()
                    .iter()
                    .filter(|p| !p.read_only)
                    .map(FieldView::new)
                    .collect();
            }
        }
    }
    view
}

// ---------------------------------------------------------------------------
// validate.rs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PropChecksView {
    pub field: String,
    pub wire: String,
    pub required: bool,
    pub value: ValueChecksView,
}

#[derive(Debug, Clone)]
pub struct ValidateImplView {
    pub type_name: String,
    /// Read-only variant: validate the flattened base first
    pub has_base: bool,
    pub props: Vec<PropChecksView>,
    /// Checks on `self.0` for slices and aliases
    pub inner: ValueChecksView,
    pub has_inner: bool,
}

#[derive(Debug, Clone)]
pub struct PatternView {
    pub static_name: String,
    pub literal: String,
}

#[derive(Template)]
#[template(path = "validate.rs.txt", escape = "none")]
pub struct ValidateTemplateData {
    pub impls: Vec<ValidateImplView>,
    pub patterns: Vec<PatternView>,
}

fn prop_checks(t: &TypeDescriptor, p: &PropertyDescriptor) -> Option<PropChecksView> {
    let regex = format!("{}{}", t.name, p.name);
    let value = match &p.ty {
        PropertyType::Scalar(target) => value_checks(&p.validation, target, None, &p.wire_name, Some(&regex)),
        PropertyType::Slice { item, item_validation } => {
            value_checks(&p.validation, item, Some((item, item_validation)), &p.wire_name, Some(&regex))
        }
    };
    if !p.required && value.is_empty() {
        return None;
    }
    Some(PropChecksView {
        field: rust_ident(&to_snake_case(&p.name)),
        wire: format_text(&p.wire_name),
        required: p.required,
        value,
    })
}

fn validate_impls(t: &TypeDescriptor) -> Vec<ValidateImplView> {
    match &t.kind {
        TypeKind::Struct { props } => {
            let mut impls = vec![ValidateImplView {
                type_name: t.name.clone(),
                has_base: false,
                props: props.iter().filter(|p| !p.read_only).filter_map(|p| prop_checks(t, p)).collect(),
                inner: ValueChecksView::default(),
                has_inner: false,
            }];
            if t.has_read_only_props {
                impls.push(ValidateImplView {
                    type_name: format!("ReadOnly{}", t.name),
                    has_base: true,
                    props: props.iter().filter(|p| p.read_only).filter_map(|p| prop_checks(t, p)).collect(),
                    inner: ValueChecksView::default(),
                    has_inner: false,
                });
            }
            impls
        }
        TypeKind::Slice { item, item_validation } => {
            let inner = value_checks(&t.validation, item, Some((item, item_validation)), &t.name, Some(&t.name));
            let mut impls = vec![ValidateImplView {
                type_name: t.name.clone(),
                has_base: false,
                props: Vec::new(),
                has_inner: !inner.is_empty(),
                inner: inner.clone(),
            }];
            if t.has_read_only_props {
                impls.push(ValidateImplView {
                    type_name: format!("ReadOnly{}", t.name),
                    has_base: false,
                    props: Vec::new(),
                    has_inner: !inner.is_empty(),
                    inner,
                });
            }
            impls
        }
        TypeKind::Alias { target, .. } => {
            let inner = value_checks(&t.validation, target, None, &t.name, Some(&t.name));
            vec![ValidateImplView {
                type_name: t.name.clone(),
                has_base: false,
                props: Vec::new(),
                has_inner: !inner.is_empty(),
                inner,
            }]
        }
    }
}

// ---------------------------------------------------------------------------
// errors.rs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ErrorTypeView {
    pub name: String,
    /// Display the wrapped primitive instead of the debug form
    pub display_inner: bool,
}

#[derive(Template)]
#[template(path = "errors.rs.txt", escape = "none")]
pub struct ErrorsTemplateData {
    pub types: Vec<ErrorTypeView>,
}

// ---------------------------------------------------------------------------
// route_errors.rs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct VariantView {
    pub type_name: String,
    pub status: u16,
}

#[derive(Debug, Clone)]
pub struct RouteErrorView {
    pub enum_name: String,
    pub fn_name: String,
    pub variants: Vec<VariantView>,
}

#[derive(Debug, Clone)]
pub struct GroupRouteView {
    pub enum_name: String,
    pub status: u16,
}

#[derive(Debug, Clone)]
pub struct GroupView {
    pub type_name: String,
    pub routes: Vec<GroupRouteView>,
}

#[derive(Template)]
#[template(path = "route_errors.rs.txt", escape = "none")]
pub struct RouteErrorsTemplateData {
    pub model_package: String,
    pub routes: Vec<RouteErrorView>,
    pub groups: Vec<GroupView>,
}

fn error_enum(handler_name: &str) -> String {
    format!("{handler_name}Error")
}

// ---------------------------------------------------------------------------
// router.rs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ArgView {
    pub name: String,
    pub rust_type: String,
}

#[derive(Debug, Clone)]
pub struct ParamView {
    pub arg_name: String,
    pub raw_name: String,
    /// Expression producing `Option<String>`
    pub getter: String,
    pub is_array: bool,
    pub is_time: bool,
    pub required: bool,
    pub checks: ValueChecksView,
}

#[derive(Debug, Clone)]
pub struct RouteView {
    pub fn_name: String,
    pub handler_name: String,
    pub method: String,
    pub route: String,
    pub tag: String,
    pub new_block: bool,
    pub summary: String,
    pub error_enum: String,
    pub args: Vec<ArgView>,
    pub call_args: String,
    pub params: Vec<ParamView>,
    pub has_path: bool,
    pub has_query: bool,
    pub has_headers: bool,
    pub has_body: bool,
    pub body_arg: String,
    pub body_type: String,
    pub has_validation: bool,
    pub validation_sink: String,
    pub catch_all_sink: String,
    pub has_result: bool,
    pub result_type: String,
    pub variants: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct PathGroupView {
    pub route: String,
    pub chain: String,
}

#[derive(Debug, Clone)]
pub struct SinkView {
    pub method: String,
    pub rust_type: String,
}

#[derive(Template)]
#[template(path = "router.rs.txt", escape = "none")]
pub struct RouterTemplateData {
    pub model_package: String,
    pub needs_time: bool,
    pub routes: Vec<RouteView>,
    pub paths: Vec<PathGroupView>,
    pub bad_request_sinks: Vec<SinkView>,
    pub internal_sinks: Vec<SinkView>,
}

fn sink(prefix: &str, type_name: &str) -> SinkView {
    if type_name == STRING_ERROR {
        SinkView {
            method: format!("{prefix}_string"),
            rust_type: "String".to_string(),
        }
    } else {
        SinkView {
            method: format!("{prefix}_{}", to_snake_case(type_name)),
            rust_type: format!("model::{type_name}"),
        }
    }
}

fn param_rust_type(p: &ParamDescriptor) -> String {
    let base = p.primitive.rust_type();
    if p.is_array {
        format!("Vec<{base}>")
    } else if p.required {
        base.to_string()
    } else {
        format!("Option<{base}>")
    }
}

fn param_view(p: &ParamDescriptor) -> ParamView {
    let raw = format!("{:?}", p.raw_name);
    let getter = match p.location {
        ParameterLocation::Path => format!("path.get({raw}).cloned()"),
        ParameterLocation::Query => format!("query.get({raw}).cloned()"),
        ParameterLocation::Header => {
            format!("headers.get({raw}).and_then(|v| v.to_str().ok()).map(str::to_string)")
        }
    };
    let target = TypeRef::Primitive(p.primitive);
    let item = p.is_array.then_some((&target, &p.item_validation));
    ParamView {
        arg_name: p.arg_name.clone(),
        raw_name: format_text(&p.raw_name),
        getter,
        is_array: p.is_array,
        is_time: p.primitive == Primitive::Timestamp,
        required: p.required,
        checks: value_checks(&p.validation, &target, item, &p.raw_name, None),
    }
}

fn route_view(r: &RouteDescriptor) -> RouteView {
    let mut args: Vec<ArgView> = r
        .params
        .iter()
        .map(|p| ArgView {
            name: p.arg_name.clone(),
            rust_type: param_rust_type(p),
        })
        .collect();
    if let Some(body) = &r.body {
        args.push(ArgView {
            name: body.arg_name.clone(),
            rust_type: format!("model::{}", body.type_name),
        });
    }
    let call_args = args.iter().map(|a| a.name.as_str()).collect::<Vec<_>>().join(", ");

    let result_type = match &r.result {
        None => String::new(),
        Some(result) => {
            let prefix = if result.read_only { "ReadOnly" } else { "" };
            let name = format!("model::{prefix}{}", result.type_name);
            if result.is_array {
                format!("Vec<{name}>")
            } else {
                name
            }
        }
    };

    RouteView {
        fn_name: r.fn_name.clone(),
        handler_name: r.handler_name.clone(),
        method: r.method.as_str().to_lowercase(),
        route: r.route.clone(),
        tag: r.tag.clone(),
        new_block: r.new_block,
        summary: r.summary.clone(),
        error_enum: error_enum(&r.handler_name),
        args,
        call_args,
        params: r.params.iter().map(param_view).collect(),
        has_path: r.params.iter().any(|p| p.location == ParameterLocation::Path),
        has_query: r.params.iter().any(|p| p.location == ParameterLocation::Query),
        has_headers: r.params.iter().any(|p| p.location == ParameterLocation::Header),
        has_body: r.body.is_some(),
        body_arg: r.body.as_ref().map(|b| b.arg_name.clone()).unwrap_or_default(),
        body_type: r.body.as_ref().map(|b| b.type_name.clone()).unwrap_or_default(),
        has_validation: r.has_validation,
        validation_sink: sink(
            "validation_errors_to",
            r.validation_error.as_deref().unwrap_or(STRING_ERROR),
        )
        .method,
        catch_all_sink: sink("error_to", r.catch_all_error.as_deref().unwrap_or(STRING_ERROR)).method,
        has_result: r.result.is_some(),
        result_type,
        variants: r.result_errors.iter().map(|e| e.type_name.clone()).collect(),
    }
}

// ---------------------------------------------------------------------------
// swagger.rs and mod.rs
// ---------------------------------------------------------------------------

#[derive(Template)]
#[template(path = "swagger.rs.txt", escape = "none")]
pub struct SwaggerTemplateData {
    pub source_name: String,
    pub hashes: String,
    pub source: String,
}

#[derive(Template)]
#[template(path = "mod.rs.txt", escape = "none")]
pub struct ModTemplateData {
    pub source_name: String,
    pub needs_time: bool,
    pub needs_regex: bool,
}

/// Enough `#` marks to delimit `source` as a raw string literal.
fn raw_string_hashes(source: &str) -> String {
    let mut longest = 0;
    let mut current = None;
    for c in source.chars() {
        current = match (c, current) {
            ('"', _) => Some(0),
            ('#', Some(n)) => Some(n + 1),
            _ => None,
        };
        if let Some(n) = current {
            longest = longest.max(n);
        }
    }
    "#".repeat(longest + 1)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Render every output file from the compiled IR.
///
/// # Errors
///
/// Returns an error if a template fails to render.
pub fn render_artifacts(
    model: &ModelIr,
    router: &RouterIr,
    source: &str,
    source_name: &str,
) -> anyhow::Result<Vec<Artifact>> {
    let needs_time = model.needs_time || router.needs_time;

    let model_rs = ModelTemplateData {
        types: model.types.iter().map(|t| type_view(model, t)).collect(),
        needs_time: model.needs_time,
    }
    .render()?;

    let validate_rs = ValidateTemplateData {
        impls: model.types.iter().flat_map(validate_impls).collect(),
        patterns: model
            .patterns
            .iter()
            .map(|p| PatternView {
                static_name: regex_static(&p.name),
                literal: format!("{:?}", p.pattern),
            })
            .collect(),
    }
    .render()?;

    let errors_rs = ErrorsTemplateData {
        types: model
            .types
            .iter()
            .filter(|t| t.is_error)
            .map(|t| ErrorTypeView {
                name: t.name.clone(),
                display_inner: matches!(t.kind, TypeKind::Alias { target: TypeRef::Primitive(_), .. }),
            })
            .collect(),
    }
    .render()?;

    let route_errors_rs = RouteErrorsTemplateData {
        model_package: router.model_package.clone(),
        routes: router
            .routes
            .iter()
            .map(|r| RouteErrorView {
                enum_name: error_enum(&r.handler_name),
                fn_name: r.fn_name.clone(),
                variants: r
                    .result_errors
                    .iter()
                    .map(|e| VariantView {
                        type_name: e.type_name.clone(),
                        status: e.status,
                    })
                    .collect(),
            })
            .collect(),
        groups: router
            .all_errors
            .iter()
            .map(|g| GroupView {
                type_name: g.type_name.clone(),
                routes: g
                    .routes
                    .iter()
                    .map(|r| GroupRouteView {
                        enum_name: error_enum(&r.handler_name),
                        status: r.status,
                    })
                    .collect(),
            })
            .collect(),
    }
    .render()?;

    let mut paths: IndexMap<&str, Vec<String>> = IndexMap::new();
    for r in &router.routes {
        paths.entry(r.route.as_str()).or_default().push(format!(
            "{}({}::<H, T>)",
            r.method.as_str().to_lowercase(),
            r.fn_name
        ));
    }
    let router_rs = RouterTemplateData {
        model_package: router.model_package.clone(),
        needs_time: router.needs_time,
        routes: router.routes.iter().map(route_view).collect(),
        paths: paths
            .into_iter()
            .map(|(route, chain)| PathGroupView {
                route: route.to_string(),
                chain: chain.join("."),
            })
            .collect(),
        bad_request_sinks: router
            .bad_request_errors
            .iter()
            .map(|e| sink("validation_errors_to", e))
            .collect(),
        internal_sinks: router
            .internal_server_errors
            .iter()
            .map(|e| sink("error_to", e))
            .collect(),
    }
    .render()?;

    let swagger_rs = SwaggerTemplateData {
        source_name: source_name.to_string(),
        hashes: raw_string_hashes(source),
        source: source.to_string(),
    }
    .render()?;

    let mod_rs = ModTemplateData {
        source_name: source_name.to_string(),
        needs_time,
        needs_regex: !model.patterns.is_empty(),
    }
    .render()?;

    Ok(vec![
        Artifact { name: "mod.rs", content: mod_rs },
        Artifact { name: "swagger.rs", content: swagger_rs },
        Artifact { name: "model.rs", content: model_rs },
        Artifact { name: "validate.rs", content: validate_rs },
        Artifact { name: "errors.rs", content: errors_rs },
        Artifact { name: "route_errors.rs", content: route_errors_rs },
        Artifact { name: "router.rs", content: router_rs },
    ])
}
