//! Compilation of `definitions` into the Model IR.

use super::error::{CompileError, ErrorKind};
use super::ir::{
    ModelIr, Pattern, Primitive, PropertyDescriptor, PropertyType, TypeDescriptor, TypeId,
    TypeKind, TypeRef, Validation,
};
use super::naming::{format_name, regex_static};
use super::reference::resolve_definition_ref;
use super::scope::Scope;
use super::validation::{schema_validation, SchemaKind};
use crate::spec::{Schema, SchemaItems};
use indexmap::IndexMap;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// A schema after its declared type has been resolved.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ResolvedType {
    Reference(String),
    Primitive(Primitive),
    Object,
    Array {
        item: TypeRef,
        item_validation: Validation,
    },
}

impl ResolvedType {
    fn as_type_ref(&self) -> Option<TypeRef> {
        match self {
            ResolvedType::Reference(name) => Some(TypeRef::Named(name.clone())),
            ResolvedType::Primitive(p) => Some(TypeRef::Primitive(*p)),
            _ => None,
        }
    }
}

fn primitive_for(schema_type: &str, format: Option<&str>, scope: &Scope) -> Result<Option<Primitive>, CompileError> {
    let primitive = match schema_type {
        "boolean" => Primitive::Bool,
        "integer" => Primitive::Int64,
        "number" => Primitive::Float64,
        "string" => match format.unwrap_or("") {
            "" | "password" => Primitive::String,
            "date-time" => Primitive::Timestamp,
            other => {
                return Err(scope.fail(ErrorKind::UnsupportedFormat {
                    format: other.to_string(),
                }))
            }
        },
        _ => return Ok(None),
    };
    Ok(Some(primitive))
}

/// Resolve the declared type of a schema and extract its validation.
pub(crate) fn resolve_type(schema: &Schema, scope: &Scope) -> Result<(ResolvedType, Validation), CompileError> {
    if schema.types.len() > 1 {
        return Err(scope.fail(ErrorKind::UnionType(schema.types.join(", "))));
    }

    let Some(schema_type) = schema.types.first() else {
        // Without a type, the schema must be a reference.
        let reference = schema
            .reference
            .as_deref()
            .ok_or_else(|| scope.fail(ErrorKind::MissingType))?;
        let name = resolve_definition_ref(reference, &scope.with("reference", reference))?;
        return Ok((ResolvedType::Reference(name), Validation::None));
    };

    let scope = scope.with("schema_type", schema_type);

    if let Some(primitive) = primitive_for(schema_type, schema.format.as_deref(), &scope)? {
        let validation = schema_validation(SchemaKind::Primitive(primitive), schema, &scope)?;
        return Ok((ResolvedType::Primitive(primitive), validation));
    }

    match schema_type.as_str() {
        "object" => {
            let validation = schema_validation(SchemaKind::Object, schema, &scope)?;
            Ok((ResolvedType::Object, validation))
        }
        "array" => {
            let items = match &schema.items {
                None => return Err(scope.fail(ErrorKind::ArrayWithoutItems)),
                Some(SchemaItems::Tuple(_)) => return Err(scope.fail(ErrorKind::TupleArray)),
                Some(SchemaItems::Single(items)) => items,
            };
            let (item, item_validation) = resolve_type(items, &scope.with("in", "items"))?;
            let item = match item {
                ResolvedType::Array { .. } => return Err(scope.fail(ErrorKind::NestedArray)),
                ResolvedType::Object => return Err(scope.fail(ErrorKind::NestedObject)),
                other => other.as_type_ref(),
            };
            let Some(item) = item else {
                return Err(scope.fail(ErrorKind::ArrayWithoutItems));
            };
            let validation = schema_validation(SchemaKind::Array(&item), schema, &scope)?;
            Ok((ResolvedType::Array { item, item_validation }, validation))
        }
        other => Err(scope.fail(ErrorKind::UnknownSchemaType(other.to_string()))),
    }
}

fn compile_props(
    definition: &Schema,
    validation: &Validation,
    scope: &Scope,
) -> Result<Vec<PropertyDescriptor>, CompileError> {
    let required: BTreeSet<&str> = validation
        .as_object()
        .map(|o| o.required.iter().map(String::as_str).collect())
        .unwrap_or_default();

    let mut props = Vec::with_capacity(definition.properties.len());
    for (prop_name, property) in &definition.properties {
        let scope = scope.with("property", prop_name);
        debug!(property = %prop_name, "Compiling property");

        let (resolved, validation) = resolve_type(property, &scope)?;
        let is_required = required.contains(prop_name.as_str());
        if !is_required && validation.has_validation() {
            return Err(scope.fail(ErrorKind::ValidationRequiresRequired));
        }

        let ty = match resolved {
            ResolvedType::Object => return Err(scope.fail(ErrorKind::NestedObject)),
            ResolvedType::Array { item, item_validation } => PropertyType::Slice { item, item_validation },
            ResolvedType::Reference(name) => PropertyType::Scalar(TypeRef::Named(name)),
            ResolvedType::Primitive(p) => PropertyType::Scalar(TypeRef::Primitive(p)),
        };

        props.push(PropertyDescriptor {
            name: format_name(prop_name),
            wire_name: prop_name.clone(),
            description: property.description.clone().unwrap_or_default(),
            validation,
            required: is_required,
            read_only: property.read_only,
            ty,
        });
    }

    props.sort_by(|a, b| a.name.cmp(&b.name));
    if let Some(dup) = props.windows(2).find(|w| w[0].name == w[1].name) {
        return Err(scope
            .with("property", &dup[1].wire_name)
            .fail(ErrorKind::DuplicateProperty));
    }
    Ok(props)
}

fn check_error_type(t: &TypeDescriptor, scope: &Scope) -> Result<(), CompileError> {
    if t.has_read_only_props {
        return Err(scope.fail(ErrorKind::ErrorTypeWithReadOnly));
    }
    let validated = match &t.kind {
        TypeKind::Struct { props } => props.iter().any(|p| {
            p.validation.has_validation()
                || matches!(&p.ty, PropertyType::Slice { item_validation, .. } if item_validation.has_validation())
        }),
        TypeKind::Slice { item_validation, .. } => {
            t.validation.has_validation() || item_validation.has_validation()
        }
        TypeKind::Alias { .. } => t.validation.has_validation(),
    };
    if validated {
        return Err(scope.fail(ErrorKind::ErrorTypeWithValidation));
    }
    Ok(())
}

fn compile_definition(raw_name: &str, definition: &Schema, scope: &Scope) -> Result<TypeDescriptor, CompileError> {
    let (resolved, validation) = resolve_type(definition, scope)?;

    let kind = match resolved {
        ResolvedType::Object => TypeKind::Struct {
            props: compile_props(definition, &validation, scope)?,
        },
        ResolvedType::Array { item, item_validation } => TypeKind::Slice { item, item_validation },
        ResolvedType::Primitive(p) => TypeKind::Alias {
            target: TypeRef::Primitive(p),
            link: None,
        },
        ResolvedType::Reference(name) => TypeKind::Alias {
            target: TypeRef::Named(name),
            link: None,
        },
    };

    let has_read_only_props = match &kind {
        TypeKind::Struct { props } => props.iter().any(|p| p.read_only),
        _ => false,
    };

    let t = TypeDescriptor {
        name: format_name(raw_name),
        description: definition.description.clone().unwrap_or_default(),
        validation,
        is_error: definition.is_error,
        has_read_only_props,
        kind,
    };

    if t.is_error {
        check_error_type(&t, scope)?;
    }
    Ok(t)
}

/// Compile every definition into a sorted Model IR.
///
/// The result does not depend on the iteration order of `definitions`.
///
/// # Errors
///
/// Returns the first unsupported construct found.
pub fn compile_model(definitions: &IndexMap<String, Schema>, scope: &Scope) -> Result<ModelIr, CompileError> {
    let mut names: Vec<&String> = definitions.keys().collect();
    names.sort();

    let mut types = Vec::with_capacity(definitions.len());
    for raw_name in names {
        let Some(definition) = definitions.get(raw_name) else {
            continue;
        };
        let scope = scope.with("definition", raw_name);
        info!(definition = %raw_name, "Compiling definition");
        types.push(compile_definition(raw_name, definition, &scope)?);
    }

    types.sort_by(|a, b| a.name.cmp(&b.name));

    let mut index = BTreeMap::new();
    for (i, t) in types.iter().enumerate() {
        if index.insert(t.name.clone(), TypeId(i)).is_some() {
            return Err(scope.with("type", &t.name).fail(ErrorKind::DuplicateTypeName));
        }
    }

    link_references(&mut types, &index, scope)?;
    let read_only_types = check_read_only_types(&mut types, scope)?;
    let patterns = collect_patterns(&types, scope)?;
    let needs_time = types.iter().any(uses_timestamp);

    info!(
        types_count = types.len(),
        patterns_count = patterns.len(),
        read_only_count = read_only_types.len(),
        "Model compiled"
    );

    Ok(ModelIr {
        types,
        patterns,
        needs_time,
        index,
        read_only_types,
    })
}

/// Check every referenced name exists and attach alias links by index.
fn link_references(
    types: &mut [TypeDescriptor],
    index: &BTreeMap<String, TypeId>,
    scope: &Scope,
) -> Result<(), CompileError> {
    for t in types.iter_mut() {
        let scope = scope.with("type", &t.name);
        for dep in t.dependencies() {
            if !index.contains_key(dep) {
                return Err(scope.fail(ErrorKind::UnknownType(dep.to_string())));
            }
        }
        if let TypeKind::Alias {
            target: TypeRef::Named(name),
            link,
        } = &mut t.kind
        {
            *link = index.get(name.as_str()).copied();
        }
    }
    Ok(())
}

/// Enforce the read-only reference rules and promote top-level arrays.
///
/// Structs with read-only properties may only be referenced by top-level
/// arrays, which become read-only themselves. Those arrays may not be
/// referenced at all. Membership is tested against the initial set so the
/// outcome does not depend on type order.
fn check_read_only_types(types: &mut [TypeDescriptor], scope: &Scope) -> Result<BTreeSet<String>, CompileError> {
    let initial: BTreeSet<String> = types
        .iter()
        .filter(|t| t.has_read_only_props)
        .map(|t| t.name.clone())
        .collect();

    let mut promoted = BTreeSet::new();
    for t in types.iter_mut() {
        let scope = scope.with("type", &t.name);
        let deps: Vec<String> = t.dependencies().into_iter().map(str::to_string).collect();
        for dep in deps {
            if !initial.contains(&dep) {
                continue;
            }
            if t.is_slice() {
                t.has_read_only_props = true;
                promoted.insert(t.name.clone());
            } else {
                return Err(scope.with("reference", &dep).fail(ErrorKind::ReadOnlyReference(dep)));
            }
        }
    }

    for t in types.iter() {
        let scope = scope.with("type", &t.name);
        for dep in t.dependencies() {
            if promoted.contains(dep) {
                return Err(scope
                    .with("reference", dep)
                    .fail(ErrorKind::ReadOnlyArrayReference(dep.to_string())));
            }
        }
    }

    Ok(initial.into_iter().chain(promoted).collect())
}

/// Collect every pattern with the name its regex static is generated from.
///
/// Distinct sources may normalize to the same static name; that is only
/// accepted when they carry the same pattern.
fn collect_patterns(types: &[TypeDescriptor], scope: &Scope) -> Result<Vec<Pattern>, CompileError> {
    let mut found: Vec<(String, String, Scope)> = Vec::new();
    for t in types {
        let type_scope = scope.with("type", &t.name);
        match &t.kind {
            TypeKind::Struct { props } => {
                for p in props {
                    let item_validation = match &p.ty {
                        PropertyType::Slice { item_validation, .. } => Some(item_validation),
                        PropertyType::Scalar(_) => None,
                    };
                    let pattern = p
                        .validation
                        .pattern()
                        .or_else(|| item_validation.and_then(Validation::pattern));
                    if let Some(pattern) = pattern {
                        found.push((
                            format!("{}{}", t.name, p.name),
                            pattern.to_string(),
                            type_scope.with("property", &p.wire_name),
                        ));
                    }
                }
            }
            TypeKind::Slice { item_validation, .. } => {
                if let Some(pattern) = item_validation.pattern() {
                    found.push((t.name.clone(), pattern.to_string(), type_scope));
                }
            }
            TypeKind::Alias { .. } => {
                if let Some(pattern) = t.validation.pattern() {
                    found.push((t.name.clone(), pattern.to_string(), type_scope));
                }
            }
        }
    }

    let mut by_static: BTreeMap<String, Pattern> = BTreeMap::new();
    for (name, pattern, source) in found {
        let key = regex_static(&name);
        match by_static.get(&key) {
            Some(existing) if existing.pattern != pattern => {
                return Err(source.fail(ErrorKind::PatternNameCollision {
                    name: key,
                    other: existing.name.clone(),
                }));
            }
            Some(_) => {}
            None => {
                by_static.insert(key, Pattern { name, pattern });
            }
        }
    }
    Ok(by_static.into_values().collect())
}

fn uses_timestamp(t: &TypeDescriptor) -> bool {
    let ts = TypeRef::Primitive(Primitive::Timestamp);
    match &t.kind {
        TypeKind::Struct { props } => props.iter().any(|p| *p.ty.target() == ts),
        TypeKind::Slice { item, .. } => *item == ts,
        TypeKind::Alias { target, .. } => *target == ts,
    }
}
