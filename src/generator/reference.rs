use super::error::{CompileError, ErrorKind};
use super::naming::format_name;
use super::scope::Scope;
use crate::spec::Parameter;
use indexmap::IndexMap;

/// Split a local reference into its fragment path segments.
///
/// Only `#/<section>/<name>` is accepted: no document part, exactly two
/// non-empty segments after the leading slash.
fn local_fragment<'a>(reference: &'a str, section: &str) -> Option<&'a str> {
    let (document, fragment) = reference.split_once('#')?;
    if !document.is_empty() {
        return None;
    }
    let parts: Vec<&str> = fragment.split('/').collect();
    match parts.as_slice() {
        ["", s, name] if *s == section && !name.is_empty() => Some(name),
        _ => None,
    }
}

/// Resolve `#/definitions/<name>` to the formatted type name.
///
/// # Errors
///
/// Returns [`ErrorKind::UnsupportedReference`] for external, absolute or deeper
/// references.
pub fn resolve_definition_ref(reference: &str, scope: &Scope) -> Result<String, CompileError> {
    match local_fragment(reference, "definitions") {
        Some(name) => Ok(format_name(name)),
        None => Err(scope.fail(ErrorKind::UnsupportedReference(reference.to_string()))),
    }
}

/// Resolve `#/parameters/<name>` against the document's shared parameters.
///
/// # Errors
///
/// Returns [`ErrorKind::UnsupportedReference`] for any other reference shape and
/// [`ErrorKind::UnknownParameter`] when no shared parameter has that name.
pub fn resolve_parameter_ref<'a>(
    reference: &str,
    parameters: &'a IndexMap<String, Parameter>,
    scope: &Scope,
) -> Result<&'a Parameter, CompileError> {
    let name = local_fragment(reference, "parameters")
        .ok_or_else(|| scope.fail(ErrorKind::UnsupportedReference(reference.to_string())))?;
    parameters
        .get(name)
        .ok_or_else(|| scope.fail(ErrorKind::UnknownParameter(reference.to_string())))
}
