//! Intermediate representation handed from the compilers to the templates.
//!
//! Everything a template needs to decide is encoded here. Templates never look
//! back at the Swagger document.

use http::Method;
use std::collections::{BTreeMap, BTreeSet};

/// Scalar types the generated model can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Primitive {
    Bool,
    Int64,
    Float64,
    String,
    /// A `string` with format `date-time`
    Timestamp,
}

impl Primitive {
    /// Rust type used for this primitive in generated code.
    ///
    /// Timestamps assume `chrono::{DateTime, Utc}` is in scope.
    pub fn rust_type(self) -> &'static str {
        match self {
            Primitive::Bool => "bool",
            Primitive::Int64 => "i64",
            Primitive::Float64 => "f64",
            Primitive::String => "String",
            Primitive::Timestamp => "DateTime<Utc>",
        }
    }
}

impl std::fmt::Display for Primitive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Primitive::Bool => "bool",
            Primitive::Int64 => "int64",
            Primitive::Float64 => "float64",
            Primitive::String => "string",
            Primitive::Timestamp => "timestamp",
        };
        write!(f, "{s}")
    }
}

/// A type position: either a primitive or the name of a model type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeRef {
    Primitive(Primitive),
    Named(String),
}

impl TypeRef {
    pub fn named(&self) -> Option<&str> {
        match self {
            TypeRef::Named(name) => Some(name),
            TypeRef::Primitive(_) => None,
        }
    }
}

impl std::fmt::Display for TypeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeRef::Primitive(p) => write!(f, "{p}"),
            TypeRef::Named(name) => write!(f, "{name}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation descriptors
// ---------------------------------------------------------------------------

/// The validation rules extracted for one value.
///
/// At most one kind of rule is ever present, chosen by the value's type.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Validation {
    #[default]
    None,
    Object(ObjectValidation),
    Array(ArrayValidation),
    Int(IntValidation),
    Number(NumberValidation),
    String(StringValidation),
}

impl Validation {
    pub fn has_validation(&self) -> bool {
        !matches!(self, Validation::None)
    }

    pub fn as_object(&self) -> Option<&ObjectValidation> {
        match self {
            Validation::Object(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayValidation> {
        match self {
            Validation::Array(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&StringValidation> {
        match self {
            Validation::String(v) => Some(v),
            _ => None,
        }
    }

    /// The regular expression constraint, if any.
    pub fn pattern(&self) -> Option<&str> {
        self.as_string().and_then(|s| s.pattern.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectValidation {
    pub required: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArrayValidation {
    pub min_items: Option<u64>,
    pub max_items: Option<u64>,
    pub unique_items: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntValidation {
    pub enum_values: Vec<i64>,
    pub maximum: Option<i64>,
    pub exclusive_maximum: bool,
    pub minimum: Option<i64>,
    pub exclusive_minimum: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NumberValidation {
    pub enum_values: Vec<f64>,
    pub maximum: Option<f64>,
    pub exclusive_maximum: bool,
    pub minimum: Option<f64>,
    pub exclusive_minimum: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringValidation {
    pub enum_values: Vec<String>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub pattern: Option<String>,
}

// ---------------------------------------------------------------------------
// Model IR
// ---------------------------------------------------------------------------

/// Stable index of a type in [`ModelIr::types`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub(crate) usize);

/// One compiled definition.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    /// Formatted name, e.g. `WidgetID`
    pub name: String,
    pub description: String,
    pub validation: Validation,
    pub is_error: bool,
    /// Set for structs with read-only properties, and for top-level arrays of them
    pub has_read_only_props: bool,
    pub kind: TypeKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    Struct {
        props: Vec<PropertyDescriptor>,
    },
    Slice {
        item: TypeRef,
        item_validation: Validation,
    },
    Alias {
        target: TypeRef,
        /// The referenced type, when `target` names one
        link: Option<TypeId>,
    },
}

impl TypeDescriptor {
    pub fn is_struct(&self) -> bool {
        matches!(self.kind, TypeKind::Struct { .. })
    }

    pub fn is_slice(&self) -> bool {
        matches!(self.kind, TypeKind::Slice { .. })
    }

    pub fn props(&self) -> &[PropertyDescriptor] {
        match &self.kind {
            TypeKind::Struct { props } => props,
            _ => &[],
        }
    }

    /// Names of the model types this type refers to directly.
    pub fn dependencies(&self) -> Vec<&str> {
        match &self.kind {
            TypeKind::Struct { props } => props.iter().filter_map(|p| p.ty.target().named()).collect(),
            TypeKind::Slice { item, .. } => item.named().into_iter().collect(),
            TypeKind::Alias { target, .. } => target.named().into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDescriptor {
    /// Formatted name
    pub name: String,
    /// Key used on the wire
    pub wire_name: String,
    pub description: String,
    pub validation: Validation,
    pub required: bool,
    pub read_only: bool,
    pub ty: PropertyType,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyType {
    Scalar(TypeRef),
    Slice {
        item: TypeRef,
        item_validation: Validation,
    },
}

impl PropertyType {
    /// The scalar type, or the item type of a slice.
    pub fn target(&self) -> &TypeRef {
        match self {
            PropertyType::Scalar(t) => t,
            PropertyType::Slice { item, .. } => item,
        }
    }
}

/// A regular expression used by a string validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    /// `<TypeName><PropName>`, or the type name for top-level types
    pub name: String,
    pub pattern: String,
}

/// The compiled set of definitions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelIr {
    /// Sorted by name
    pub types: Vec<TypeDescriptor>,
    /// Sorted by name, one entry per name
    pub patterns: Vec<Pattern>,
    /// Whether any type holds a timestamp
    pub needs_time: bool,
    pub(crate) index: BTreeMap<String, TypeId>,
    pub(crate) read_only_types: BTreeSet<String>,
}

impl ModelIr {
    pub fn get(&self, id: TypeId) -> Option<&TypeDescriptor> {
        self.types.get(id.0)
    }

    pub fn id_of(&self, name: &str) -> Option<TypeId> {
        self.index.get(name).copied()
    }

    pub fn find(&self, name: &str) -> Option<&TypeDescriptor> {
        self.id_of(name).and_then(|id| self.get(id))
    }

    /// Names of structs with read-only properties and of the arrays wrapping them.
    pub fn read_only_types(&self) -> &BTreeSet<String> {
        &self.read_only_types
    }

    pub fn is_read_only(&self, name: &str) -> bool {
        self.read_only_types.contains(name)
    }

    pub fn is_error_type(&self, name: &str) -> bool {
        self.find(name).map(|t| t.is_error).unwrap_or(false)
    }

    /// Follow alias links until a non-alias type is reached.
    pub fn resolve_alias<'a>(&'a self, t: &'a TypeDescriptor) -> &'a TypeDescriptor {
        let mut current = t;
        // Chains are bounded by the number of types; a cycle stops at the start.
        for _ in 0..self.types.len() {
            match &current.kind {
                TypeKind::Alias { link: Some(id), .. } => match self.get(*id) {
                    Some(next) if next.name != t.name => current = next,
                    _ => break,
                },
                _ => break,
            }
        }
        current
    }
}

// ---------------------------------------------------------------------------
// Router IR
// ---------------------------------------------------------------------------

/// Non-body parameter locations, in the order parameters are sorted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParameterLocation {
    Path,
    Header,
    Query,
}

impl std::fmt::Display for ParameterLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParameterLocation::Path => write!(f, "path"),
            ParameterLocation::Header => write!(f, "header"),
            ParameterLocation::Query => write!(f, "query"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamDescriptor {
    /// Formatted name, e.g. `ID`
    pub name: String,
    /// Name on the wire
    pub raw_name: String,
    /// Handler argument name, unique within the route, e.g. `path_id`
    pub arg_name: String,
    pub location: ParameterLocation,
    /// `String` or `Timestamp`; for arrays, the item type
    pub primitive: Primitive,
    pub is_array: bool,
    pub required: bool,
    pub validation: Validation,
    pub item_validation: Validation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyDescriptor {
    /// e.g. `bodyWidget`
    pub name: String,
    /// e.g. `body_widget`
    pub arg_name: String,
    pub type_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultDescriptor {
    pub type_name: String,
    pub is_array: bool,
    pub read_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultError {
    pub type_name: String,
    pub status: u16,
}

/// One compiled operation.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteDescriptor {
    pub method: Method,
    /// Path as declared, e.g. `/widgets/{id}`
    pub path: String,
    /// Path with positional parameters, e.g. `/widgets/:id`
    pub route: String,
    /// Formatted operation id, e.g. `GetWidget`
    pub handler_name: String,
    /// Unexported variant, e.g. `getWidget`
    pub name: String,
    /// Rust function name, e.g. `get_widget`
    pub fn_name: String,
    pub summary: String,
    pub tag: String,
    pub body: Option<BodyDescriptor>,
    /// Sorted by location (path, header, query), then name
    pub params: Vec<ParamDescriptor>,
    pub result: Option<ResultDescriptor>,
    /// Declared non-2xx responses with a schema, sorted by status
    pub result_errors: Vec<ResultError>,
    /// Type declared for 400, used for request validation failures
    pub validation_error: Option<String>,
    /// Type declared for 500, used for unexpected failures
    pub catch_all_error: Option<String>,
    /// Whether the request needs validation before the handler is called
    pub has_validation: bool,
    /// First route of its tag group
    pub new_block: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorRoute {
    pub handler_name: String,
    pub status: u16,
}

/// An error type and every route that can answer with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorTypeGroup {
    pub type_name: String,
    /// Sorted by handler name
    pub routes: Vec<ErrorRoute>,
}

/// The compiled set of paths.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouterIr {
    /// Sorted by tag, route, then method
    pub routes: Vec<RouteDescriptor>,
    pub model_package: String,
    pub bad_request_errors: Vec<String>,
    pub internal_server_errors: Vec<String>,
    pub all_errors: Vec<ErrorTypeGroup>,
    /// Whether any parameter is a timestamp
    pub needs_time: bool,
}

/// Name used for the generic error payload when a route declares no type.
pub const STRING_ERROR: &str = "string";
