use super::scope::Scope;
use thiserror::Error;

/// A compilation failure together with the context it happened in.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}{scope}")]
pub struct CompileError {
    pub kind: ErrorKind,
    pub scope: Scope,
}

/// Every construct the compilers refuse.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ErrorKind {
    // --- schema shape ---
    #[error("union types are not supported: {0}")]
    UnionType(String),
    #[error("schema declares neither a type nor a reference")]
    MissingType,
    #[error("unsupported string format {format:?}")]
    UnsupportedFormat { format: String },
    #[error("unsupported schema type {0:?}")]
    UnknownSchemaType(String),
    #[error("nested objects are not supported, use a reference")]
    NestedObject,
    #[error("nested arrays are not supported")]
    NestedArray,
    #[error("array must declare a single items schema")]
    ArrayWithoutItems,
    #[error("tuple arrays are not supported")]
    TupleArray,

    // --- references ---
    #[error("unsupported reference {0:?}")]
    UnsupportedReference(String),
    #[error("unknown parameter reference {0:?}")]
    UnknownParameter(String),
    #[error("reference to unknown type {0:?}")]
    UnknownType(String),

    // --- validation keywords ---
    #[error("unsupported fields for {kind}: {}", fields.join(", "))]
    UnsupportedFields { kind: String, fields: Vec<String> },
    #[error("enum value {value} is not a valid {expected}")]
    InvalidEnumValue { value: String, expected: String },
    #[error("{keyword} must be an integer, got {value}")]
    NotAnInteger { keyword: String, value: String },
    #[error("invalid pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },
    #[error("uniqueItems requires primitive items, got {0:?}")]
    NonPrimitiveUniqueItems(String),
    #[error("properties with validation must be required")]
    ValidationRequiresRequired,

    // --- error types ---
    #[error("error types cannot have read-only properties")]
    ErrorTypeWithReadOnly,
    #[error("error types cannot have validation")]
    ErrorTypeWithValidation,

    // --- read-only propagation ---
    #[error("cannot reference type {0:?} with read-only properties")]
    ReadOnlyReference(String),
    #[error("cannot reference array {0:?} of types with read-only properties")]
    ReadOnlyArrayReference(String),

    // --- naming ---
    #[error("duplicate type name")]
    DuplicateTypeName,
    #[error("duplicate property name")]
    DuplicateProperty,
    #[error("regex {name} is already used by {other} for a different pattern")]
    PatternNameCollision { name: String, other: String },

    // --- paths and operations ---
    #[error("unsupported method {0}")]
    UnsupportedMethod(String),
    #[error("path item references are not supported")]
    PathItemReference,
    #[error("formData parameters are not supported")]
    FormDataParameter,
    #[error("parameter has no location")]
    MissingParameterLocation,
    #[error("unsupported parameter type {0:?}")]
    UnsupportedParameterType(String),
    #[error("unsupported collection format {0:?}, only csv is supported")]
    UnsupportedCollectionFormat(String),
    #[error("array parameters must have string items without format")]
    UnsupportedArrayItems,
    #[error("body parameter must be required")]
    OptionalBody,
    #[error("body parameter must declare a schema")]
    MissingBodySchema,
    #[error("{0} schema must be a reference")]
    InlineSchema(&'static str),
    #[error("operation has no operationId")]
    MissingOperationId,
    #[error("duplicate operationId {0:?}")]
    DuplicateOperationId(String),
    #[error("multiple tags are not supported: {}", .0.join(", "))]
    MultipleTags(Vec<String>),

    // --- responses ---
    #[error("default responses are not supported")]
    DefaultResponse,
    #[error("invalid status code {0:?}")]
    InvalidStatusCode(String),
    #[error("multiple success responses are not supported")]
    MultipleSuccessResponses,
    #[error("error type {type_name:?} is already used for another status than {status}")]
    DuplicateErrorType { type_name: String, status: u16 },
    #[error("type {type_name:?} used for status {status} is not an error type")]
    NotAnErrorType { type_name: String, status: u16 },
    #[error("response references are not supported: {0:?}")]
    ResponseReference(String),
    #[error("unsupported media type {0:?}, only application/json is supported")]
    UnsupportedMediaType(String),
}
