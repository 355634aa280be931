//! Swagger 2.0 document model.
//!
//! Only the parts of the document the generator looks at are modelled, but every
//! JSON-Schema keyword that Swagger 2.0 allows on a schema is kept so the
//! compiler can tell the user exactly which keywords it does not support.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// A parsed Swagger 2.0 document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Swagger {
    pub swagger: String,
    #[serde(default)]
    pub info: Info,
    pub host: Option<String>,
    pub base_path: Option<String>,
    #[serde(default)]
    pub consumes: Vec<String>,
    #[serde(default)]
    pub produces: Vec<String>,
    #[serde(default)]
    pub paths: IndexMap<String, PathItem>,
    #[serde(default)]
    pub definitions: IndexMap<String, Schema>,
    /// Shared parameter declarations, referenced as `#/parameters/<name>`
    #[serde(default)]
    pub parameters: IndexMap<String, Parameter>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Info {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub version: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Tag {
    pub name: String,
    pub description: Option<String>,
}

/// Operations available on a single path.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathItem {
    #[serde(rename = "$ref")]
    pub reference: Option<String>,
    pub get: Option<Operation>,
    pub put: Option<Operation>,
    pub post: Option<Operation>,
    pub delete: Option<Operation>,
    pub options: Option<Operation>,
    pub head: Option<Operation>,
    pub patch: Option<Operation>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    #[serde(default)]
    pub tags: Vec<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub operation_id: Option<String>,
    pub consumes: Option<Vec<String>>,
    pub produces: Option<Vec<String>>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub responses: IndexMap<String, Response>,
    #[serde(default)]
    pub deprecated: bool,
}

/// Where a parameter is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParameterIn {
    Path,
    Query,
    Header,
    Body,
    FormData,
}

impl std::fmt::Display for ParameterIn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ParameterIn::Path => "path",
            ParameterIn::Query => "query",
            ParameterIn::Header => "header",
            ParameterIn::Body => "body",
            ParameterIn::FormData => "formData",
        };
        write!(f, "{s}")
    }
}

/// A parameter declaration, or a `$ref` to one.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    #[serde(rename = "$ref")]
    pub reference: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "in")]
    pub location: Option<ParameterIn>,
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
    /// Only set for body parameters
    pub schema: Option<Schema>,
    #[serde(rename = "type")]
    pub param_type: Option<String>,
    pub format: Option<String>,
    pub allow_empty_value: Option<bool>,
    pub items: Option<ParameterItems>,
    pub collection_format: Option<String>,
    #[serde(flatten)]
    pub validations: CommonValidations,
}

/// The `items` object of a non-body array parameter.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterItems {
    #[serde(rename = "type")]
    pub item_type: Option<String>,
    pub format: Option<String>,
    pub items: Option<Box<ParameterItems>>,
    pub collection_format: Option<String>,
    #[serde(flatten)]
    pub validations: CommonValidations,
}

/// Validation keywords shared by non-body parameters and their items.
///
/// `default` is not a validation keyword in the Swagger document, but it is
/// checked against the same allow-lists, so it lives here too.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommonValidations {
    pub default: Option<Value>,
    pub maximum: Option<f64>,
    #[serde(default)]
    pub exclusive_maximum: bool,
    pub minimum: Option<f64>,
    #[serde(default)]
    pub exclusive_minimum: bool,
    pub max_length: Option<u64>,
    pub min_length: Option<u64>,
    pub pattern: Option<String>,
    pub max_items: Option<u64>,
    pub min_items: Option<u64>,
    #[serde(default)]
    pub unique_items: bool,
    #[serde(rename = "enum")]
    pub enum_values: Option<Vec<Value>>,
    pub multiple_of: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Response {
    #[serde(rename = "$ref")]
    pub reference: Option<String>,
    #[serde(default)]
    pub description: String,
    pub schema: Option<Schema>,
}

/// The `items` keyword of a schema: a single schema, or a tuple of schemas.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SchemaItems {
    Single(Box<Schema>),
    Tuple(Vec<Schema>),
}

/// A JSON-Schema node as used by Swagger 2.0 definitions, body parameters and
/// responses.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    #[serde(rename = "$ref")]
    pub reference: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "one_or_many")]
    pub types: Vec<String>,
    pub format: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub default: Option<Value>,
    pub multiple_of: Option<f64>,
    pub maximum: Option<f64>,
    #[serde(default)]
    pub exclusive_maximum: bool,
    pub minimum: Option<f64>,
    #[serde(default)]
    pub exclusive_minimum: bool,
    pub max_length: Option<u64>,
    pub min_length: Option<u64>,
    pub pattern: Option<String>,
    pub max_items: Option<u64>,
    pub min_items: Option<u64>,
    #[serde(default)]
    pub unique_items: bool,
    pub max_properties: Option<u64>,
    pub min_properties: Option<u64>,
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(rename = "enum")]
    pub enum_values: Option<Vec<Value>>,
    pub items: Option<SchemaItems>,
    #[serde(default)]
    pub all_of: Vec<Schema>,
    #[serde(default)]
    pub any_of: Vec<Schema>,
    #[serde(default)]
    pub one_of: Vec<Schema>,
    pub not: Option<Box<Schema>>,
    #[serde(default)]
    pub properties: IndexMap<String, Schema>,
    pub additional_properties: Option<Value>,
    pub additional_items: Option<Value>,
    #[serde(default)]
    pub pattern_properties: IndexMap<String, Schema>,
    #[serde(default)]
    pub definitions: IndexMap<String, Schema>,
    #[serde(default)]
    pub dependencies: IndexMap<String, Value>,
    pub discriminator: Option<String>,
    #[serde(default)]
    pub read_only: bool,
    pub xml: Option<Value>,
    pub external_docs: Option<Value>,
    pub example: Option<Value>,
    /// Marks a definition as the payload of a non-success response.
    #[serde(rename = "x-error", default)]
    pub is_error: bool,
    /// Any other key, including vendor extensions.
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl Schema {
    /// Single `items` schema, if the schema declares exactly one.
    pub fn single_items(&self) -> Option<&Schema> {
        match &self.items {
            Some(SchemaItems::Single(items)) => Some(items),
            _ => None,
        }
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
    })
}
