use super::types::Swagger;
use anyhow::Context;
use std::path::Path;

/// A loaded document together with the text it was read from.
///
/// The raw text is kept so it can be inlined into the generated output.
#[derive(Debug, Clone)]
pub struct LoadedSpec {
    pub document: Swagger,
    pub source: String,
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext == "yaml" || ext == "yml")
        .unwrap_or(false)
}

/// Read and parse a Swagger 2.0 document from disk.
///
/// YAML is used for `.yaml`/`.yml` files, JSON for everything else.
///
/// # Errors
///
/// Returns an error if the file cannot be read, does not parse, or is not a
/// Swagger 2.0 document.
pub fn load_spec(path: &Path) -> anyhow::Result<LoadedSpec> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read spec: {}", path.display()))?;
    let document = parse_spec(&source, is_yaml(path))
        .with_context(|| format!("Failed to parse spec: {}", path.display()))?;
    Ok(LoadedSpec { document, source })
}

/// Parse a Swagger 2.0 document from text.
///
/// # Errors
///
/// Returns an error if the text does not parse or the `swagger` field is not
/// `"2.0"`.
pub fn parse_spec(content: &str, yaml: bool) -> anyhow::Result<Swagger> {
    let value: serde_json::Value = if yaml {
        serde_yaml::from_str(content)?
    } else {
        serde_json::from_str(content)?
    };

    match value.get("swagger").and_then(|v| v.as_str()) {
        Some("2.0") => {}
        Some(other) => anyhow::bail!("Unsupported swagger version {other:?}, expected \"2.0\""),
        None => anyhow::bail!("Missing `swagger: \"2.0\"` field; only Swagger 2.0 documents are supported"),
    }

    let spec: Swagger = serde_json::from_value(value)?;
    Ok(spec)
}
