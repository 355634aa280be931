//! Generator configuration
//!
//! Settings that do not belong in the Swagger document live in a TOML file,
//! `swaggergen.toml`, that sits alongside the spec.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::generator::router::RouterOptions;

/// Name of the config file looked up next to the spec
pub const CONFIG_FILE_NAME: &str = "swaggergen.toml";

/// Configuration loaded from `swaggergen.toml`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Rust path of the generated model module, as seen from the router module
    pub model_package: String,
    /// Output directory; relative paths are resolved against the spec's directory
    pub output_dir: PathBuf,
    /// Run `rustfmt` on the generated files
    pub format: bool,
    /// Tag given to operations that declare none
    pub default_tag: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        let router = RouterOptions::default();
        Self {
            model_package: router.model_package,
            output_dir: PathBuf::from("generated"),
            format: true,
            default_tag: router.default_tag,
        }
    }
}

impl GeneratorConfig {
    pub fn router_options(&self) -> RouterOptions {
        RouterOptions {
            model_package: self.model_package.clone(),
            default_tag: self.default_tag.clone(),
        }
    }

    /// Output directory for `spec_path`.
    pub fn output_dir_for(&self, spec_path: &Path) -> PathBuf {
        if self.output_dir.is_absolute() {
            return self.output_dir.clone();
        }
        match spec_path.parent() {
            Some(dir) => dir.join(&self.output_dir),
            None => self.output_dir.clone(),
        }
    }
}

/// Load the generator configuration from a TOML file
///
/// Returns `Ok(None)` if the file does not exist, and an error if it exists
/// but cannot be read or parsed.
pub fn load_config(config_path: &Path) -> anyhow::Result<Option<GeneratorConfig>> {
    if !config_path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read generator config: {}", config_path.display()))?;

    let config: GeneratorConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse generator config: {}", config_path.display()))?;

    Ok(Some(config))
}

/// Resolve the configuration for `spec_path`
///
/// Priority:
/// 1. Explicitly provided path, which must exist
/// 2. `swaggergen.toml` alongside the spec
/// 3. Defaults
pub fn resolve_config(explicit_path: Option<&Path>, spec_path: &Path) -> anyhow::Result<GeneratorConfig> {
    if let Some(path) = explicit_path {
        return load_config(path)?
            .with_context(|| format!("Generator config not found: {}", path.display()));
    }

    let detected = spec_path.parent().map(|dir| dir.join(CONFIG_FILE_NAME));
    match detected {
        Some(path) => {
            let config = load_config(&path)?;
            if config.is_some() {
                tracing::debug!(config = %path.display(), "Using generator config");
            }
            Ok(config.unwrap_or_default())
        }
        None => Ok(GeneratorConfig::default()),
    }
}
