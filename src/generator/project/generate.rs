use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::generator::error::CompileError;
use crate::generator::ir::{ModelIr, RouterIr};
use crate::generator::model::compile_model;
use crate::generator::router::compile_router;
use crate::generator::scope::Scope;
use crate::generator::templates::render_artifacts;
use crate::spec::{load_spec, Swagger};

use super::config::{resolve_config, GeneratorConfig};
use super::format::format_files;

/// Options for a single generation run, usually taken from the CLI.
///
/// Every `Some` value overrides the configuration file.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub output_dir: Option<PathBuf>,
    pub config_path: Option<PathBuf>,
    pub model_package: Option<String>,
    pub no_format: bool,
    /// Compile and render, but write nothing
    pub dry_run: bool,
}

/// What a generation run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationReport {
    pub output_dir: PathBuf,
    /// Files written, or that would be written on a dry run
    pub files: Vec<PathBuf>,
    pub types_count: usize,
    pub routes_count: usize,
    pub formatted: bool,
}

/// Compile a parsed document into both IRs.
pub fn compile_document(document: &Swagger, config: &GeneratorConfig) -> Result<(ModelIr, RouterIr), CompileError> {
    let scope = Scope::new();
    let model = compile_model(&document.definitions, &scope)?;
    let router = compile_router(document, &model, &config.router_options(), &scope)?;
    Ok((model, router))
}

/// Load the configuration that applies to `spec_path`, with `options` applied on top.
pub fn effective_config(spec_path: &Path, options: &GenerateOptions) -> anyhow::Result<GeneratorConfig> {
    let mut config = resolve_config(options.config_path.as_deref(), spec_path)?;
    if let Some(model_package) = &options.model_package {
        config.model_package = model_package.clone();
    }
    if let Some(output_dir) = &options.output_dir {
        config.output_dir = output_dir.clone();
    }
    if options.no_format {
        config.format = false;
    }
    Ok(config)
}

/// Generate the model, validators and router for `spec_path`.
///
/// Nothing is written unless the whole document compiles.
pub fn generate_from_spec(spec_path: &Path, options: &GenerateOptions) -> anyhow::Result<GenerationReport> {
    let config = effective_config(spec_path, options)?;
    let loaded = load_spec(spec_path)?;

    let (model, router) = compile_document(&loaded.document, &config)
        .with_context(|| format!("Failed to compile spec: {}", spec_path.display()))?;

    let source_name = spec_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let artifacts = render_artifacts(&model, &router, &loaded.source, &source_name)?;

    let output_dir = config.output_dir_for(spec_path);
    let files: Vec<PathBuf> = artifacts.iter().map(|a| output_dir.join(a.name)).collect();

    let mut report = GenerationReport {
        output_dir: output_dir.clone(),
        files,
        types_count: model.types.len(),
        routes_count: router.routes.len(),
        formatted: false,
    };

    if options.dry_run {
        info!(output_dir = %output_dir.display(), files_count = report.files.len(), "Dry run, nothing written");
        return Ok(report);
    }

    fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create output directory: {}", output_dir.display()))?;
    for (artifact, path) in artifacts.iter().zip(&report.files) {
        fs::write(path, &artifact.content).with_context(|| format!("Failed to write {}", path.display()))?;
        info!(file = %path.display(), "Generated");
    }

    if config.format {
        format_files(&report.files)?;
        report.formatted = true;
    }

    Ok(report)
}
