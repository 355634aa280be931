use crate::generator::ir::{ModelIr, RouterIr, TypeKind};
use crate::generator::{compile_document, effective_config, generate_from_spec, GenerateOptions};
use crate::logging::{init_logging, LogFormat};
use crate::spec::load_spec;
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

/// Command-line interface for swaggergen
///
/// Generates a typed model, validators and an axum router from a Swagger 2.0
/// document.
#[derive(Parser, Debug)]
#[command(name = "swaggergen", version)]
#[command(about = "Swagger 2.0 to Rust code generator", long_about = None)]
pub struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Log line format
    #[arg(long, global = true, value_enum, env = "SWAGGERGEN_LOG_FORMAT", default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate the model, validators and router from a spec
    Generate {
        /// Path to the Swagger 2.0 document (YAML or JSON)
        #[arg(short, long)]
        spec: PathBuf,

        /// Output directory (default: `generated` next to the spec)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Path to the generator config (default: swaggergen.toml next to the spec)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Rust path of the model module as seen from the router module
        #[arg(long)]
        model_package: Option<String>,

        /// Do not run rustfmt on the generated files
        #[arg(long, default_value_t = false)]
        no_format: bool,

        /// Compile and render, but write nothing
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
    /// Compile a spec and report whether it is supported
    Check {
        /// Path to the Swagger 2.0 document (YAML or JSON)
        #[arg(short, long)]
        spec: PathBuf,

        /// Path to the generator config (default: swaggergen.toml next to the spec)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Print the types and routes a spec compiles to
    Inspect {
        /// Path to the Swagger 2.0 document (YAML or JSON)
        #[arg(short, long)]
        spec: PathBuf,

        /// Path to the generator config (default: swaggergen.toml next to the spec)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

/// Run the parsed command line.
pub fn run_cli(cli: Cli) -> anyhow::Result<()> {
    init_logging(cli.verbose, cli.log_format)?;

    match cli.command {
        Commands::Generate {
            spec,
            output,
            config,
            model_package,
            no_format,
            dry_run,
        } => {
            let options = GenerateOptions {
                output_dir: output,
                config_path: config,
                model_package,
                no_format,
                dry_run,
            };
            let report = generate_from_spec(&spec, &options)?;
            let verb = if dry_run { "Would write" } else { "Wrote" };
            println!(
                "{verb} {} files to {} ({} types, {} routes)",
                report.files.len(),
                report.output_dir.display(),
                report.types_count,
                report.routes_count
            );
            if dry_run {
                for file in &report.files {
                    println!("  {}", file.display());
                }
            }
            Ok(())
        }
        Commands::Check { spec, config } => {
            let (model, router) = compile(&spec, config)?;
            println!(
                "{}: OK ({} types, {} routes, {} error types)",
                spec.display(),
                model.types.len(),
                router.routes.len(),
                router.all_errors.len()
            );
            Ok(())
        }
        Commands::Inspect { spec, config } => {
            let (model, router) = compile(&spec, config)?;
            print!("{}", describe(&model, &router));
            Ok(())
        }
    }
}

fn compile(spec: &Path, config_path: Option<PathBuf>) -> anyhow::Result<(ModelIr, RouterIr)> {
    let options = GenerateOptions {
        config_path,
        ..Default::default()
    };
    let config = effective_config(spec, &options)?;
    let loaded = load_spec(spec)?;
    let compiled = compile_document(&loaded.document, &config)
        .with_context(|| format!("Failed to compile spec: {}", spec.display()))?;
    Ok(compiled)
}

/// Human-readable listing of the compiled types and routes.
pub(crate) fn describe(model: &ModelIr, router: &RouterIr) -> String {
    let mut out = String::from("Types:\n");
    for t in &model.types {
        let kind = match &t.kind {
            TypeKind::Struct { props } => format!("struct, {} properties", props.len()),
            TypeKind::Slice { item, .. } => format!("slice of {item}"),
            TypeKind::Alias { target, .. } => format!("alias of {target}"),
        };
        let mut flags = Vec::new();
        if t.is_error {
            flags.push("error");
        }
        if model.is_read_only(&t.name) {
            flags.push("read-only");
        }
        let flags = if flags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", flags.join(", "))
        };
        out.push_str(&format!("  {} ({kind}){flags}\n", t.name));
    }

    out.push_str("Routes:\n");
    for r in &router.routes {
        out.push_str(&format!("  {:<6} {:<30} {} [{}]\n", r.method.as_str(), r.route, r.handler_name, r.tag));
        for e in &r.result_errors {
            out.push_str(&format!("           {} -> {}\n", e.status, e.type_name));
        }
    }
    out
}
