//! # Generator Module
//!
//! The generator turns a Swagger 2.0 document into Rust source for a typed
//! model, its validators and an axum router over a hand-written `Handler`
//! trait.
//!
//! ## Architecture
//!
//! ```text
//! Swagger document → Type Compiler → Route Compiler → Template Rendering → Files
//!                     (Model IR)      (Router IR)        (askama)
//! ```
//!
//! 1. **Type Compiler** ([`compile_model`]) - turns `definitions` into structs,
//!    slices and aliases, derives validation rules and splits read-only types
//! 2. **Route Compiler** ([`compile_router`]) - turns `paths` into routes with
//!    typed parameters, results and declared error types
//! 3. **Template Rendering** ([`render_artifacts`]) - renders both IRs with the
//!    templates in `templates/`
//! 4. **Project writer** ([`generate_from_spec`]) - writes the files and
//!    optionally runs `rustfmt` on them
//!
//! Every unsupported construct is rejected with a [`CompileError`] that names
//! the problem and carries the location it was found at (definition, property,
//! path, method, ...). Nothing is written when compilation fails.
//!
//! ## Generated Structure
//!
//! ```text
//! generated/
//! ├── mod.rs            # Module declarations
//! ├── swagger.rs        # The input document as a string constant
//! ├── model.rs          # One type per definition, plus ReadOnly variants
//! ├── validate.rs       # The Validate trait and its impls
//! ├── errors.rs         # Display/Error impls for x-error types
//! ├── route_errors.rs   # One error enum per operation
//! └── router.rs         # Handler trait, ErrorTransformer trait, new_server
//! ```
//!
//! ## Programmatic Usage
//!
//! ```rust,ignore
//! use swaggergen::generator::{compile_model, compile_router, render_artifacts, RouterOptions, Scope};
//! use swaggergen::spec::load_spec;
//!
//! # fn main() -> anyhow::Result<()> {
//! let loaded = load_spec("api.yaml".as_ref())?;
//! let scope = Scope::new();
//! let model = compile_model(&loaded.document.definitions, &scope)?;
//! let router = compile_router(&loaded.document, &model, &RouterOptions::default(), &scope)?;
//! for artifact in render_artifacts(&model, &router, &loaded.source, "api.yaml")? {
//!     println!("{}", artifact.name);
//! }
//! # Ok(())
//! # }
//! ```

mod error;
pub mod ir;
mod model;
mod naming;
mod project;
mod reference;
mod router;
mod scope;
mod templates;
mod validation;
#[cfg(test)]
mod tests;

pub use error::{CompileError, ErrorKind};
pub use model::compile_model;
pub use naming::{format_name, lower_start, regex_static, rust_ident, to_snake_case, upper_start};
pub use project::{
    compile_document, effective_config, format_files, generate_from_spec, load_config,
    resolve_config, GenerateOptions, GenerationReport, GeneratorConfig, CONFIG_FILE_NAME,
};
pub use reference::{resolve_definition_ref, resolve_parameter_ref};
pub use router::{compile_router, format_route, group_errors, RouterOptions};
pub use scope::Scope;
pub use templates::{render_artifacts, Artifact};
pub use validation::{parameter_validation, schema_validation, ParameterKind, SchemaKind};
