//! # swaggergen
//!
//! **swaggergen** compiles a [Swagger 2.0](https://swagger.io/specification/v2/)
//! document into Rust source: a serde data model, validators for it, and an
//! [axum](https://docs.rs/axum) router that binds request parameters to the
//! arguments of a hand-written `Handler` trait.
//!
//! ## Architecture
//!
//! - **[`spec`]** - Swagger 2.0 document model and YAML/JSON loader
//! - **[`generator`]** - Type and route compilers, templates and the file writer
//! - **[`cli`]** - The `swaggergen` command line
//!
//! ### Code Generation Flow
//!
//! ```text
//! api.yaml → spec::load_spec → generator::compile_model → generator::compile_router
//!          → generator::render_artifacts → generated/*.rs
//! ```
//!
//! The generator supports a small subset of JSON Schema. Anything
//! outside it (unions, `allOf`, nested anonymous objects, `additionalProperties`,
//! HEAD/OPTIONS/PATCH operations, non-JSON media types) is rejected with an
//! error naming the construct and where it was found.
//!
//! ## Quick Start
//!
//! ```bash
//! swaggergen generate --spec api.yaml --output src/api
//! ```
//!
//! Then implement the generated `router::Handler` and `router::ErrorTransformer`
//! traits and serve `router::new_server(handler, transformer)` with axum.

pub mod cli;
pub mod generator;
pub mod logging;
pub mod spec;

pub use generator::{generate_from_spec, CompileError, ErrorKind, GenerateOptions, GeneratorConfig};
pub use spec::{load_spec, parse_spec, LoadedSpec, Swagger};
