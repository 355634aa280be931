//! # CLI Module
//!
//! Command-line interface for the `swaggergen` binary.
//!
//! ## Commands
//!
//! ### `generate`
//!
//! ```bash
//! swaggergen generate --spec api.yaml --output src/api
//! ```
//!
//! Options:
//! - `--spec <FILE>` - Path to the Swagger 2.0 document (required)
//! - `--output <DIR>` - Output directory (default: `generated` next to the spec)
//! - `--config <FILE>` - Generator config (default: `swaggergen.toml` next to the spec)
//! - `--model-package <PATH>` - Rust path of the model module seen from the router
//! - `--no-format` - Skip `rustfmt`
//! - `--dry-run` - List the files that would be written
//!
//! ### `check`
//!
//! Compile a spec without writing anything:
//!
//! ```bash
//! swaggergen check --spec api.yaml
//! ```
//!
//! ### `inspect`
//!
//! Print the types and routes a spec compiles to:
//!
//! ```bash
//! swaggergen inspect --spec api.yaml
//! ```
//!
//! Every command accepts `--verbose` and `--log-format text|json`.

mod commands;


pub use commands::{run_cli, Cli, Commands};
