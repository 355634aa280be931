mod config;
mod format;
mod generate;

pub use config::{load_config, resolve_config, GeneratorConfig, CONFIG_FILE_NAME};
pub use format::format_files;
pub use generate::{compile_document, effective_config, generate_from_spec, GenerateOptions, GenerationReport};
