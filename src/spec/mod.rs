//! Swagger 2.0 document model and loader.
mod load;
mod types;

pub use load::*;
pub use types::*;
