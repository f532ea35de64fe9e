

pub mod engine;
pub mod models;
pub mod parser;
pub mod prompt;

pub use engine::RagComponentGenerator;
pub use models::{ContextEntry, ContextTier, GeneratedComponent, GenerationContext, GeneratorConfig};
pub use parser::{extract_json_object, parse_component};
