

pub mod analyzer;
pub mod models;
pub mod store;

pub use analyzer::{KnowledgeBaseAnalyzer, KnowledgeBaseSummary, ValueStats};
pub use models::{Component, FormatTag, KnowledgeBaseFile, KnowledgeBaseMetadata, PricedField};
pub use store::KnowledgeBaseStore;
