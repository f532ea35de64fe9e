

pub mod core;
pub mod evaluation;
pub mod generator;
pub mod index;
pub mod knowledge_base;
pub mod llm;
pub mod pricing;
pub mod quality;
pub mod search;
pub mod utils;

pub use utils::{format_amount, safe_truncate, safe_truncate_ellipsis};


pub use crate::core::config::EstimatorConfig;
pub use crate::core::error::{EstimatorError, GenerationFailure, GenerationStage, Result};
pub use generator::{ContextTier, GeneratedComponent, GeneratorConfig, RagComponentGenerator};
pub use index::LexicalIndex;
pub use knowledge_base::{Component, FormatTag, KnowledgeBaseStore, PricedField};
pub use llm::{LlmProvider, LlmProviderFactory};
pub use pricing::{reconcile, PricingWarning, ReconciledComponent};
pub use quality::{classify, QualityTier};
pub use search::{ComponentSearch, ExcludingSearch, SearchHit, SearchQuery, SemanticSearchEngine};


pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";


pub const DEFAULT_FALLBACK_MODEL: &str = "llama3.2";


pub const DEFAULT_RETRIEVAL_TOP_K: usize = 5;


pub const DEFAULT_CACHE_SIZE: usize = 1000;


pub const DEFAULT_CACHE_TTL: u64 = 300;
