use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use thiserror::Error;

use crate::llm::providers::base::LlmProviderError;


#[derive(Error, Debug)]
pub enum EstimatorError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Knowledge base error: {0}")]
    KnowledgeBase(String),

    #[error("Index build error: {0}")]
    IndexBuild(String),

    #[error("Stale index: {0}")]
    StaleIndex(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Generation parse error: {0}")]
    GenerationParse(String),

    #[error("Pricing overflow: {0}")]
    PricingOverflow(String),

    #[error("Generation timed out after {0:?}")]
    GenerationTimeout(Duration),

    #[error("LLM provider error: {0}")]
    LlmProvider(#[from] LlmProviderError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}


pub type Result<T> = std::result::Result<T, EstimatorError>;


/// Pipeline stage a generation request was in when it failed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GenerationStage {
    Retrieval,
    Compose,
    Parse,
    Reconcile,
}


/// A failed generation request. Every request is independently retriable, so
/// the stage is kept to let callers decide whether relaxing the quality
/// setting is worth a second attempt.
#[derive(Error, Debug)]
#[error("Generation failed during {stage}: {source}")]
pub struct GenerationFailure {
    pub stage: GenerationStage,
    #[source]
    pub source: EstimatorError,
}

impl GenerationFailure {
    pub fn new(stage: GenerationStage, source: impl Into<EstimatorError>) -> Self {
        Self {
            stage,
            source: source.into(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self.source, EstimatorError::GenerationTimeout(_))
    }

    pub fn is_parse_error(&self) -> bool {
        matches!(self.source, EstimatorError::GenerationParse(_))
    }

    pub fn is_overflow(&self) -> bool {
        matches!(self.source, EstimatorError::PricingOverflow(_))
    }
}
