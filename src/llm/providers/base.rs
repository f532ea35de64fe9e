

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;


#[derive(Error, Debug)]
pub enum LlmProviderError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Empty completion from {0}")]
    EmptyCompletion(String),
}


/// Provenance of a completion, attached to every generated component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct LlmMetadata {
    pub provider: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_prompt: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_completion: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_total: Option<u32>,
    #[serde(default)]
    pub fallback_used: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_error: Option<String>,
}


/// Text-in, text-out language model capability.
///
/// The estimator never depends on a concrete vendor. Tests inject scripted
/// implementations of this trait.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// `response_format` of `Some("json_object")` asks the backend for a JSON
    /// reply when it supports it. The reply is still validated by the caller.
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        response_format: Option<&str>,
    ) -> Result<(String, LlmMetadata), LlmProviderError>;

    
    fn provider_name(&self) -> &str;

    
    fn model_name(&self) -> &str;
}


#[async_trait]
impl<T: LlmProvider + ?Sized> LlmProvider for Arc<T> {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        response_format: Option<&str>,
    ) -> Result<(String, LlmMetadata), LlmProviderError> {
        (**self).generate(system_prompt, user_prompt, response_format).await
    }

    fn provider_name(&self) -> &str {
        (**self).provider_name()
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Constant;

    #[async_trait]
    impl LlmProvider for Constant {
        async fn generate(
            &self,
            _system_prompt: &str,
            user_prompt: &str,
            _response_format: Option<&str>,
        ) -> Result<(String, LlmMetadata), LlmProviderError> {
            Ok((user_prompt.to_uppercase(), LlmMetadata::default()))
        }

        fn provider_name(&self) -> &str {
            "constant"
        }

        fn model_name(&self) -> &str {
            "c1"
        }
    }

    #[test]
    fn test_shared_provider_delegates() {
        let shared: Arc<dyn LlmProvider> = Arc::new(Constant);
        let (reply, _) = tokio_test::block_on(shared.generate("s", "tilbud", None)).unwrap();
        assert_eq!(reply, "TILBUD");
        assert_eq!(shared.provider_name(), "constant");
        assert_eq!(shared.model_name(), "c1");
    }

    #[test]
    fn test_metadata_skips_empty_usage() {
        let metadata = LlmMetadata {
            provider: "ollama".to_string(),
            model: "llama3.2".to_string(),
            ..Default::default()
        };
        let json = serde_json::to_value(&metadata).unwrap();
        assert!(json.get("tokens_total").is_none());
        assert_eq!(json["fallback_used"], false);
    }
}
