

use std::sync::Arc;
use std::time::Duration;

use super::providers::base::LlmProvider;
use super::providers::fallback::LlmProviderWithFallback;
use super::providers::ollama::OllamaProvider;
use super::providers::openai::OpenAiProvider;
use crate::core::config::EstimatorConfig;
use crate::core::error::{EstimatorError, Result};
use crate::DEFAULT_OLLAMA_URL;


pub struct LlmProviderFactory;

impl LlmProviderFactory {
    /// Supported names: `openai` (any OpenAI-compatible endpoint) and `ollama`.
    pub fn create(
        provider: &str,
        model: &str,
        api_key: Option<&str>,
        base_url: Option<&str>,
        temperature: f64,
        timeout: Duration,
    ) -> Result<Arc<dyn LlmProvider>> {
        let provider: Arc<dyn LlmProvider> = match provider {
            "openai" => Arc::new(OpenAiProvider::new(
                api_key.map(String::from),
                base_url.map(String::from),
                model,
                temperature,
                timeout,
            )?),
            "ollama" => Arc::new(OllamaProvider::new(
                base_url.unwrap_or(DEFAULT_OLLAMA_URL),
                model,
                temperature,
                timeout,
            )?),
            _ => {
                return Err(EstimatorError::Config(format!(
                    "Unknown provider: {provider}. Supported: openai, ollama"
                )));
            }
        };
        Ok(provider)
    }

    
    pub fn create_with_fallback(
        primary: Arc<dyn LlmProvider>,
        fallback_enabled: bool,
        fallback_url: Option<&str>,
        fallback_model: &str,
        fallback_temperature: f64,
        timeout: Duration,
    ) -> LlmProviderWithFallback {
        LlmProviderWithFallback::new(
            primary,
            fallback_enabled,
            fallback_url.map(String::from),
            Some(fallback_model.to_string()),
            fallback_temperature,
            timeout,
        )
    }

    /// Builds the configured provider, wrapped with the local fallback when
    /// enabled.
    pub fn from_config(config: &EstimatorConfig) -> Result<Arc<dyn LlmProvider>> {
        let primary = Self::create(
            &config.llm_provider,
            &config.llm_model,
            config.llm_api_key.as_deref(),
            config.llm_base_url.as_deref(),
            config.llm_temperature,
            config.llm_timeout(),
        )?;

        if !config.llm_fallback_enabled {
            return Ok(primary);
        }
        Ok(Arc::new(Self::create_with_fallback(
            primary,
            true,
            Some(&config.llm_fallback_url),
            &config.llm_fallback_model,
            config.llm_temperature,
            config.llm_timeout(),
        )))
    }
}
