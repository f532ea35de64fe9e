use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::error::{EstimatorError, Result};


#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    
    pub knowledge_base_path: PathBuf,
    pub index_path: PathBuf,

    
    pub llm_provider: String,
    pub llm_model: String,
    pub llm_api_key: Option<String>,
    pub llm_base_url: Option<String>,
    pub llm_temperature: f64,
    pub llm_timeout_secs: u64,

    
    pub llm_fallback_enabled: bool,
    pub llm_fallback_url: String,
    pub llm_fallback_model: String,

    
    pub retrieval_top_k: usize,
    pub min_similarity: f64,
    pub max_parse_retries: u32,

    
    pub search_cache_enabled: bool,
    pub search_cache_capacity: usize,
    pub search_cache_ttl_secs: u64,

    
    pub trade_rules_enabled: bool,
}

impl EstimatorConfig {
    
    pub fn new(knowledge_base_path: impl Into<PathBuf>) -> Self {
        let knowledge_base_path = knowledge_base_path.into();
        let index_path = knowledge_base_path.with_extension("index.json");
        Self {
            knowledge_base_path,
            index_path,

            llm_provider: "openai".to_string(),
            llm_model: "gpt-3.5-turbo".to_string(),
            llm_api_key: None,
            llm_base_url: None,
            llm_temperature: 0.1,
            llm_timeout_secs: 60,

            llm_fallback_enabled: false,
            llm_fallback_url: crate::DEFAULT_OLLAMA_URL.to_string(),
            llm_fallback_model: crate::DEFAULT_FALLBACK_MODEL.to_string(),

            retrieval_top_k: crate::DEFAULT_RETRIEVAL_TOP_K,
            min_similarity: 0.0,
            max_parse_retries: 1,

            search_cache_enabled: false,
            search_cache_capacity: crate::DEFAULT_CACHE_SIZE,
            search_cache_ttl_secs: crate::DEFAULT_CACHE_TTL,

            trade_rules_enabled: false,
        }
    }

    /// Layers defaults, an optional TOML/JSON/YAML file and `ESTIMATOR_*`
    /// environment variables, in that order.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = config::Config::try_from(&Self::default())
            .map_err(|e| EstimatorError::Config(e.to_string()))?;

        let mut builder = config::Config::builder().add_source(defaults);
        if let Some(path) = path {
            debug!("Loading configuration file {}", path.display());
            builder = builder.add_source(config::File::from(path));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("ESTIMATOR").try_parsing(true),
        );

        let config: Self = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| EstimatorError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    
    pub fn from_env() -> Self {
        match Self::load(None) {
            Ok(config) => config,
            Err(e) => {
                warn!("Ignoring environment configuration: {}", e);
                Self::default()
            }
        }
    }

    
    pub fn validate(&self) -> Result<()> {
        if let Some(base_url) = &self.llm_base_url {
            url::Url::parse(base_url)
                .map_err(|e| EstimatorError::Config(format!("llm_base_url '{base_url}': {e}")))?;
        }
        if self.llm_fallback_enabled {
            url::Url::parse(&self.llm_fallback_url).map_err(|e| {
                EstimatorError::Config(format!("llm_fallback_url '{}': {e}", self.llm_fallback_url))
            })?;
        }
        if self.retrieval_top_k == 0 {
            return Err(EstimatorError::Config("retrieval_top_k must be at least 1".to_string()));
        }
        if !(0.0..1.0).contains(&self.min_similarity) {
            return Err(EstimatorError::Config(format!(
                "min_similarity must be in [0, 1), got {}",
                self.min_similarity
            )));
        }
        if !(0.0..=2.0).contains(&self.llm_temperature) {
            return Err(EstimatorError::Config(format!(
                "llm_temperature must be in [0, 2], got {}",
                self.llm_temperature
            )));
        }
        if self.search_cache_enabled && self.search_cache_capacity == 0 {
            return Err(EstimatorError::Config("search_cache_capacity must be positive".to_string()));
        }
        Ok(())
    }

    
    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self::new("unified_knowledge_base.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_index_path_follows_knowledge_base() {
        let config = EstimatorConfig::new("data/kb.json");
        assert_eq!(config.index_path, PathBuf::from("data/kb.index.json"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_base_url() {
        let mut config = EstimatorConfig::default();
        config.llm_base_url = Some("not a url".to_string());
        assert!(matches!(config.validate(), Err(EstimatorError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_top_k() {
        let mut config = EstimatorConfig::default();
        config.retrieval_top_k = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_layers_file_over_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "llm_provider = \"ollama\"\nllm_model = \"llama3.2\"\nretrieval_top_k = 3"
        )
        .unwrap();

        let config = EstimatorConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.llm_provider, "ollama");
        assert_eq!(config.llm_model, "llama3.2");
        assert_eq!(config.retrieval_top_k, 3);
        assert_eq!(config.max_parse_retries, 1);
    }
}
