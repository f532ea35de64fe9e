use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use uuid::Uuid;

use crate::core::config::EstimatorConfig;
use crate::knowledge_base::Component;
use crate::llm::LlmMetadata;
use crate::pricing::{PricingWarning, RuleAdjustment, TradeRules};
use crate::quality::{quality_score, QualityTier};
use crate::search::SearchHit;


/// How well the retrieved context grounds a generated component.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ContextTier {
    /// Comparables drawn from complete records only.
    High,
    /// Comparables drawn from the whole corpus.
    Mixed,
    /// No comparables at all.
    None,
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextEntry {
    pub index: usize,
    pub similarity: f64,
    pub quality: QualityTier,
    pub quality_score: f64,
    pub component: Component,
}

impl From<SearchHit> for ContextEntry {
    fn from(hit: SearchHit) -> Self {
        Self {
            index: hit.index,
            similarity: hit.score,
            quality: crate::quality::classify(&hit.component),
            quality_score: quality_score(&hit.component),
            component: hit.component,
        }
    }
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationContext {
    pub tier: ContextTier,
    pub entries: Vec<ContextEntry>,
}

impl GenerationContext {
    pub fn empty() -> Self {
        Self {
            tier: ContextTier::None,
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    
    pub fn describe(&self) -> String {
        match self.tier {
            ContextTier::High => format!("high-quality ({} components)", self.len()),
            ContextTier::Mixed => {
                format!("full database ({} components, quality may vary)", self.len())
            }
            ContextTier::None => "no comparable components".to_string(),
        }
    }

    /// Quoted totals of the comparables, in retrieval order.
    pub fn totals(&self) -> Vec<f64> {
        self.entries.iter().map(|e| e.component.total_price).collect()
    }
}


/// A priced component produced by the generator, with its provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedComponent {
    pub generation_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub request: String,
    pub component: Component,
    /// Grounding of the context the model saw.
    pub quality_tier: ContextTier,
    pub context: GenerationContext,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<PricingWarning>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub adjustments: Vec<RuleAdjustment>,
    pub llm: LlmMetadata,
    /// Model round trips, including corrective re-prompts.
    pub attempts: u32,
}


#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub top_k: usize,
    pub min_similarity: f64,
    pub timeout: Duration,
    pub max_parse_retries: u32,
    pub trade_rules: Option<TradeRules>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            top_k: crate::DEFAULT_RETRIEVAL_TOP_K,
            min_similarity: 0.0,
            timeout: Duration::from_secs(60),
            max_parse_retries: 1,
            trade_rules: None,
        }
    }
}

impl From<&EstimatorConfig> for GeneratorConfig {
    fn from(config: &EstimatorConfig) -> Self {
        Self {
            top_k: config.retrieval_top_k,
            min_similarity: config.min_similarity,
            timeout: config.llm_timeout(),
            max_parse_retries: config.max_parse_retries,
            trade_rules: config.trade_rules_enabled.then(TradeRules::default),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_tier_labels() {
        assert_eq!(ContextTier::High.to_string(), "high");
        assert_eq!(serde_json::to_string(&ContextTier::None).unwrap(), "\"none\"");
        assert_eq!("mixed".parse::<ContextTier>().unwrap(), ContextTier::Mixed);
    }

    #[test]
    fn test_generator_config_from_estimator_config() {
        let mut config = EstimatorConfig::default();
        config.retrieval_top_k = 3;
        config.trade_rules_enabled = true;
        config.llm_timeout_secs = 7;

        let generator = GeneratorConfig::from(&config);
        assert_eq!(generator.top_k, 3);
        assert_eq!(generator.timeout, Duration::from_secs(7));
        assert!(generator.trade_rules.is_some());
    }
}
