use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::models::{ContextEntry, ContextTier, GeneratedComponent, GenerationContext, GeneratorConfig};
use super::parser::parse_component;
use super::prompt::{build_corrective_prompt, build_generation_prompt, SYSTEM_PROMPT};
use crate::core::error::{EstimatorError, GenerationFailure, GenerationStage, Result};
use crate::knowledge_base::Component;
use crate::llm::{LlmMetadata, LlmProvider};
use crate::pricing::PricingReconciler;
use crate::quality::QualityTier;
use crate::search::{ComponentSearch, SearchQuery};


const UNKNOWN_CATEGORY: &str = "Unknown";


/// Retrieval-augmented generation of priced components.
pub struct RagComponentGenerator {
    search: Arc<dyn ComponentSearch>,
    llm: Arc<dyn LlmProvider>,
    reconciler: PricingReconciler,
    config: GeneratorConfig,
}

impl RagComponentGenerator {
    
    pub fn new(
        search: Arc<dyn ComponentSearch>,
        llm: Arc<dyn LlmProvider>,
        config: GeneratorConfig,
    ) -> Self {
        info!(
            "RagComponentGenerator initialized: provider={}, model={}, top_k={}",
            llm.provider_name(),
            llm.model_name(),
            config.top_k
        );
        Self {
            search,
            llm,
            reconciler: PricingReconciler::default(),
            config,
        }
    }

    pub fn with_reconciler(mut self, reconciler: PricingReconciler) -> Self {
        self.reconciler = reconciler;
        self
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Prices a new component for `description`.
    ///
    /// With `use_high_quality_only` the context is first drawn from complete
    /// records and only widened to the whole corpus when that finds nothing.
    pub async fn generate(
        &self,
        description: &str,
        use_high_quality_only: bool,
    ) -> std::result::Result<GeneratedComponent, GenerationFailure> {
        debug!(
            "Generating component: '{}', high_quality_only={}",
            crate::safe_truncate(description, 50),
            use_high_quality_only
        );

        let context = self
            .retrieve(description, use_high_quality_only)
            .map_err(|e| GenerationFailure::new(GenerationStage::Retrieval, e))?;
        info!("Generation context: {}", context.describe());

        let default_category = context
            .entries
            .first()
            .map(|e| e.component.category.clone())
            .unwrap_or_else(|| UNKNOWN_CATEGORY.to_string());

        let prompt = build_generation_prompt(description, &context);
        let mut attempts = 0;
        let mut user_prompt = prompt.clone();

        let (parsed, llm) = loop {
            attempts += 1;
            let (reply, metadata) = self
                .complete(&user_prompt)
                .await
                .map_err(|e| GenerationFailure::new(GenerationStage::Compose, e))?;

            match parse_component(&reply, description, &default_category) {
                Ok(component) => break (component, metadata),
                Err(e) if attempts <= self.config.max_parse_retries => {
                    warn!("Unparseable model reply (attempt {}): {}", attempts, e);
                    user_prompt = build_corrective_prompt(&prompt, &reply, &e.to_string());
                }
                Err(e) => {
                    warn!("Giving up after {} attempts: {}", attempts, e);
                    return Err(GenerationFailure::new(GenerationStage::Parse, e));
                }
            }
        };

        let (component, warnings, adjustments) = self
            .finish(parsed, description, &context)
            .map_err(|e| GenerationFailure::new(GenerationStage::Reconcile, e))?;

        info!(
            "Generated '{}': tier={}, total={:.2}, warnings={}, attempts={}",
            crate::safe_truncate(&component.task_description, 50),
            context.tier,
            component.total_price,
            warnings.len(),
            attempts
        );

        Ok(GeneratedComponent {
            generation_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            request: description.to_string(),
            component,
            quality_tier: context.tier,
            context,
            warnings,
            adjustments,
            llm,
            attempts,
        })
    }

    
    pub fn retrieve(&self, description: &str, use_high_quality_only: bool) -> Result<GenerationContext> {
        let query = SearchQuery::new(description, self.config.top_k)
            .with_min_similarity(self.config.min_similarity);

        if use_high_quality_only {
            let hits = self
                .search
                .search(&query.clone().with_quality(QualityTier::Complete))?;
            if !hits.is_empty() {
                return Ok(GenerationContext {
                    tier: ContextTier::High,
                    entries: hits.into_iter().map(ContextEntry::from).collect(),
                });
            }
            debug!("No complete comparables, widening to the full corpus");
        }

        let hits = self.search.search(&query)?;
        if hits.is_empty() {
            debug!("No comparables at all for '{}'", crate::safe_truncate(description, 50));
            return Ok(GenerationContext::empty());
        }
        Ok(GenerationContext {
            tier: ContextTier::Mixed,
            entries: hits.into_iter().map(ContextEntry::from).collect(),
        })
    }

    
    async fn complete(&self, user_prompt: &str) -> Result<(String, LlmMetadata)> {
        let call = self.llm.generate(SYSTEM_PROMPT, user_prompt, Some("json_object"));
        match tokio::time::timeout(self.config.timeout, call).await {
            Ok(reply) => Ok(reply?),
            Err(_) => {
                warn!("Model call exceeded {:?}", self.config.timeout);
                Err(EstimatorError::GenerationTimeout(self.config.timeout))
            }
        }
    }

    
    fn finish(
        &self,
        mut component: Component,
        description: &str,
        context: &GenerationContext,
    ) -> Result<(Component, Vec<crate::pricing::PricingWarning>, Vec<crate::pricing::RuleAdjustment>)> {
        let adjustments = match &self.config.trade_rules {
            Some(rules) => rules.apply(&mut component, description, &context.totals()),
            None => Vec::new(),
        };

        let reconciled = self.reconciler.reconcile(&component);
        if let Some(warning) = reconciled.warnings.iter().find(|w| w.kind.is_overflow()) {
            return Err(EstimatorError::PricingOverflow(warning.to_string()));
        }

        Ok((reconciled.component, reconciled.warnings, adjustments))
    }
}
