use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use super::models::{breakdown_of, EvaluationResult, EvaluationSummary, TestCase, Tolerances};
use crate::generator::{GeneratorConfig, RagComponentGenerator};
use crate::llm::LlmProvider;
use crate::search::{ComponentSearch, ExcludingSearch};


/// Runs held-out cases through the generator with the cases hidden from
/// retrieval.
pub struct Evaluator {
    search: Arc<dyn ComponentSearch>,
    llm: Arc<dyn LlmProvider>,
    config: GeneratorConfig,
    tolerances: Tolerances,
    delay: Duration,
}

impl Evaluator {
    pub fn new(
        search: Arc<dyn ComponentSearch>,
        llm: Arc<dyn LlmProvider>,
        config: GeneratorConfig,
    ) -> Self {
        Self {
            search,
            llm,
            config,
            tolerances: Tolerances::default(),
            delay: Duration::ZERO,
        }
    }

    pub fn with_tolerances(mut self, tolerances: Tolerances) -> Self {
        self.tolerances = tolerances;
        self
    }

    /// Pause between cases, for rate-limited providers.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    
    pub async fn run(&self, cases: &[TestCase]) -> EvaluationSummary {
        info!("Starting evaluation of {} cases", cases.len());

        let filtered = ExcludingSearch::new(self.search.clone(), std::iter::empty())
            .with_descriptions(cases.iter().map(|c| c.description.clone()));
        let generator =
            RagComponentGenerator::new(Arc::new(filtered), self.llm.clone(), self.config.clone());

        let mut results = Vec::with_capacity(cases.len());
        for (i, case) in cases.iter().enumerate() {
            if i > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let result = self.evaluate_case(&generator, i + 1, case).await;
            info!(
                "Case {}: success={}, error={:.1}%",
                result.test_case,
                result.success,
                result.error_margin * 100.0
            );
            results.push(result);
        }

        let summary = EvaluationSummary::from_results(results);
        info!(
            "Evaluation finished: {}/{} successful ({:.1}%), average error {:.1}%",
            summary.successful_tests,
            summary.total_tests,
            summary.success_rate * 100.0,
            summary.average_error * 100.0
        );
        summary
    }

    async fn evaluate_case(
        &self,
        generator: &RagComponentGenerator,
        test_case: usize,
        case: &TestCase,
    ) -> EvaluationResult {
        match generator.generate(&case.description, true).await {
            Ok(generated) => {
                let comparison = self.tolerances.compare(&case.ground_truth, &generated.component);
                let notes = if comparison.notes.is_empty() {
                    "All fields within tolerance".to_string()
                } else {
                    comparison.notes.join("; ")
                };
                EvaluationResult {
                    test_case,
                    input_description: case.description.clone(),
                    ground_truth: case.ground_truth.clone(),
                    generated_values: breakdown_of(&generated.component),
                    success: comparison.success,
                    error_margin: comparison.error_margin,
                    notes,
                    quality_tier: Some(generated.quality_tier),
                }
            }
            Err(failure) => {
                warn!("Case {} failed: {}", test_case, failure);
                EvaluationResult {
                    test_case,
                    input_description: case.description.clone(),
                    ground_truth: case.ground_truth.clone(),
                    generated_values: Default::default(),
                    success: false,
                    error_margin: 1.0,
                    notes: format!("Generation error: {failure}"),
                    quality_tier: None,
                }
            }
        }
    }
}
