use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::IntoEnumIterator;

use crate::core::error::{EstimatorError, Result};
use crate::generator::ContextTier;
use crate::knowledge_base::{Component, PricedField};

/// A generated value counts as zero when the truth is zero and it stays
/// within this many currency units.
pub const ZERO_TRUTH_ALLOWANCE: f64 = 100.0;


/// One held-out case: a task description and its known breakdown, keyed by
/// knowledge base field names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "(String, BTreeMap<String, Value>)", into = "(String, BTreeMap<String, Value>)")]
pub struct TestCase {
    pub description: String,
    pub ground_truth: BTreeMap<String, f64>,
}

impl From<(String, BTreeMap<String, Value>)> for TestCase {
    fn from((description, breakdown): (String, BTreeMap<String, Value>)) -> Self {
        let ground_truth = breakdown
            .into_iter()
            .filter_map(|(key, value)| match value {
                Value::Null => Some((key, 0.0)),
                other => other.as_f64().map(|v| (key, v)),
            })
            .collect();
        Self {
            description,
            ground_truth,
        }
    }
}

impl From<TestCase> for (String, BTreeMap<String, Value>) {
    fn from(case: TestCase) -> Self {
        let breakdown = case
            .ground_truth
            .into_iter()
            .map(|(k, v)| (k, Value::from(v)))
            .collect();
        (case.description, breakdown)
    }
}


/// Reads a JSON array of `[description, breakdown]` pairs.
pub fn load_test_set(path: impl AsRef<Path>) -> Result<Vec<TestCase>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| {
        EstimatorError::Config(format!("test set {}: {e}", path.display()))
    })?;
    Ok(serde_json::from_str(&text)?)
}


/// Relative tolerance per compared field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tolerances {
    pub fields: Vec<(PricedField, f64)>,
}

impl Default for Tolerances {
    fn default() -> Self {
        let fields = PricedField::iter()
            .map(|field| {
                let tolerance = match field {
                    PricedField::AdminCost => 0.10,
                    PricedField::HourlyRate | PricedField::LaborCost | PricedField::TotalPrice => 0.15,
                    PricedField::MaterialMarkupPct | PricedField::SubcontractorMarkupPct => 0.25,
                    PricedField::LaborHours
                    | PricedField::MaterialCost
                    | PricedField::MaterialSalePrice
                    | PricedField::SubcontractorCost
                    | PricedField::SubcontractorSalePrice => 0.20,
                };
                (field, tolerance)
            })
            .collect();
        Self { fields }
    }
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub success: bool,
    /// Sum of relative errors over every configured field, divided by the
    /// number of fields.
    pub error_margin: f64,
    pub notes: Vec<String>,
}

impl Tolerances {
    /// Compares a generated breakdown against the truth. Fields missing from
    /// the truth are not scored.
    pub fn compare(&self, ground_truth: &BTreeMap<String, f64>, generated: &Component) -> Comparison {
        let mut total_error = 0.0;
        let mut notes = Vec::new();

        for (field, tolerance) in &self.fields {
            let key: &'static str = (*field).into();
            let Some(&truth) = ground_truth.get(key) else {
                continue;
            };
            let value = generated.value(*field);

            if truth == 0.0 {
                if value.abs() > ZERO_TRUTH_ALLOWANCE {
                    notes.push(format!("{key}: GT=0, Gen={value:.2}"));
                }
                continue;
            }

            let error = (value - truth).abs() / truth.abs();
            total_error += error;
            if error > *tolerance {
                notes.push(format!(
                    "{key}: GT={truth:.2}, Gen={value:.2}, Error={:.1}%",
                    error * 100.0
                ));
            }
        }

        let error_margin = if self.fields.is_empty() {
            0.0
        } else {
            total_error / self.fields.len() as f64
        };

        Comparison {
            success: notes.is_empty(),
            error_margin,
            notes,
        }
    }
}


#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub test_case: usize,
    pub input_description: String,
    pub ground_truth: BTreeMap<String, f64>,
    pub generated_values: BTreeMap<String, f64>,
    pub success: bool,
    pub error_margin: f64,
    pub notes: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_tier: Option<ContextTier>,
}


#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationSummary {
    pub total_tests: usize,
    pub successful_tests: usize,
    pub success_rate: f64,
    pub average_error: f64,
    pub results: Vec<EvaluationResult>,
    pub evaluated_at: DateTime<Utc>,
}

impl EvaluationSummary {
    pub fn from_results(results: Vec<EvaluationResult>) -> Self {
        let total_tests = results.len();
        let successful_tests = results.iter().filter(|r| r.success).count();
        let (success_rate, average_error) = if total_tests == 0 {
            (0.0, 0.0)
        } else {
            (
                successful_tests as f64 / total_tests as f64,
                results.iter().map(|r| r.error_margin).sum::<f64>() / total_tests as f64,
            )
        };
        Self {
            total_tests,
            successful_tests,
            success_rate,
            average_error,
            results,
            evaluated_at: Utc::now(),
        }
    }

    
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}


pub(crate) fn breakdown_of(component: &Component) -> BTreeMap<String, f64> {
    PricedField::iter()
        .map(|field| {
            let key: &'static str = field.into();
            (key.to_string(), component.value(field))
        })
        .collect()
}
