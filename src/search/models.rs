use serde::{Deserialize, Serialize};

use crate::core::error::{EstimatorError, Result};
use crate::knowledge_base::Component;
use crate::quality::{classify, QualityTier};


/// Inclusive bounds on `total_price`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostRange {
    pub min: f64,
    pub max: f64,
}

impl CostRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn at_least(min: f64) -> Self {
        Self::new(min, f64::INFINITY)
    }

    pub fn at_most(max: f64) -> Self {
        Self::new(0.0, max)
    }

    /// Builds a range from optional bounds; `None` when neither is given.
    pub fn from_bounds(min: Option<f64>, max: Option<f64>) -> Option<Self> {
        match (min, max) {
            (None, None) => None,
            (min, max) => Some(Self::new(
                min.unwrap_or(f64::NEG_INFINITY),
                max.unwrap_or(f64::INFINITY),
            )),
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub text: String,
    pub top_k: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_range: Option<CostRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<QualityTier>,
    /// Hits must reach this score. Zero-score hits are never returned.
    #[serde(default)]
    pub min_similarity: f64,
}

impl SearchQuery {
    
    pub fn new(text: impl Into<String>, top_k: usize) -> Self {
        Self {
            text: text.into(),
            top_k,
            category: None,
            cost_range: None,
            quality: None,
            min_similarity: 0.0,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_cost_range(mut self, min: f64, max: f64) -> Self {
        self.cost_range = Some(CostRange::new(min, max));
        self
    }

    pub fn with_quality(mut self, quality: QualityTier) -> Self {
        self.quality = Some(quality);
        self
    }

    pub fn with_min_similarity(mut self, min_similarity: f64) -> Self {
        self.min_similarity = min_similarity;
        self
    }

    /// Rejects structurally invalid queries. Empty or unmatched text is not
    /// an error; it simply produces no hits.
    pub fn validate(&self) -> Result<()> {
        if let Some(range) = &self.cost_range {
            if range.min.is_nan() || range.max.is_nan() {
                return Err(EstimatorError::Query("cost range bound is NaN".to_string()));
            }
            if range.min > range.max {
                return Err(EstimatorError::Query(format!(
                    "cost range is inverted: min {} > max {}",
                    range.min, range.max
                )));
            }
        }
        if !self.min_similarity.is_finite() || self.min_similarity < 0.0 {
            return Err(EstimatorError::Query(format!(
                "min_similarity must be a non-negative number, got {}",
                self.min_similarity
            )));
        }
        Ok(())
    }

    /// Candidate-set filter, applied before ranking.
    pub fn admits(&self, component: &Component) -> bool {
        if let Some(category) = &self.category {
            if component.category != *category {
                return false;
            }
        }
        if let Some(range) = &self.cost_range {
            if !range.contains(component.total_price) {
                return false;
            }
        }
        if let Some(quality) = self.quality {
            if classify(component) != quality {
                return false;
            }
        }
        true
    }
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub index: usize,
    pub score: f64,
    pub component: Component,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge_base::FormatTag;

    #[test]
    fn test_cost_range_is_inclusive() {
        let range = CostRange::new(1000.0, 2000.0);
        assert!(range.contains(1000.0));
        assert!(range.contains(2000.0));
        assert!(!range.contains(2000.01));
    }

    #[test]
    fn test_cost_range_from_bounds() {
        assert_eq!(CostRange::from_bounds(None, None), None);
        let open = CostRange::from_bounds(Some(500.0), None).unwrap();
        assert!(open.contains(1e9));
        assert!(!open.contains(499.0));
    }

    #[test]
    fn test_validate_rejects_inverted_range() {
        let query = SearchQuery::new("fliser", 3).with_cost_range(5000.0, 100.0);
        assert!(matches!(query.validate(), Err(EstimatorError::Query(_))));
    }

    #[test]
    fn test_validate_rejects_nan_bounds() {
        let query = SearchQuery::new("fliser", 3).with_cost_range(f64::NAN, 100.0);
        assert!(query.validate().is_err());
        let query = SearchQuery::new("fliser", 3).with_min_similarity(f64::NAN);
        assert!(query.validate().is_err());
    }

    #[test]
    fn test_infinite_bounds_are_open_ended() {
        let query = SearchQuery::new("fliser", 3).with_cost_range(f64::NEG_INFINITY, f64::INFINITY);
        assert!(query.validate().is_ok());
        let inverted = SearchQuery::new("fliser", 3).with_cost_range(f64::INFINITY, 100.0);
        assert!(matches!(inverted.validate(), Err(EstimatorError::Query(_))));
    }

    #[test]
    fn test_empty_text_is_valid() {
        assert!(SearchQuery::new("", 5).validate().is_ok());
    }

    #[test]
    fn test_admits_applies_every_filter() {
        let component = Component {
            total_price: 1500.0,
            format_tag: FormatTag::Legacy,
            ..Component::new("VVS", "Nyt toilet")
        };

        assert!(SearchQuery::new("toilet", 1).admits(&component));
        assert!(!SearchQuery::new("toilet", 1).with_category("vvs").admits(&component));
        assert!(!SearchQuery::new("toilet", 1).with_cost_range(0.0, 1000.0).admits(&component));
        assert!(!SearchQuery::new("toilet", 1).with_quality(QualityTier::Complete).admits(&component));
        assert!(SearchQuery::new("toilet", 1)
            .with_category("VVS")
            .with_cost_range(1500.0, 1500.0)
            .with_quality(QualityTier::Legacy)
            .admits(&component));
    }
}
