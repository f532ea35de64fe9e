use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::models::{Component, FormatTag};
use super::store::KnowledgeBaseStore;


#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValueStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
}

impl ValueStats {
    /// Statistics over the strictly positive values only; zero-filled legacy
    /// fields would otherwise drag every figure towards zero.
    pub fn from_positive(values: impl IntoIterator<Item = f64>) -> Self {
        let mut values: Vec<f64> = values.into_iter().filter(|v| *v > 0.0).collect();
        if values.is_empty() {
            return Self::default();
        }
        values.sort_by(|a, b| a.total_cmp(b));

        let count = values.len();
        let mid = count / 2;
        let median = if count % 2 == 0 {
            (values[mid - 1] + values[mid]) / 2.0
        } else {
            values[mid]
        };

        Self {
            count,
            min: values[0],
            max: values[count - 1],
            mean: values.iter().sum::<f64>() / count as f64,
            median,
        }
    }
}


#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeBaseSummary {
    pub total_components: usize,
    pub complete_format: usize,
    pub legacy_format: usize,
    pub categories: BTreeMap<String, usize>,
    pub trades: BTreeMap<String, usize>,
    pub total_price: ValueStats,
    pub labor_hours: ValueStats,
    pub material_cost: ValueStats,
    pub collected_at: DateTime<Utc>,
}


pub struct KnowledgeBaseAnalyzer<'a> {
    store: &'a KnowledgeBaseStore,
}

impl<'a> KnowledgeBaseAnalyzer<'a> {
    pub fn new(store: &'a KnowledgeBaseStore) -> Self {
        Self { store }
    }

    
    pub fn summary(&self) -> KnowledgeBaseSummary {
        let components = self.store.components();
        let complete_format = components
            .iter()
            .filter(|c| c.format_tag == FormatTag::Complete)
            .count();

        KnowledgeBaseSummary {
            total_components: components.len(),
            complete_format,
            legacy_format: components.len() - complete_format,
            categories: count_by(components, |c| c.category.as_str()),
            trades: count_by(components, |c| c.trade.as_str()),
            total_price: ValueStats::from_positive(components.iter().map(|c| c.total_price)),
            labor_hours: ValueStats::from_positive(components.iter().map(|c| c.labor_hours)),
            material_cost: ValueStats::from_positive(components.iter().map(|c| c.material_cost)),
            collected_at: Utc::now(),
        }
    }

    
    pub fn category_components(&self, category: &str) -> Vec<&'a Component> {
        self.store
            .iter()
            .filter(|c| c.category.eq_ignore_ascii_case(category))
            .collect()
    }

    
    pub fn category_price_stats(&self, category: &str) -> ValueStats {
        ValueStats::from_positive(
            self.category_components(category)
                .into_iter()
                .map(|c| c.total_price),
        )
    }
}


/// Counts components per label, empty labels reported as `Unknown`.
pub(crate) fn count_by<'c, F>(components: impl IntoIterator<Item = &'c Component>, key: F) -> BTreeMap<String, usize>
where
    F: Fn(&'c Component) -> &'c str,
{
    let mut counts = BTreeMap::new();
    for component in components {
        let label = key(component);
        let label = if label.trim().is_empty() { "Unknown" } else { label };
        *counts.entry(label.to_string()).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn priced(category: &str, trade: &str, total: f64, format: FormatTag) -> Component {
        Component {
            trade: trade.to_string(),
            total_price: total,
            format_tag: format,
            ..Component::new(category, format!("{category} opgave"))
        }
    }

    #[test]
    fn test_value_stats_ignores_zeroes() {
        let stats = ValueStats::from_positive([0.0, 4.0, 1.0, 3.0, 0.0, 2.0]);
        assert_eq!(stats.count, 4);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 4.0);
        assert_eq!(stats.mean, 2.5);
        assert_eq!(stats.median, 2.5);
    }

    #[test]
    fn test_value_stats_empty() {
        assert_eq!(ValueStats::from_positive([0.0]), ValueStats::default());
    }

    #[test]
    fn test_summary_counts() {
        let store = KnowledgeBaseStore::from_components(vec![
            priced("VVS", "Bnord", 1000.0, FormatTag::Complete),
            priced("VVS", "", 3000.0, FormatTag::Legacy),
            priced("Maler", "Bnord", 0.0, FormatTag::Complete),
        ]);

        let summary = KnowledgeBaseAnalyzer::new(&store).summary();
        assert_eq!(summary.total_components, 3);
        assert_eq!(summary.complete_format, 2);
        assert_eq!(summary.legacy_format, 1);
        assert_eq!(summary.categories.get("VVS"), Some(&2));
        assert_eq!(summary.trades.get("Unknown"), Some(&1));
        assert_eq!(summary.total_price.count, 2);
        assert_eq!(summary.total_price.median, 2000.0);
    }

    #[test]
    fn test_category_lookup_is_case_insensitive() {
        let store = KnowledgeBaseStore::from_components(vec![
            priced("VVS", "Bnord", 1000.0, FormatTag::Complete),
            priced("Maler", "Bnord", 500.0, FormatTag::Complete),
        ]);
        let analyzer = KnowledgeBaseAnalyzer::new(&store);
        assert_eq!(analyzer.category_components("vvs").len(), 1);
        assert_eq!(analyzer.category_price_stats("maler").max, 500.0);
    }
}
