use serde::{Deserialize, Serialize};

use super::models::SearchHit;
use crate::knowledge_base::Component;
use crate::knowledge_base::analyzer::count_by;

const TOP_LABELS: usize = 5;


/// Aggregate view of a result set, for quick price orientation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchSummary {
    pub query: String,
    pub total_results: usize,
    pub total_cost: f64,
    pub average_cost: f64,
    pub min_cost: f64,
    pub max_cost: f64,
    pub top_categories: Vec<(String, usize)>,
    pub top_trades: Vec<(String, usize)>,
}

impl SearchSummary {
    pub fn from_hits(query: &str, hits: &[SearchHit]) -> Self {
        if hits.is_empty() {
            return Self {
                query: query.to_string(),
                ..Self::default()
            };
        }

        let prices: Vec<f64> = hits.iter().map(|h| h.component.total_price).collect();
        let total_cost: f64 = prices.iter().sum();

        Self {
            query: query.to_string(),
            total_results: hits.len(),
            total_cost,
            average_cost: total_cost / hits.len() as f64,
            min_cost: prices.iter().copied().fold(f64::INFINITY, f64::min),
            max_cost: prices.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            top_categories: top_labels(hits.iter().map(|h| &h.component), |c| c.category.as_str()),
            top_trades: top_labels(hits.iter().map(|h| &h.component), |c| c.trade.as_str()),
        }
    }
}


fn top_labels<'c, F>(components: impl IntoIterator<Item = &'c Component>, key: F) -> Vec<(String, usize)>
where
    F: Fn(&'c Component) -> &'c str,
{
    let mut counts: Vec<(String, usize)> = count_by(components, key).into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts.truncate(TOP_LABELS);
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(index: usize, category: &str, trade: &str, total: f64) -> SearchHit {
        SearchHit {
            index,
            score: 0.5,
            component: Component {
                trade: trade.to_string(),
                total_price: total,
                ..Component::new(category, "opgave")
            },
        }
    }

    #[test]
    fn test_summary_of_hits() {
        let hits = vec![
            hit(0, "VVS", "Bnord", 1000.0),
            hit(1, "VVS", "", 3000.0),
            hit(2, "Maler", "Bnord", 2000.0),
        ];
        let summary = SearchSummary::from_hits("toilet", &hits);

        assert_eq!(summary.total_results, 3);
        assert_eq!(summary.total_cost, 6000.0);
        assert_eq!(summary.average_cost, 2000.0);
        assert_eq!(summary.min_cost, 1000.0);
        assert_eq!(summary.max_cost, 3000.0);
        assert_eq!(summary.top_categories[0], ("VVS".to_string(), 2));
        assert_eq!(
            summary.top_trades,
            vec![("Bnord".to_string(), 2), ("Unknown".to_string(), 1)]
        );
    }

    #[test]
    fn test_summary_of_nothing() {
        let summary = SearchSummary::from_hits("ukendt", &[]);
        assert_eq!(summary.total_results, 0);
        assert_eq!(summary.query, "ukendt");
        assert!(summary.top_categories.is_empty());
    }
}
