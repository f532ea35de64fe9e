use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use tracing::{debug, info};

use super::engine::ComponentSearch;
use super::models::{SearchHit, SearchQuery};
use crate::core::error::Result;


/// Hides a fixed set of components from every result of the wrapped search,
/// e.g. held-out evaluation cases. The wrapped engine knows nothing about it.
pub struct ExcludingSearch {
    inner: Arc<dyn ComponentSearch>,
    excluded_indices: BTreeSet<usize>,
    excluded_descriptions: HashSet<String>,
}

impl ExcludingSearch {
    
    pub fn new(inner: Arc<dyn ComponentSearch>, excluded_indices: impl IntoIterator<Item = usize>) -> Self {
        let excluded_indices: BTreeSet<usize> = excluded_indices.into_iter().collect();
        info!("Excluding {} components from search", excluded_indices.len());
        Self {
            inner,
            excluded_indices,
            excluded_descriptions: HashSet::new(),
        }
    }

    /// Also hides every component whose task description equals one of
    /// `descriptions`, including duplicates elsewhere in the store.
    pub fn with_descriptions<I, S>(mut self, descriptions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_descriptions
            .extend(descriptions.into_iter().map(Into::into));
        info!(
            "Excluding {} task descriptions from search",
            self.excluded_descriptions.len()
        );
        self
    }

    
    pub fn is_excluded(&self, hit: &SearchHit) -> bool {
        self.excluded_indices.contains(&hit.index)
            || self
                .excluded_descriptions
                .contains(&hit.component.task_description)
    }

    fn exclusion_count(&self) -> usize {
        self.excluded_indices.len() + self.excluded_descriptions.len()
    }
}

impl ComponentSearch for ExcludingSearch {
    fn search(&self, query: &SearchQuery) -> Result<Vec<SearchHit>> {
        if query.top_k == 0 {
            query.validate()?;
            return Ok(Vec::new());
        }

        // Over-fetch so top_k is filled from the remaining pool; grow until the
        // inner search runs dry.
        let mut fetch = query.top_k.saturating_add(self.exclusion_count());
        loop {
            let hits = self.inner.search(&query.clone().with_top_k(fetch))?;
            let exhausted = hits.len() < fetch;

            let kept: Vec<SearchHit> = hits
                .into_iter()
                .filter(|hit| !self.is_excluded(hit))
                .take(query.top_k)
                .collect();

            if kept.len() == query.top_k || exhausted || fetch == usize::MAX {
                return Ok(kept);
            }
            debug!("Exclusion left {} of {} hits, widening fetch", kept.len(), query.top_k);
            fetch = fetch.saturating_mul(2);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge_base::{Component, KnowledgeBaseStore};
    use crate::search::SemanticSearchEngine;

    fn engine() -> Arc<dyn ComponentSearch> {
        let store = KnowledgeBaseStore::from_components(vec![
            Component::new("Nedrivning", "Nedrivning af fliser"),
            Component::new("Nedrivning", "Nedrivning af fliser i køkken"),
            Component::new("Murer", "Nye fliser i badeværelse"),
            Component::new("Nedrivning", "Nedrivning af væg"),
            Component::new("Maler", "Maling af fliser"),
            Component::new("Nedrivning", "Nedrivning af fliser"),
        ]);
        Arc::new(SemanticSearchEngine::build(Arc::new(store)).unwrap())
    }

    #[test]
    fn test_excluded_indices_never_appear() {
        let search = ExcludingSearch::new(engine(), [0, 1]);
        for text in ["nedrivning af fliser", "fliser", "køkken", "nedrivning"] {
            for k in 1..=6 {
                let hits = search.search(&SearchQuery::new(text, k)).unwrap();
                assert!(hits.iter().all(|h| h.index != 0 && h.index != 1));
            }
        }
    }

    #[test]
    fn test_top_k_is_filled_from_remaining_pool() {
        let inner = engine();
        let unfiltered = inner.search(&SearchQuery::new("nedrivning af fliser", 3)).unwrap();
        let excluded: Vec<usize> = unfiltered.iter().map(|h| h.index).collect();

        let search = ExcludingSearch::new(inner.clone(), excluded.clone());
        let hits = search.search(&SearchQuery::new("nedrivning af fliser", 3)).unwrap();
        assert_eq!(hits.len(), 3);
        assert!(hits.iter().all(|h| !excluded.contains(&h.index)));
    }

    #[test]
    fn test_exclusion_by_description_covers_duplicates() {
        let search = ExcludingSearch::new(engine(), std::iter::empty()).with_descriptions(["Nedrivning af fliser"]);
        let hits = search.search(&SearchQuery::new("nedrivning af fliser", 6)).unwrap();
        assert!(!hits.is_empty());
        assert!(hits
            .iter()
            .all(|h| h.component.task_description != "Nedrivning af fliser"));
    }

    #[test]
    fn test_preserves_inner_order() {
        let inner = engine();
        let search = ExcludingSearch::new(inner.clone(), [2]);
        let expected: Vec<usize> = inner
            .search(&SearchQuery::new("fliser", 6))
            .unwrap()
            .into_iter()
            .map(|h| h.index)
            .filter(|i| *i != 2)
            .collect();
        let actual: Vec<usize> = search
            .search(&SearchQuery::new("fliser", 6))
            .unwrap()
            .into_iter()
            .map(|h| h.index)
            .collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_zero_top_k() {
        let search = ExcludingSearch::new(engine(), [0]);
        assert!(search.search(&SearchQuery::new("fliser", 0)).unwrap().is_empty());
    }
}
