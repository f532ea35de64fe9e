use std::sync::Arc;

use tracing::debug;

use super::models::{SearchHit, SearchQuery};
use crate::core::error::{EstimatorError, Result};
use crate::index::LexicalIndex;
use crate::knowledge_base::KnowledgeBaseStore;


/// Anything that can rank components for a query. The generator only sees
/// this trait, so wrappers (exclusion, caching) compose around the engine.
pub trait ComponentSearch: Send + Sync {
    fn search(&self, query: &SearchQuery) -> Result<Vec<SearchHit>>;
}

impl<T: ComponentSearch + ?Sized> ComponentSearch for Arc<T> {
    fn search(&self, query: &SearchQuery) -> Result<Vec<SearchHit>> {
        (**self).search(query)
    }
}


/// Cosine ranking over precomputed unit vectors.
pub struct SemanticSearchEngine {
    store: Arc<KnowledgeBaseStore>,
    index: Arc<LexicalIndex>,
}

impl SemanticSearchEngine {
    
    pub fn new(store: Arc<KnowledgeBaseStore>, index: Arc<LexicalIndex>) -> Result<Self> {
        if !index.is_fresh_for(&store) {
            return Err(EstimatorError::StaleIndex(format!(
                "index covers {} components, store holds {}; rebuild required",
                index.fingerprint().component_count,
                store.len()
            )));
        }
        debug!(
            "SemanticSearchEngine ready: {} components, {} terms",
            store.len(),
            index.vocabulary().len()
        );
        Ok(Self { store, index })
    }

    /// Builds a fresh index for `store` and wraps both.
    pub fn build(store: Arc<KnowledgeBaseStore>) -> Result<Self> {
        let index = Arc::new(LexicalIndex::build(&store)?);
        Self::new(store, index)
    }

    pub fn store(&self) -> &Arc<KnowledgeBaseStore> {
        &self.store
    }

    pub fn index(&self) -> &Arc<LexicalIndex> {
        &self.index
    }

    fn rank(&self, query: &SearchQuery) -> Vec<(usize, f64)> {
        let query_vector = self.index.vectorize(&query.text);
        if query_vector.is_zero() {
            debug!("Query '{}' has no in-vocabulary terms", crate::safe_truncate(&query.text, 50));
            return Vec::new();
        }

        let mut scored: Vec<(usize, f64)> = self
            .store
            .iter()
            .zip(self.index.vectors())
            .enumerate()
            .filter(|(_, (component, _))| query.admits(component))
            .map(|(i, (_, vector))| (i, query_vector.dot(vector).clamp(0.0, 1.0)))
            .filter(|&(_, score)| score > 0.0 && score >= query.min_similarity)
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored.truncate(query.top_k);
        scored
    }
}

impl ComponentSearch for SemanticSearchEngine {
    fn search(&self, query: &SearchQuery) -> Result<Vec<SearchHit>> {
        query.validate()?;
        if query.top_k == 0 {
            return Ok(Vec::new());
        }

        let hits: Vec<SearchHit> = self
            .rank(query)
            .into_iter()
            .filter_map(|(index, score)| {
                self.store.get(index).map(|component| SearchHit {
                    index,
                    score,
                    component: component.clone(),
                })
            })
            .collect();

        debug!(
            "Search '{}' (top_k={}, category={:?}) -> {} hits",
            crate::safe_truncate(&query.text, 50),
            query.top_k,
            query.category,
            hits.len()
        );
        Ok(hits)
    }
}
