use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use super::tokenizer::tokenize;
use super::vector::DocumentVector;
use super::vocabulary::Vocabulary;
use crate::core::error::{EstimatorError, Result};
use crate::knowledge_base::KnowledgeBaseStore;


/// Identifies the corpus an index was built from. Two stores with the same
/// fingerprint produce identical indexes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusFingerprint {
    pub component_count: usize,
    pub corpus_hash: String,
}

impl CorpusFingerprint {
    
    pub fn of(store: &KnowledgeBaseStore) -> Self {
        let mut hasher = Sha256::new();
        for component in store.iter() {
            let text = component.task_description.as_bytes();
            hasher.update((text.len() as u64).to_le_bytes());
            hasher.update(text);
        }
        Self {
            component_count: store.len(),
            corpus_hash: format!("{:x}", hasher.finalize()),
        }
    }
}


/// Vocabulary plus one unit vector per component, in store order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LexicalIndex {
    pub(crate) fingerprint: CorpusFingerprint,
    pub(crate) vocabulary: Vocabulary,
    pub(crate) vectors: Vec<DocumentVector>,
}

impl LexicalIndex {
    
    pub fn build(store: &KnowledgeBaseStore) -> Result<Self> {
        if store.is_empty() {
            return Err(EstimatorError::IndexBuild(
                "knowledge base has no components".to_string(),
            ));
        }

        let token_lists: Vec<Vec<String>> = store
            .iter()
            .map(|c| tokenize(&c.task_description))
            .collect();

        let vocabulary = Vocabulary::build(&token_lists);
        if vocabulary.is_empty() {
            return Err(EstimatorError::IndexBuild(
                "task descriptions yield no vocabulary terms".to_string(),
            ));
        }

        let vectors: Vec<DocumentVector> = token_lists
            .iter()
            .map(|tokens| vectorize_tokens(&vocabulary, tokens))
            .collect();

        let empty = vectors.iter().filter(|v| v.is_zero()).count();
        if empty > 0 {
            debug!("{} components have no indexable terms and will never match", empty);
        }

        info!(
            "Built lexical index: {} components, {} terms",
            vectors.len(),
            vocabulary.len()
        );

        Ok(Self {
            fingerprint: CorpusFingerprint::of(store),
            vocabulary,
            vectors,
        })
    }

    /// Projects free text onto the fixed vocabulary. Unknown tokens are
    /// dropped, so novel wording yields the zero vector.
    pub fn vectorize(&self, text: &str) -> DocumentVector {
        vectorize_tokens(&self.vocabulary, &tokenize(text))
    }

    pub fn vector(&self, index: usize) -> Option<&DocumentVector> {
        self.vectors.get(index)
    }

    pub fn vectors(&self) -> &[DocumentVector] {
        &self.vectors
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn fingerprint(&self) -> &CorpusFingerprint {
        &self.fingerprint
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    
    pub fn is_fresh_for(&self, store: &KnowledgeBaseStore) -> bool {
        self.fingerprint.component_count == store.len()
            && self.fingerprint == CorpusFingerprint::of(store)
    }

    /// Structural checks for an index read back from disk.
    pub(crate) fn is_well_formed(&self) -> bool {
        let dim = self.vocabulary.len();
        self.vectors.len() == self.fingerprint.component_count
            && self
                .vectors
                .iter()
                .all(|v| v.dim() == dim && v.is_consistent())
    }
}


fn vectorize_tokens(vocabulary: &Vocabulary, tokens: &[String]) -> DocumentVector {
    let mut counts: BTreeMap<usize, u32> = BTreeMap::new();
    for token in tokens {
        if let Some(column) = vocabulary.column(token) {
            *counts.entry(column).or_insert(0) += 1;
        }
    }
    DocumentVector::from_counts(vocabulary.len(), &counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge_base::Component;

    fn store(descriptions: &[&str]) -> KnowledgeBaseStore {
        KnowledgeBaseStore::from_components(
            descriptions
                .iter()
                .map(|d| Component::new("Test", *d))
                .collect(),
        )
    }

    #[test]
    fn test_build_produces_unit_vectors() {
        let index = LexicalIndex::build(&store(&[
            "Nedrivning af fliser i badeværelse",
            "Opsætning af nye fliser",
            "Maling af loft",
        ]))
        .unwrap();

        assert_eq!(index.len(), 3);
        for vector in index.vectors() {
            assert_eq!(vector.dim(), index.vocabulary().len());
            assert!((vector.norm() - 1.0).abs() < 1e-9);
        }
        assert!(index.is_well_formed());
    }

    #[test]
    fn test_component_without_terms_gets_zero_vector() {
        let index = LexicalIndex::build(&store(&["Maling af loft", "", "-"])).unwrap();
        assert!(index.vector(1).unwrap().is_zero());
        assert!(index.vector(2).unwrap().is_zero());
        assert!(!index.vector(0).unwrap().is_zero());
    }

    #[test]
    fn test_build_fails_on_empty_store() {
        let err = LexicalIndex::build(&KnowledgeBaseStore::default()).unwrap_err();
        assert!(matches!(err, EstimatorError::IndexBuild(_)));
    }

    #[test]
    fn test_build_fails_when_no_terms() {
        let err = LexicalIndex::build(&store(&["", "a", "!"])).unwrap_err();
        assert!(matches!(err, EstimatorError::IndexBuild(_)));
    }

    #[test]
    fn test_vectorize_ignores_unknown_terms() {
        let index = LexicalIndex::build(&store(&["Maling af loft"])).unwrap();
        assert!(index.vectorize("helt ukendte ord").is_zero());

        let query = index.vectorize("maling skorsten");
        assert_eq!(query.nnz(), 1);
        assert!((query.norm() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_fingerprint_tracks_descriptions() {
        let a = store(&["Maling af loft", "Nyt toilet"]);
        let b = store(&["Maling af loft", "Nyt toilet"]);
        let c = store(&["Maling af loft", "Nyt toilet "]);

        assert_eq!(CorpusFingerprint::of(&a), CorpusFingerprint::of(&b));
        assert_ne!(CorpusFingerprint::of(&a), CorpusFingerprint::of(&c));

        let index = LexicalIndex::build(&a).unwrap();
        assert!(index.is_fresh_for(&b));
        assert!(!index.is_fresh_for(&c));
        assert!(!index.is_fresh_for(&store(&["Maling af loft"])));
    }
}
