use std::collections::BTreeSet;
use std::path::Path;

use tracing::{debug, info};

use super::models::{Component, KnowledgeBaseFile, KnowledgeBaseMetadata};
use crate::core::error::{EstimatorError, Result};


/// Read-only collection of priced components. Nothing mutates a component
/// after load; derived records are always produced as copies.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBaseStore {
    metadata: KnowledgeBaseMetadata,
    components: Vec<Component>,
}

impl KnowledgeBaseStore {
    
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            EstimatorError::KnowledgeBase(format!("cannot read {}: {}", path.display(), e))
        })?;
        let file: KnowledgeBaseFile = serde_json::from_str(&raw).map_err(|e| {
            EstimatorError::KnowledgeBase(format!("malformed {}: {}", path.display(), e))
        })?;

        let store = Self::from_parts(file.metadata, file.components);
        info!(
            "Loaded knowledge base with {} components from {}",
            store.len(),
            path.display()
        );
        Ok(store)
    }

    
    pub fn from_components(components: Vec<Component>) -> Self {
        Self::from_parts(KnowledgeBaseMetadata::default(), components)
    }

    
    pub fn from_parts(metadata: KnowledgeBaseMetadata, mut components: Vec<Component>) -> Self {
        for (i, component) in components.iter_mut().enumerate() {
            component.index = Some(i);
        }
        if let Some(declared) = metadata.total_components {
            if declared as usize != components.len() {
                debug!(
                    "Metadata declares {} components, file holds {}",
                    declared,
                    components.len()
                );
            }
        }
        Self {
            metadata,
            components,
        }
    }

    
    pub fn metadata(&self) -> &KnowledgeBaseMetadata {
        &self.metadata
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Component> {
        self.components.get(index)
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn iter(&self) -> impl Iterator<Item = &Component> {
        self.components.iter()
    }

    
    pub fn categories(&self) -> Vec<String> {
        self.components
            .iter()
            .map(|c| c.category.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Indices of every component whose description equals one of `descriptions`.
    pub fn indices_matching<'a, I>(&self, descriptions: I) -> BTreeSet<usize>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let wanted: BTreeSet<&str> = descriptions.into_iter().collect();
        self.components
            .iter()
            .enumerate()
            .filter(|(_, c)| wanted.contains(c.task_description.as_str()))
            .map(|(i, _)| i)
            .collect()
    }
}
