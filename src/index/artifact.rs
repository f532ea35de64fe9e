use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::lexical::LexicalIndex;
use crate::core::error::{EstimatorError, Result};
use crate::knowledge_base::KnowledgeBaseStore;

/// Bumped whenever tokenization or weighting changes, so old artifacts rebuild.
pub const INDEX_FORMAT_VERSION: u32 = 1;


#[derive(Deserialize)]
struct IndexArtifact {
    format_version: u32,
    #[serde(flatten)]
    index: LexicalIndex,
}

#[derive(Serialize)]
struct IndexArtifactRef<'a> {
    format_version: u32,
    #[serde(flatten)]
    index: &'a LexicalIndex,
}


impl LexicalIndex {
    /// Writes the index to a temp file next to `path` and renames it into
    /// place, so readers never observe a partially written artifact.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            serde_json::to_writer(
                &mut writer,
                &IndexArtifactRef {
                    format_version: INDEX_FORMAT_VERSION,
                    index: self,
                },
            )?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| EstimatorError::Io(e.error))?;

        info!("Saved lexical index to {}", path.display());
        Ok(())
    }

    
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let artifact: IndexArtifact = serde_json::from_reader(reader)?;

        if artifact.format_version != INDEX_FORMAT_VERSION {
            return Err(EstimatorError::StaleIndex(format!(
                "artifact format {} (expected {})",
                artifact.format_version, INDEX_FORMAT_VERSION
            )));
        }
        if !artifact.index.is_well_formed() {
            return Err(EstimatorError::StaleIndex(format!(
                "artifact {} is inconsistent",
                path.display()
            )));
        }
        Ok(artifact.index)
    }

    /// Reuses the artifact at `path` when it matches `store`, otherwise
    /// rebuilds and replaces it. A failed write is logged; the rebuilt index
    /// is still returned.
    pub fn load_or_build(path: impl AsRef<Path>, store: &KnowledgeBaseStore) -> Result<Self> {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(index) if index.is_fresh_for(store) => {
                info!("Reusing lexical index from {}", path.display());
                return Ok(index);
            }
            Ok(_) => warn!("Index at {} is stale, rebuilding", path.display()),
            Err(EstimatorError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No index at {}, building", path.display());
            }
            Err(e) => warn!("Discarding index at {}: {}", path.display(), e),
        }

        let index = Self::build(store)?;
        if let Err(e) = index.save(path) {
            warn!("Failed to persist index to {}: {}", path.display(), e);
        }
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge_base::Component;
    use tempfile::TempDir;

    fn store(descriptions: &[&str]) -> KnowledgeBaseStore {
        KnowledgeBaseStore::from_components(
            descriptions
                .iter()
                .map(|d| Component::new("Test", *d))
                .collect(),
        )
    }

    #[test]
    fn test_save_then_load_restores_index() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kb.index.json");
        let index = LexicalIndex::build(&store(&["Maling af loft", "Nyt toilet"])).unwrap();

        index.save(&path).unwrap();
        let loaded = LexicalIndex::load(&path).unwrap();
        assert_eq!(loaded, index);
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("index.json");
        let index = LexicalIndex::build(&store(&["Maling af loft"])).unwrap();
        index.save(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_load_or_build_rebuilds_stale_artifact() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.json");

        let old = LexicalIndex::build(&store(&["Maling af loft"])).unwrap();
        old.save(&path).unwrap();

        let current = store(&["Maling af loft", "Nedrivning af fliser"]);
        let index = LexicalIndex::load_or_build(&path, &current).unwrap();
        assert!(index.is_fresh_for(&current));
        assert!(LexicalIndex::load(&path).unwrap().is_fresh_for(&current));
    }

    #[test]
    fn test_load_or_build_builds_when_missing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.json");
        let current = store(&["Nyt toilet"]);

        let index = LexicalIndex::load_or_build(&path, &current).unwrap();
        assert_eq!(index.len(), 1);
        assert!(path.exists());
    }

    #[test]
    fn test_load_or_build_replaces_corrupt_artifact() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.json");
        std::fs::write(&path, "{ not json").unwrap();

        let current = store(&["Nyt toilet"]);
        let index = LexicalIndex::load_or_build(&path, &current).unwrap();
        assert!(index.is_fresh_for(&current));
    }

    #[test]
    fn test_load_rejects_other_format_version() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.json");
        let index = LexicalIndex::build(&store(&["Nyt toilet"])).unwrap();
        index.save(&path).unwrap();

        let mut raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        raw["format_version"] = serde_json::Value::from(INDEX_FORMAT_VERSION + 1);
        std::fs::write(&path, raw.to_string()).unwrap();

        assert!(matches!(LexicalIndex::load(&path), Err(EstimatorError::StaleIndex(_))));
    }
}
