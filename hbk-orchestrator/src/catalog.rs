//! JSON segment catalog
//!
//! File-backed [`SemanticSearch`] used when no embedding index is attached.
//! Scores by term overlap: the fraction of distinct query terms that appear
//! in a document's embedding text. Crude, but it keeps the ranking contract
//! (descending score, `top_k`, zero scores dropped) the real index honours.
//!
//! File format: a JSON array of entries
//!
//! ```json
//! [
//!   {
//!     "collection": "segments",
//!     "id": "17",
//!     "source_path": "field/rain_roof.wav",
//!     "embedding_text": "soft rain on a tin roof",
//!     "start": 0.0,
//!     "end": 1.0,
//!     "bark_bands_raw": [0.0, 0.1, ...]
//!   }
//! ]
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::error::Result;
use crate::invocation::{SearchResult, SegmentDocument, SemanticSearch};

#[derive(Debug, Clone, Deserialize)]
struct CatalogEntry {
    #[serde(default = "default_collection")]
    collection: String,
    #[serde(flatten)]
    document: SegmentDocument,
}

fn default_collection() -> String {
    hbk_common::events::SEGMENTS_COLLECTION.to_string()
}

/// In-memory catalog with precomputed term sets
pub struct SegmentCatalog {
    entries: Vec<(CatalogEntry, HashSet<String>)>,
}

impl SegmentCatalog {
    /// Load a catalog from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let catalog = Self::from_json(&content)?;
        info!("Loaded {} catalog entries from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    /// Parse a catalog from JSON text
    pub fn from_json(content: &str) -> Result<Self> {
        let entries: Vec<CatalogEntry> = serde_json::from_str(content)?;
        Ok(Self {
            entries: entries
                .into_iter()
                .map(|entry| {
                    let terms = terms(&entry.document.embedding_text);
                    (entry, terms)
                })
                .collect(),
        })
    }

    /// Catalog with no entries (every invocation finds nothing)
    pub fn empty() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SemanticSearch for SegmentCatalog {
    fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchResult>> {
        let query_terms = terms(query);
        if query_terms.is_empty() {
            return Ok(Vec::new());
        }

        let mut results: Vec<SearchResult> = self
            .entries
            .iter()
            .filter_map(|(entry, entry_terms)| {
                let hits = query_terms.intersection(entry_terms).count();
                if hits == 0 {
                    return None;
                }
                Some(SearchResult {
                    collection: entry.collection.clone(),
                    score: hits as f64 / query_terms.len() as f64,
                    document: entry.document.clone(),
                })
            })
            .collect();

        // Stable sort keeps file order among equal scores
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(top_k);
        Ok(results)
    }
}

/// Lowercased alphanumeric tokens
fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"[
        {"id": "1", "source_path": "rain.wav", "embedding_text": "soft rain on a tin roof"},
        {"id": "2", "source_path": "storm.wav", "embedding_text": "Heavy rain, thunder storm"},
        {"collection": "effects", "source_path": "verb.vst", "embedding_text": "rain reverb"},
        {"id": "4", "source_path": "birds.wav", "embedding_text": "morning birds"}
    ]"#;

    #[test]
    fn test_from_json_defaults_collection() {
        let catalog = SegmentCatalog::from_json(CATALOG).unwrap();
        assert_eq!(catalog.len(), 4);
        assert_eq!(catalog.entries[0].0.collection, "segments");
        assert_eq!(catalog.entries[2].0.collection, "effects");
    }

    #[test]
    fn test_search_ranks_by_overlap() {
        let catalog = SegmentCatalog::from_json(CATALOG).unwrap();
        let results = catalog.search("thunder rain", 10).unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].document.source_path, "storm.wav");
        assert_eq!(results[0].score, 1.0);
        assert_eq!(results[1].score, 0.5);
        assert!(results.iter().all(|r| r.document.source_path != "birds.wav"));
    }

    #[test]
    fn test_search_respects_top_k() {
        let catalog = SegmentCatalog::from_json(CATALOG).unwrap();
        assert_eq!(catalog.search("rain", 1).unwrap().len(), 1);
    }

    #[test]
    fn test_search_empty_query() {
        let catalog = SegmentCatalog::from_json(CATALOG).unwrap();
        assert!(catalog.search("  ,, ", 5).unwrap().is_empty());
        assert!(SegmentCatalog::empty().search("rain", 5).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_json_is_error() {
        assert!(SegmentCatalog::from_json("{not json").is_err());
    }
}
