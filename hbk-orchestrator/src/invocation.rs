//! Invocation pipeline
//!
//! **Responsibilities:**
//! - Run the semantic search for an invocation
//! - Filter results to segments scoring at least `min_score`
//! - Validate each candidate and turn it into a [`ManifestationRequest`]
//! - Hand every request to the orchestrator, in rank order
//!
//! The search stage is an external collaborator behind [`SemanticSearch`].

use std::sync::Arc;

use hbk_common::config::SearchConfig;
use hbk_common::events::SEGMENTS_COLLECTION;
use hbk_common::{time, SpectralSignature};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::orchestrator::{ManifestationRequest, OrchestratorService};

/// Words skipped when building display descriptions
const STOP_WORDS: [&str; 4] = ["the", "and", "for", "with"];

/// Maximum display description length in characters
const DESCRIPTION_MAX_CHARS: usize = 50;

/// Stored segment metadata returned by search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentDocument {
    /// Record id in the metadata store, if it has one
    #[serde(default)]
    pub id: Option<String>,

    /// Audio file path relative to the audio root
    #[serde(default)]
    pub source_path: String,

    /// Text the embedding was computed from
    #[serde(default)]
    pub embedding_text: String,

    /// Relative segment bounds (0.0-1.0)
    #[serde(default)]
    pub start: Option<f64>,
    #[serde(default)]
    pub end: Option<f64>,

    /// Raw Bark-band energies as stored (unvalidated)
    #[serde(default)]
    pub bark_bands_raw: Option<Vec<f64>>,
}

/// One ranked search hit
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub collection: String,
    pub score: f64,
    pub document: SegmentDocument,
}

/// Semantic search over stored sounds
pub trait SemanticSearch: Send + Sync {
    /// Best `top_k` matches for `query`, highest score first
    fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchResult>>;
}

/// What an invocation produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationOutcome {
    /// Search returned nothing at all
    NoResonance,

    /// Search returned results but none were segments above `min_score`
    NoSegmentResonance,

    /// Candidates handed to the orchestrator
    Queued {
        /// Accepted by the orchestrator
        queued: usize,
        /// Dropped at validation or refused by the orchestrator
        rejected: usize,
    },
}

impl InvocationOutcome {
    /// Confirmation text sent back to the performer
    pub fn message(&self) -> String {
        match self {
            InvocationOutcome::NoResonance => "no resonance found".to_string(),
            InvocationOutcome::NoSegmentResonance => "no segment resonance found".to_string(),
            InvocationOutcome::Queued { queued, .. } => {
                format!("invoked: {} resonances queued", queued)
            }
        }
    }
}

pub struct InvocationPipeline {
    search: Arc<dyn SemanticSearch>,
    settings: SearchConfig,
    orchestrator: Arc<OrchestratorService>,
}

impl InvocationPipeline {
    pub fn new(
        search: Arc<dyn SemanticSearch>,
        settings: SearchConfig,
        orchestrator: Arc<OrchestratorService>,
    ) -> Self {
        Self {
            search,
            settings,
            orchestrator,
        }
    }

    /// Search for `incantation` and queue every qualifying segment
    pub fn invoke(&self, incantation: &str) -> Result<InvocationOutcome> {
        let incantation = incantation.trim();
        if incantation.is_empty() {
            return Err(Error::BadRequest("invoke requires incantation text".to_string()));
        }

        let invocation_id = Uuid::new_v4();
        info!("Invocation {}: '{}'", invocation_id, incantation);

        let results = self.search.search(incantation, self.settings.top_k)?;
        if results.is_empty() {
            return Ok(InvocationOutcome::NoResonance);
        }

        let segments: Vec<SearchResult> = results
            .into_iter()
            .filter(|r| r.collection == SEGMENTS_COLLECTION)
            .filter(|r| r.score >= self.settings.min_score)
            .collect();
        if segments.is_empty() {
            return Ok(InvocationOutcome::NoSegmentResonance);
        }

        let mut queued = 0;
        let mut rejected = 0;
        for (index, result) in segments.iter().enumerate() {
            let request = match build_request(invocation_id, index, result) {
                Ok(request) => request,
                Err(e) => {
                    warn!(
                        "Rejected candidate {} ({}): {}",
                        index, result.document.source_path, e
                    );
                    rejected += 1;
                    continue;
                }
            };

            if self.orchestrator.enqueue(request) {
                queued += 1;
            } else {
                rejected += 1;
            }
        }

        info!(
            "Invocation {} '{}' queued {} manifestations ({} rejected)",
            invocation_id, incantation, queued, rejected
        );
        Ok(InvocationOutcome::Queued { queued, rejected })
    }
}

/// Validate a search hit and build its manifestation request
///
/// A missing signature means "not analyzed" and is treated as silence. A
/// present but malformed one is rejected, as are bounds outside 0.0-1.0.
pub fn build_request(
    invocation_id: Uuid,
    index: usize,
    result: &SearchResult,
) -> Result<ManifestationRequest> {
    let document = &result.document;

    let signature = match &document.bark_bands_raw {
        Some(raw) => SpectralSignature::new(raw)?,
        None => SpectralSignature::zero(),
    };

    let start = document.start.unwrap_or(0.0);
    let end = document.end.unwrap_or(1.0);
    if !(0.0..=1.0).contains(&start) || !(0.0..=1.0).contains(&end) || start > end {
        return Err(Error::BadRequest(format!(
            "segment bounds must satisfy 0.0 <= start <= end <= 1.0 (got {}-{})",
            start, end
        )));
    }

    if !result.score.is_finite() {
        return Err(Error::BadRequest(format!("score is not finite ({})", result.score)));
    }

    let sound_id = document
        .id
        .clone()
        .or_else(|| (!document.source_path.is_empty()).then(|| document.source_path.clone()))
        .unwrap_or_else(|| "unknown".to_string());

    Ok(ManifestationRequest {
        index,
        invocation_id,
        collection: SEGMENTS_COLLECTION.to_string(),
        score: result.score,
        path: document.source_path.clone(),
        description: display_description(&document.embedding_text),
        start,
        end,
        parameters: "[]".to_string(),
        sound_id,
        signature,
        requested_at: time::now(),
    })
}

/// Short human-readable description from embedding text
///
/// First four meaningful words (longer than two characters, not a stop word)
/// among the first eight, lowercased, first letter capitalized, at most 50
/// characters. Falls back to the first 30 characters, then "untitled".
pub fn display_description(embedding_text: &str) -> String {
    if embedding_text.is_empty() {
        return "untitled".to_string();
    }

    let meaningful: Vec<String> = embedding_text
        .split_whitespace()
        .take(8)
        .map(|w| w.trim().to_lowercase())
        .filter(|w| w.chars().count() > 2 && !STOP_WORDS.contains(&w.as_str()))
        .take(4)
        .collect();

    if !meaningful.is_empty() {
        let joined = meaningful.join(" ");
        let mut chars = joined.chars();
        let capitalized = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
            None => String::new(),
        };
        return capitalized.chars().take(DESCRIPTION_MAX_CHARS).collect();
    }

    let fallback: String = embedding_text.chars().take(30).collect();
    let fallback = fallback.trim();
    if fallback.is_empty() {
        "untitled".to_string()
    } else {
        fallback.to_string()
    }
}
