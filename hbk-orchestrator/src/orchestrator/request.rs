//! Manifestation requests and niches

use chrono::{DateTime, Utc};
use hbk_common::events::Manifestation;
use hbk_common::SpectralSignature;
use uuid::Uuid;

/// A ranked candidate waiting for admission
///
/// Built by the invocation pipeline once a search result passes the score
/// and collection filters. Owned by the orchestrator queue until admitted.
/// Never mutated after creation.
#[derive(Debug, Clone)]
pub struct ManifestationRequest {
    /// Rank position within its invocation
    pub index: usize,

    /// Invocation this candidate came from (log correlation only)
    pub invocation_id: Uuid,

    /// Source collection tag
    pub collection: String,

    /// Search score
    pub score: f64,

    /// Clip path relative to the audio root
    pub path: String,

    /// Display description (at most 50 characters)
    pub description: String,

    /// Relative start/end within the source (0.0-1.0)
    pub start: f64,
    pub end: f64,

    /// Opaque parameter payload
    pub parameters: String,

    /// Stable identifier of the underlying sound
    pub sound_id: String,

    /// Validated Bark-band signature
    pub signature: SpectralSignature,

    /// When the request arrived at the orchestrator
    pub requested_at: DateTime<Utc>,
}

impl ManifestationRequest {
    /// Transport payload for this request under an assigned id
    pub fn to_manifestation(&self, manifestation_id: &str) -> Manifestation {
        Manifestation {
            manifestation_id: manifestation_id.to_string(),
            collection: self.collection.clone(),
            score: self.score,
            path: self.path.clone(),
            description: self.description.clone(),
            start: self.start,
            end: self.end,
            parameters: self.parameters.clone(),
        }
    }
}

/// Perceptual space occupied by an admitted manifestation
///
/// Lives from admission until an explicit free of its id.
#[derive(Debug, Clone)]
pub struct Niche {
    pub manifestation_id: String,
    pub sound_id: String,
    pub signature: SpectralSignature,
    pub admitted_at: DateTime<Utc>,
}
