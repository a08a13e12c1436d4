//! Manifestation payload and statistics types
//!
//! Supporting types carried by [`super::HibikidoEvent`].

use serde::{Deserialize, Serialize};

/// Collection tag sent with every manifestation in the current protocol
pub const SEGMENTS_COLLECTION: &str = "segments";

/// Admitted clip, as handed to the transport
///
/// Field order is the wire order of the `/manifest` message:
/// id, collection, score, path, description, start, end, parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifestation {
    /// Unique within the process lifetime; the handle for a later free
    pub manifestation_id: String,
    /// Source collection (always "segments" today)
    pub collection: String,
    /// Search score of the candidate
    pub score: f64,
    /// Clip path relative to the audio root
    pub path: String,
    /// Display description, at most 50 characters
    pub description: String,
    /// Relative start within the source (0.0-1.0)
    pub start: f64,
    /// Relative end within the source (0.0-1.0)
    pub end: f64,
    /// Opaque parameter payload (small serialized JSON)
    pub parameters: String,
}

/// Point-in-time orchestrator statistics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorStats {
    pub active_niches: usize,
    pub queued_requests: usize,
    pub similarity_threshold: f64,
}

impl std::fmt::Display for OrchestratorStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Orchestrator: {} active, {} queued (threshold {:.2})",
            self.active_niches, self.queued_requests, self.similarity_threshold
        )
    }
}
