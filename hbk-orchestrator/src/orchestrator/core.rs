//! Admission control core
//!
//! **Responsibilities:**
//! - Own the active niches and the ecosystem cache
//! - Own the FIFO queue of pending manifestation requests
//! - Decide, per request, whether it may manifest now
//! - Record manifest/niche events in an outbox for the caller to dispatch
//!
//! This type does no locking and no I/O. [`super::OrchestratorService`]
//! wraps it in a mutex and dispatches the outbox after releasing the lock.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use hbk_common::events::{HibikidoEvent, OrchestratorStats};
use hbk_common::signature::cosine_similarity;
use hbk_common::{time, SpectralSignature};
use tracing::{debug, warn};

use super::ecosystem::Ecosystem;
use super::queue::ManifestationQueue;
use super::request::{ManifestationRequest, Niche};

/// Process-wide sequence for manifestation ids
///
/// Shared by every orchestrator instance so ids never repeat within a process.
static MANIFESTATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// `<sequence>_<epoch millis>`
fn next_manifestation_id() -> String {
    let seq = MANIFESTATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("{}_{}", seq, time::epoch_millis(time::now()))
}

pub struct Orchestrator {
    /// Maximum admissible cosine similarity to the ecosystem (inclusive)
    similarity_threshold: f64,

    /// Active niches in admission order
    niches: Vec<Niche>,

    /// Aggregate of `niches`, kept in step on every insert/remove
    ecosystem: Ecosystem,

    queue: ManifestationQueue,

    /// Events produced since the last drain
    outbox: Vec<HibikidoEvent>,
}

impl Orchestrator {
    pub fn new(similarity_threshold: f64) -> Self {
        debug!(
            "Orchestrator initialized: {:.2} similarity threshold",
            similarity_threshold
        );
        Self {
            similarity_threshold,
            niches: Vec::new(),
            ecosystem: Ecosystem::new(),
            queue: ManifestationQueue::new(),
            outbox: Vec::new(),
        }
    }

    /// Queue a request and run a processing pass
    ///
    /// Returns how many manifestations the triggered pass released (the new
    /// request or any older one).
    pub fn enqueue(&mut self, request: ManifestationRequest) -> usize {
        debug!(
            "Queued manifestation: {} (rank {}, score {:.3})",
            request.sound_id, request.index, request.score
        );
        self.queue.push(request);
        self.process_queue()
    }

    /// Free a niche by manifestation id
    ///
    /// Returns false if no active niche has that id. On success the
    /// ecosystem shrinks and the queue is re-examined immediately.
    pub fn free(&mut self, manifestation_id: &str) -> bool {
        let Some(position) = self
            .niches
            .iter()
            .position(|n| n.manifestation_id == manifestation_id)
        else {
            warn!("Manifestation not found for freeing: {}", manifestation_id);
            return false;
        };

        let niche = self.niches.remove(position);
        if self.niches.is_empty() {
            self.ecosystem.reset();
        } else {
            self.ecosystem.remove(&niche.signature);
        }

        debug!(
            "Freed manifestation: {} ({}, active {:.1}s, {} niches remain)",
            manifestation_id,
            niche.sound_id,
            time::seconds_since(niche.admitted_at),
            self.niches.len()
        );
        self.outbox.push(HibikidoEvent::NicheFreed {
            manifestation_id: niche.manifestation_id,
        });

        self.process_queue();
        true
    }

    /// Snapshot of counts and threshold
    pub fn stats(&self) -> OrchestratorStats {
        OrchestratorStats {
            active_niches: self.niches.len(),
            queued_requests: self.queue.len(),
            similarity_threshold: self.similarity_threshold,
        }
    }

    /// Take every event produced since the last call
    pub fn drain_events(&mut self) -> Vec<HibikidoEvent> {
        std::mem::take(&mut self.outbox)
    }

    /// Cosine similarity of a signature to the current ecosystem
    ///
    /// `None` when nothing is active (no conflict is possible against silence).
    pub fn similarity_to_ecosystem(&self, signature: &SpectralSignature) -> Option<f64> {
        if self.niches.is_empty() {
            return None;
        }
        Some(cosine_similarity(&signature.normalized(), self.ecosystem.norm()))
    }

    pub fn similarity_threshold(&self) -> f64 {
        self.similarity_threshold
    }

    pub fn niches(&self) -> &[Niche] {
        &self.niches
    }

    pub fn queued_requests(&self) -> impl Iterator<Item = &ManifestationRequest> {
        self.queue.iter()
    }

    pub fn ecosystem(&self) -> &Ecosystem {
        &self.ecosystem
    }

    /// Compare the incremental ecosystem against a full recompute
    pub fn verify_ecosystem(&self) -> bool {
        let expected = Ecosystem::from_signatures(self.niches.iter().map(|n| &n.signature));
        self.ecosystem.approx_eq(&expected)
    }

    /// Walk the queue once in FIFO order, admitting what fits
    ///
    /// Each admission updates the ecosystem before the next request is
    /// examined, so later requests in the same pass see earlier admissions.
    fn process_queue(&mut self) -> usize {
        if self.queue.is_empty() {
            return 0;
        }

        let pending = self.queue.take_pending();
        let mut remaining = VecDeque::with_capacity(pending.len());
        let mut sent = 0;

        for request in pending {
            if self.has_conflict(&request.signature) {
                remaining.push_back(request);
            } else {
                self.admit(request);
                sent += 1;
            }
        }

        self.queue.restore(remaining);

        if sent > 0 {
            debug!(
                "Processed queue: {} manifestations sent, {} still queued",
                sent,
                self.queue.len()
            );
        }
        sent
    }

    fn has_conflict(&self, signature: &SpectralSignature) -> bool {
        match self.similarity_to_ecosystem(signature) {
            // NaN counts as a conflict
            Some(similarity) => similarity.is_nan() || similarity > self.similarity_threshold,
            None => false,
        }
    }

    fn admit(&mut self, request: ManifestationRequest) {
        let manifestation_id = next_manifestation_id();
        debug_assert!(
            !self.niches.iter().any(|n| n.manifestation_id == manifestation_id),
            "duplicate manifestation id"
        );

        self.ecosystem.add(&request.signature);
        self.niches.push(Niche {
            manifestation_id: manifestation_id.clone(),
            sound_id: request.sound_id.clone(),
            signature: request.signature.clone(),
            admitted_at: time::now(),
        });

        debug!(
            "Manifested: {} [signature norm: {:.3}] (queued for {:.1}s)",
            manifestation_id,
            request.signature.norm(),
            time::seconds_since(request.requested_at)
        );

        self.outbox
            .push(HibikidoEvent::Manifest(request.to_manifestation(&manifestation_id)));
        self.outbox.push(HibikidoEvent::Niche {
            manifestation_id,
            bands: request.signature.bands().to_vec(),
        });
    }
}
