//! Shared orchestrator handle
//!
//! Serializes every mutating operation through one mutex so ecosystem updates
//! from concurrent commands never interleave. Events produced while the lock
//! is held are sent on the output channel only after it is released.
//!
//! The output channel is an unbounded mpsc: every `Manifest`, `Niche` and
//! `NicheFreed` reaches the transport, however large a released backlog is.
//! A transport that missed a manifestation id could never free its niche.

use std::sync::{Mutex, MutexGuard};

use hbk_common::events::{HibikidoEvent, OrchestratorStats};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use super::core::Orchestrator;
use super::request::ManifestationRequest;
use crate::error::{Error, Result};

/// Sending half of the orchestrator output channel
pub type OrchestratorOutput = mpsc::UnboundedSender<HibikidoEvent>;

pub struct OrchestratorService {
    inner: Mutex<Orchestrator>,
    output: OrchestratorOutput,
}

impl OrchestratorService {
    /// Create a service around a fresh orchestrator
    ///
    /// `output` receives every manifest, niche and free notification.
    pub fn new(similarity_threshold: f64, output: OrchestratorOutput) -> Self {
        Self {
            inner: Mutex::new(Orchestrator::new(similarity_threshold)),
            output,
        }
    }

    /// Queue a request for admission
    ///
    /// Returns false only if orchestrator state is unusable; the request is
    /// then dropped and not retried.
    pub fn enqueue(&self, request: ManifestationRequest) -> bool {
        let sound_id = request.sound_id.clone();
        let outcome = self.with_orchestrator(|orch| orch.enqueue(request));
        match outcome {
            Ok(sent) => {
                debug!("Enqueued {} ({} manifestations released)", sound_id, sent);
                true
            }
            Err(e) => {
                error!("Failed to queue manifestation {}: {}", sound_id, e);
                false
            }
        }
    }

    /// Free an active manifestation
    ///
    /// `Ok(false)` when the id is not active; an empty id is a bad request.
    pub fn free(&self, manifestation_id: &str) -> Result<bool> {
        let manifestation_id = manifestation_id.trim();
        if manifestation_id.is_empty() {
            return Err(Error::BadRequest("free requires manifestation_id".to_string()));
        }
        self.with_orchestrator(|orch| orch.free(manifestation_id))
    }

    /// Consistent point-in-time statistics
    pub fn stats(&self) -> Result<OrchestratorStats> {
        Ok(self.lock()?.stats())
    }

    /// Run a read-only closure against the orchestrator
    pub fn inspect<R>(&self, f: impl FnOnce(&Orchestrator) -> R) -> Result<R> {
        let orch = self.lock()?;
        Ok(f(&*orch))
    }

    /// Run a mutation, then dispatch its events outside the critical section
    fn with_orchestrator<R>(&self, f: impl FnOnce(&mut Orchestrator) -> R) -> Result<R> {
        let (result, events) = {
            let mut orch = self.lock()?;
            let result = f(&mut *orch);
            (result, orch.drain_events())
        };
        self.dispatch(events);
        Ok(result)
    }

    fn dispatch(&self, events: Vec<HibikidoEvent>) {
        for event in events {
            if let Err(e) = self.output.send(event) {
                warn!("Orchestrator output closed, {} event dropped", e.0.address());
            }
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Orchestrator>> {
        self.inner
            .lock()
            .map_err(|_| Error::InvalidState("orchestrator lock poisoned".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hbk_common::{time, SpectralSignature, BARK_BANDS};
    use std::sync::Arc;
    use uuid::Uuid;

    fn new_service(threshold: f64) -> (OrchestratorService, mpsc::UnboundedReceiver<HibikidoEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (OrchestratorService::new(threshold, tx), rx)
    }

    fn request(index: usize, band: usize) -> ManifestationRequest {
        let mut raw = vec![0.0; BARK_BANDS];
        raw[band] = 1.0;
        ManifestationRequest {
            index,
            invocation_id: Uuid::new_v4(),
            collection: "segments".to_string(),
            score: 0.6,
            path: format!("clip{}.wav", index),
            description: format!("Clip {}", index),
            start: 0.0,
            end: 1.0,
            parameters: "[]".to_string(),
            sound_id: format!("sound-{}", index),
            signature: SpectralSignature::new(&raw).unwrap(),
            requested_at: time::now(),
        }
    }

    #[tokio::test]
    async fn test_enqueue_dispatches_events() {
        let (service, mut rx) = new_service(0.5);

        assert!(service.enqueue(request(0, 0)));

        match rx.recv().await.unwrap() {
            HibikidoEvent::Manifest(m) => assert_eq!(m.path, "clip0.wav"),
            other => panic!("Expected Manifest, got {:?}", other),
        }
        assert!(matches!(rx.recv().await.unwrap(), HibikidoEvent::Niche { .. }));
    }

    #[test]
    fn test_free_rejects_empty_id() {
        let (service, _rx) = new_service(0.5);
        assert!(matches!(service.free("   "), Err(Error::BadRequest(_))));
        assert!(!service.free("nope").unwrap());
    }

    #[test]
    fn test_stats_snapshot() {
        let (service, _rx) = new_service(0.5);
        service.enqueue(request(0, 0));
        service.enqueue(request(1, 0));
        service.enqueue(request(2, 1));

        let stats = service.stats().unwrap();
        assert_eq!(stats.active_niches, 2);
        assert_eq!(stats.queued_requests, 1);
        assert_eq!(stats.similarity_threshold, 0.5);
    }

    #[test]
    fn test_concurrent_enqueue_keeps_ecosystem_consistent() {
        let (service, _rx) = new_service(0.3);
        let service = Arc::new(service);

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let service = service.clone();
                std::thread::spawn(move || {
                    for i in 0..20 {
                        assert!(service.enqueue(request(t * 100 + i, (t + i) % BARK_BANDS)));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let (consistent, total) = service
            .inspect(|orch| {
                let stats = orch.stats();
                (orch.verify_ecosystem(), stats.active_niches + stats.queued_requests)
            })
            .unwrap();
        assert!(consistent);
        assert_eq!(total, 160);
    }

    #[test]
    fn test_large_burst_delivers_every_event() {
        let (service, mut rx) = new_service(1.0);

        // Nothing is drained until every request has been admitted
        for i in 0..300 {
            assert!(service.enqueue(request(i, i % BARK_BANDS)));
        }

        let mut manifests = 0;
        let mut niches = 0;
        while let Ok(event) = rx.try_recv() {
            match event {
                HibikidoEvent::Manifest(_) => manifests += 1,
                HibikidoEvent::Niche { .. } => niches += 1,
                other => panic!("Unexpected event {:?}", other),
            }
        }
        assert_eq!(service.stats().unwrap().active_niches, 300);
        assert_eq!(manifests, 300);
        assert_eq!(niches, 300);
    }

    #[test]
    fn test_closed_output_does_not_block_admission() {
        let (service, rx) = new_service(0.5);
        drop(rx);
        assert!(service.enqueue(request(0, 0)));
        assert_eq!(service.stats().unwrap().active_niches, 1);
    }

    #[test]
    fn test_poisoned_lock_reports_invalid_state() {
        let (service, _rx) = new_service(0.5);

        let panicked = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = service.inspect(|_| panic!("fault while holding the orchestrator"));
        }));
        assert!(panicked.is_err());

        assert!(!service.enqueue(request(0, 0)));
        assert!(matches!(service.stats(), Err(Error::InvalidState(_))));
        assert!(matches!(service.free("1_1"), Err(Error::InvalidState(_))));
    }
}
