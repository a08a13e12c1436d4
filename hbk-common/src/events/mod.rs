//! Event types for the Hibikidō event system
//!
//! Provides the shared event definitions and the EventBus used to carry
//! command replies to the transport.

mod manifest_types;

pub use manifest_types::{Manifestation, OrchestratorStats, SEGMENTS_COLLECTION};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Hibikidō event types
///
/// Every message the server sends outward is one of these. Each serializes
/// to one JSON object per message, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum HibikidoEvent {
    /// A queued candidate passed admission and may be played
    ///
    /// Triggers:
    /// - Transport: send `/manifest` to the performer's instrument
    Manifest(Manifestation),

    /// A niche was occupied by a new manifestation
    ///
    /// Carries the raw band energies for ecosystem visualization.
    Niche {
        manifestation_id: String,
        bands: Vec<f64>,
    },

    /// A niche was released by an explicit free
    NicheFreed { manifestation_id: String },

    /// Human-readable acknowledgement of a command
    Confirm { message: String },

    /// Command failed; message describes why
    Error { message: String },

    /// Structured statistics reply
    StatsResult(OrchestratorStats),
}

impl HibikidoEvent {
    /// Convenience constructor for confirmations
    pub fn confirm(message: impl Into<String>) -> Self {
        HibikidoEvent::Confirm {
            message: message.into(),
        }
    }

    /// Convenience constructor for error replies
    pub fn error(message: impl Into<String>) -> Self {
        HibikidoEvent::Error {
            message: message.into(),
        }
    }

    /// Protocol address the transport uses for this event
    pub fn address(&self) -> &'static str {
        match self {
            HibikidoEvent::Manifest(_) => "/manifest",
            HibikidoEvent::Niche { .. } => "/niche",
            HibikidoEvent::NicheFreed { .. } => "/niche_freed",
            HibikidoEvent::Confirm { .. } => "/confirm",
            HibikidoEvent::Error { .. } => "/error",
            HibikidoEvent::StatsResult(_) => "/stats_result",
        }
    }
}

/// Central event distribution bus
///
/// Thin wrapper over `tokio::sync::broadcast` carrying command replies
/// (`Confirm`, `Error`, `StatsResult`) to any number of subscribers.
/// Sending never blocks, so it is safe to call from synchronous code.
///
/// Lossy under overload. Orchestrator output (`Manifest`, `Niche`,
/// `NicheFreed`) must not be dropped and travels on its own mpsc channel.
pub struct EventBus {
    tx: broadcast::Sender<HibikidoEvent>,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// Slow subscribers lose the oldest events once `capacity` is exceeded.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<HibikidoEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: HibikidoEvent) {
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eventbus_emit_no_subscribers() {
        let bus = EventBus::new(10);
        // Lossy send must not panic
        bus.emit_lossy(HibikidoEvent::confirm("hello"));
    }

    #[tokio::test]
    async fn test_eventbus_emit_with_subscriber() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();

        bus.emit_lossy(HibikidoEvent::error("boom"));

        match rx.recv().await.unwrap() {
            HibikidoEvent::Error { message } => assert_eq!(message, "boom"),
            other => panic!("Wrong event type received: {:?}", other),
        }
    }

    #[test]
    fn test_event_serialization_tagged() {
        let event = HibikidoEvent::NicheFreed {
            manifestation_id: "3_100".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"type":"NicheFreed","manifestation_id":"3_100"}"#);

        let stats = HibikidoEvent::StatsResult(OrchestratorStats {
            active_niches: 1,
            queued_requests: 0,
            similarity_threshold: 0.5,
        });
        let value: serde_json::Value = serde_json::to_value(&stats).unwrap();
        assert_eq!(value["type"], "StatsResult");
        assert_eq!(value["active_niches"], 1);
    }

    #[test]
    fn test_event_addresses() {
        assert_eq!(HibikidoEvent::confirm("x").address(), "/confirm");
        assert_eq!(HibikidoEvent::error("x").address(), "/error");
    }
}
