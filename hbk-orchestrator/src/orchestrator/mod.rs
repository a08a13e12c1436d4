//! Spectral admission control and queue management

pub mod core;
pub mod ecosystem;
pub mod queue;
pub mod request;
pub mod service;

pub use self::core::Orchestrator;
pub use ecosystem::Ecosystem;
pub use queue::ManifestationQueue;
pub use request::{ManifestationRequest, Niche};
pub use service::{OrchestratorOutput, OrchestratorService};
