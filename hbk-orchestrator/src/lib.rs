//! # Hibikidō Orchestrator Library (hbk-orchestrator)
//!
//! Admission control for live sound manifestation.
//!
//! **Purpose:** Take ranked audio candidates for a performer's invocation and
//! release them only when their Bark-band signature does not crowd the sounds
//! already playing; re-examine waiting candidates whenever a sound is freed.
//!
//! **Architecture:** invocation pipeline → orchestrator (mutex-guarded core)
//! → lossless output channel → transport; command replies reach the
//! transport through the event bus

pub mod catalog;
pub mod commands;
pub mod error;
pub mod invocation;
pub mod orchestrator;

pub use error::{Error, Result};
pub use orchestrator::{Orchestrator, OrchestratorService};
