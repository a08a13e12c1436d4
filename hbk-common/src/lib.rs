//! # Hibikidō Common Library
//!
//! Shared code for the Hibikidō orchestrator and its collaborators:
//! - Spectral signature type and vector helpers
//! - Event types (HibikidoEvent enum) and the EventBus
//! - Configuration loading
//! - Timestamp utilities

pub mod config;
pub mod error;
pub mod events;
pub mod signature;
pub mod time;

pub use error::{Error, Result};
pub use signature::{SpectralSignature, BARK_BANDS};
