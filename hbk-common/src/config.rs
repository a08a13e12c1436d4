//! Configuration loading
//!
//! Bootstrap configuration comes from a single TOML file. Every field has a
//! built-in default, so a missing file is a warning, not a failure.
//!
//! Config file resolution order:
//! 1. Explicit path (command-line argument or environment variable)
//! 2. `<config_dir>/hibikido/config.toml` if it exists
//! 3. Built-in defaults

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Admission control settings
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    /// Invocation search settings
    #[serde(default)]
    pub search: SearchConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// JSON segment catalog used as the search backend (optional)
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,
}

/// Orchestrator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Maximum cosine similarity to the ecosystem a candidate may have
    /// and still be admitted (inclusive). 0.5 = 50%.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,

    /// Event bus buffer size
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

/// Search settings applied by the invocation pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Number of ranked results requested from the search backend
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Results scoring below this are discarded
    #[serde(default = "default_min_score")]
    pub min_score: f64,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_similarity_threshold() -> f64 {
    0.5
}

fn default_event_capacity() -> usize {
    256
}

fn default_top_k() -> usize {
    10
}

fn default_min_score() -> f64 {
    0.3
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            min_score: default_min_score(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl TomlConfig {
    /// Parse configuration from TOML text and validate it
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load configuration, falling back to defaults when no file exists
    ///
    /// A missing file logs a warning and yields defaults. A file that exists
    /// but does not parse or validate is an error.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match default_config_path() {
                Some(path) if path.exists() => path,
                _ => {
                    info!("No config file found, using built-in defaults");
                    return Ok(Self::default());
                }
            },
        };

        if !path.exists() {
            warn!(
                "Config file not found: {}, using built-in defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        info!("Loading config from {}", path.display());
        Self::load(&path)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        let threshold = self.orchestrator.similarity_threshold;
        if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
            return Err(Error::Config(format!(
                "orchestrator.similarity_threshold must be within 0.0-1.0, got {}",
                threshold
            )));
        }
        if self.orchestrator.event_capacity == 0 {
            return Err(Error::Config(
                "orchestrator.event_capacity must be greater than 0".to_string(),
            ));
        }
        if self.search.top_k == 0 {
            return Err(Error::Config("search.top_k must be greater than 0".to_string()));
        }
        if !self.search.min_score.is_finite() {
            return Err(Error::Config(format!(
                "search.min_score must be finite, got {}",
                self.search.min_score
            )));
        }
        Ok(())
    }
}

/// Platform config file location: `<config_dir>/hibikido/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("hibikido").join("config.toml"))
}
