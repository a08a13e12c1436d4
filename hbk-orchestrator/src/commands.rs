//! Control commands
//!
//! Commands arrive as one JSON object per line, tagged by `command`:
//!
//! ```json
//! {"command": "invoke", "text": "distant thunder"}
//! {"command": "free", "manifestation_id": "12_1718000000000"}
//! {"command": "stats"}
//! {"command": "stop"}
//! ```
//!
//! Every command is answered on the event bus with `Confirm`, `Error` or
//! `StatsResult`. Manifestations it triggers go out on the orchestrator's own
//! output channel before the reply is sent.

use std::sync::Arc;

use hbk_common::events::{EventBus, HibikidoEvent};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::Error;
use crate::invocation::InvocationPipeline;
use crate::orchestrator::OrchestratorService;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// Search and queue matching sounds
    Invoke { text: String },

    /// Release a manifestation's niche
    Free { manifestation_id: String },

    /// Report orchestrator statistics
    Stats,

    /// Shut the server down
    Stop,
}

/// Whether the command loop keeps running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

pub struct CommandHandlers {
    pipeline: InvocationPipeline,
    orchestrator: Arc<OrchestratorService>,
    events: Arc<EventBus>,
}

impl CommandHandlers {
    pub fn new(
        pipeline: InvocationPipeline,
        orchestrator: Arc<OrchestratorService>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            pipeline,
            orchestrator,
            events,
        }
    }

    /// Parse and handle one input line
    ///
    /// Blank lines are ignored; unparseable ones are answered with an error.
    pub fn handle_line(&self, line: &str) -> Flow {
        let line = line.trim();
        if line.is_empty() {
            return Flow::Continue;
        }
        match serde_json::from_str::<Command>(line) {
            Ok(command) => self.handle(command),
            Err(e) => {
                self.send_error(format!("invalid command: {}", e));
                Flow::Continue
            }
        }
    }

    pub fn handle(&self, command: Command) -> Flow {
        match command {
            Command::Invoke { text } => self.handle_invoke(&text),
            Command::Free { manifestation_id } => self.handle_free(&manifestation_id),
            Command::Stats => self.handle_stats(),
            Command::Stop => {
                info!("Stop command received");
                self.send_confirm("stopping");
                return Flow::Stop;
            }
        }
        Flow::Continue
    }

    fn handle_invoke(&self, text: &str) {
        match self.pipeline.invoke(text) {
            Ok(outcome) => self.send_confirm(outcome.message()),
            Err(Error::BadRequest(message)) => self.send_error(message),
            Err(e) => {
                let message = format!("invocation failed: {}", e);
                error!("{}", message);
                self.send_error(message);
            }
        }
    }

    fn handle_free(&self, manifestation_id: &str) {
        match self.orchestrator.free(manifestation_id) {
            Ok(true) => {
                info!("Freed manifestation: {}", manifestation_id);
                self.send_confirm(format!("freed: {}", manifestation_id));
            }
            Ok(false) => {
                self.send_error(format!("manifestation not found: {}", manifestation_id));
            }
            Err(Error::BadRequest(message)) => self.send_error(message),
            Err(e) => {
                let message = format!("free failed: {}", e);
                error!("{}", message);
                self.send_error(message);
            }
        }
    }

    fn handle_stats(&self) {
        match self.orchestrator.stats() {
            Ok(stats) => {
                info!("Stats: {}", stats);
                self.send_confirm(stats.to_string());
                self.events.emit_lossy(HibikidoEvent::StatsResult(stats));
            }
            Err(e) => {
                let message = format!("stats failed: {}", e);
                error!("{}", message);
                self.send_error(message);
            }
        }
    }

    fn send_confirm(&self, message: impl Into<String>) {
        self.events.emit_lossy(HibikidoEvent::confirm(message));
    }

    fn send_error(&self, message: impl Into<String>) {
        self.events.emit_lossy(HibikidoEvent::error(message));
    }
}
