//! Hibikidō server - Main entry point
//!
//! Reads line-delimited JSON commands on stdin and writes every outgoing
//! event (manifestations, niches, confirmations, errors, statistics) as
//! line-delimited JSON on stdout. Logs go to stderr.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use hbk_common::config::TomlConfig;
use hbk_common::events::{EventBus, HibikidoEvent};
use hbk_orchestrator::catalog::SegmentCatalog;
use hbk_orchestrator::commands::{CommandHandlers, Flow};
use hbk_orchestrator::invocation::InvocationPipeline;
use hbk_orchestrator::OrchestratorService;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdout};
use tokio::signal;
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for hibikido
#[derive(Parser, Debug)]
#[command(name = "hibikido")]
#[command(about = "Spectral admission control for live sound manifestation")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "HIBIKIDO_CONFIG")]
    config: Option<PathBuf>,

    /// JSON segment catalog (overrides config file)
    #[arg(long, env = "HIBIKIDO_CATALOG")]
    catalog: Option<PathBuf>,

    /// Similarity threshold 0.0-1.0 (overrides config file)
    #[arg(short, long)]
    threshold: Option<f64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = TomlConfig::load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;
    if let Some(threshold) = args.threshold {
        config.orchestrator.similarity_threshold = threshold;
    }
    if let Some(catalog) = args.catalog {
        config.catalog_path = Some(catalog);
    }
    config.validate().context("Invalid configuration")?;

    // Initialize tracing (stdout belongs to the transport)
    let level = &config.logging.level;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("hibikido={level},hbk_orchestrator={level},hbk_common={level}").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!(
        "Starting Hibikidō orchestrator (similarity threshold {:.2})",
        config.orchestrator.similarity_threshold
    );

    let search = match &config.catalog_path {
        Some(path) => SegmentCatalog::load(path)
            .with_context(|| format!("Failed to load catalog {}", path.display()))?,
        None => {
            warn!("No catalog configured; invocations will find nothing");
            SegmentCatalog::empty()
        }
    };

    let events = Arc::new(EventBus::new(config.orchestrator.event_capacity));
    let (output_tx, output_rx) = mpsc::unbounded_channel();
    let transport = tokio::spawn(run_transport(output_rx, events.subscribe()));

    let orchestrator = Arc::new(OrchestratorService::new(
        config.orchestrator.similarity_threshold,
        output_tx,
    ));
    let pipeline = InvocationPipeline::new(
        Arc::new(search),
        config.search.clone(),
        orchestrator.clone(),
    );
    let handlers = CommandHandlers::new(pipeline, orchestrator, events.clone());

    events.emit_lossy(HibikidoEvent::confirm("hibikido_server_ready"));
    info!("Ready for commands on stdin");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line.context("Failed to read command")? {
                    Some(line) => {
                        if handlers.handle_line(&line) == Flow::Stop {
                            break;
                        }
                    }
                    None => {
                        info!("Input closed, shutting down");
                        break;
                    }
                }
            }
            _ = &mut shutdown => break,
        }
    }

    // Dropping every sender closes both channels; the transport drains and exits
    drop(handlers);
    drop(events);
    transport.await.context("Transport task failed")?;

    info!("Shutdown complete");
    Ok(())
}

/// Write each event as one JSON line on stdout
///
/// Orchestrator output is read first whenever both channels are ready, so
/// manifestations precede the confirmation of the command that caused them.
async fn run_transport(
    mut output: mpsc::UnboundedReceiver<HibikidoEvent>,
    mut replies: broadcast::Receiver<HibikidoEvent>,
) {
    let mut stdout = tokio::io::stdout();
    loop {
        let event = tokio::select! {
            biased;
            Some(event) = output.recv() => event,
            reply = replies.recv() => match reply {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Transport lagged, {} replies dropped", skipped);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        };
        if !write_event(&mut stdout, &event).await {
            return;
        }
    }

    // Replies are closed; flush any orchestrator output still buffered
    while let Some(event) = output.recv().await {
        if !write_event(&mut stdout, &event).await {
            return;
        }
    }
}

/// Returns false once stdout is unusable
async fn write_event(stdout: &mut Stdout, event: &HibikidoEvent) -> bool {
    let mut line = match serde_json::to_string(event) {
        Ok(line) => line,
        Err(e) => {
            error!("Failed to serialize {} event: {}", event.address(), e);
            return true;
        }
    };
    line.push('\n');
    if let Err(e) = stdout.write_all(line.as_bytes()).await {
        error!("Failed to write event: {}", e);
        return false;
    }
    if let Err(e) = stdout.flush().await {
        error!("Failed to flush event: {}", e);
        return false;
    }
    true
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
