//! cuelight - headless lighting engine
//!
//! Loads configuration and an optional show file, starts Art-Net output and
//! optionally runs a cue list until Ctrl+C / SIGTERM, then blacks out the rig.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use cuelight_common::LightingEvent;
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use cuelight_engine::{EngineConfig, LightingEngine, ShowData, ShowLibrary};

/// Command-line arguments for cuelight
#[derive(Parser, Debug)]
#[command(name = "cuelight")]
#[command(about = "Stage-lighting engine with Art-Net output and cue playback")]
#[command(version)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, env = "CUELIGHT_CONFIG")]
    config: Option<PathBuf>,

    /// Number of universes (overrides config)
    #[arg(short, long)]
    universes: Option<u16>,

    /// Transmitter refresh rate in Hz (overrides config)
    #[arg(long)]
    refresh_rate: Option<u32>,

    /// Run without opening a network socket
    #[arg(long)]
    simulate: bool,

    /// Art-Net destination, ip:port (overrides config)
    #[arg(long)]
    broadcast: Option<String>,

    /// JSON show file with fixtures, scenes and cue lists
    #[arg(short, long)]
    show: Option<PathBuf>,

    /// Cue list to start once the engine is running
    #[arg(short, long, requires = "show")]
    play: Option<Uuid>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing before the config is read so its messages are kept.
    // RUST_LOG wins; otherwise the configured level replaces "info" below.
    let env_filter = EnvFilter::try_from_default_env().ok();
    let from_env = env_filter.is_some();
    let (filter, filter_handle) =
        reload::Layer::new(env_filter.unwrap_or_else(|| EnvFilter::new("info")));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config =
        EngineConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(universes) = args.universes {
        config.universe_count = universes;
    }
    if let Some(rate) = args.refresh_rate {
        config.refresh_rate_hz = rate;
    }
    if args.simulate {
        config.artnet_enabled = false;
    }
    if let Some(broadcast) = args.broadcast {
        config.broadcast_address = broadcast;
    }

    if !from_env {
        apply_log_level(&filter_handle, &config.logging.level);
    }

    let config = config.validate().context("Invalid configuration")?;

    let show: Arc<dyn ShowData> = match &args.show {
        Some(path) => Arc::new(
            ShowLibrary::load_json(path)
                .with_context(|| format!("Failed to load show {}", path.display()))?,
        ),
        None => Arc::new(ShowLibrary::new()),
    };

    let engine = LightingEngine::new(config, show).context("Failed to initialize engine")?;
    engine.start();

    let mut events = engine.subscribe();
    let event_log = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(LightingEvent::CueProgress { .. }) => {}
                Ok(event) => debug!("{}: {:?}", event.event_type(), event),
                Err(RecvError::Lagged(skipped)) => warn!("Event log lagged by {} events", skipped),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let outcome = run_until(&engine, args.play, shutdown_signal()).await;
    event_log.abort();

    let stats = engine.transmitter_stats();
    info!(
        "Shutdown complete: {} frames sent, {} send errors",
        stats.frames_sent, stats.send_errors
    );
    outcome
}

/// Swap the active filter for `level`, keeping the current one if it does not parse
fn apply_log_level<S>(handle: &reload::Handle<EnvFilter, S>, level: &str) {
    match EnvFilter::try_new(level) {
        Ok(filter) => {
            if let Err(e) = handle.reload(filter) {
                warn!("Failed to apply log level '{}': {}", level, e);
            }
        }
        Err(e) => warn!("Invalid log level '{}': {}", level, e),
    }
}

/// Start the requested cue list and wait for `signal`, then shut the engine down
///
/// The engine is shut down (and the rig blacked out) even when the cue list
/// fails to start; that error is returned afterwards.
async fn run_until(
    engine: &LightingEngine,
    play: Option<Uuid>,
    signal: impl Future<Output = ()>,
) -> Result<()> {
    let started = match play {
        Some(cue_list_id) => engine
            .start_cue_list(cue_list_id, None)
            .with_context(|| format!("Failed to start cue list {}", cue_list_id)),
        None => Ok(()),
    };

    if started.is_ok() {
        signal.await;
    }

    engine.shutdown().await;
    started
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
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
