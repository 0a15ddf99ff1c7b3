//! # modhost-bridge
//!
//! Bridge daemon that fronts a running mod-host process and exposes it to
//! local clients as a structured JSON surface over a TCP message bus.
//!
//! The bridge translates between mod-host's NUL-delimited text protocol
//! (one request/reply command port, one push-only feedback port) and three
//! bus endpoints:
//!
//! - a **command** reply endpoint routing plugin, audio and raw engine
//!   requests,
//! - a **health** reply endpoint answering liveness probes,
//! - an **event** publish endpoint fanning out engine feedback and plugin
//!   lifecycle events.
//!
//! It also owns the canonical view of loaded plugin instances (the
//! [`plugins::PluginRegistry`]) and keeps the catalog fresh through a
//! bundle monitor.

pub mod audio;
pub mod bus;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod events;
pub mod health;
pub mod plugins;
pub mod types;

pub use config::Config;
pub use error::{BridgeError, Result};

use crate::audio::{AudioSystem, EngineAudio};
use crate::bus::{EventPublisher, ReplyServer};
use crate::dispatch::{CommandHandler, HealthHandler};
use crate::engine::{EngineClient, FeedbackReader};
use crate::health::HealthState;
use crate::plugins::{monitor::default_bundle_directories, BundleMonitor, NullDiscovery, PluginDiscovery, PluginRegistry};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Delay between startup probes of the engine ports.
const CONNECTION_RETRY_DELAY: Duration = Duration::from_secs(1);
/// Per-probe connect timeout.
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Run the bridge until a shutdown signal arrives.
///
/// Startup order: health endpoint first (so liveness probes answer while
/// the engine is still down), then wait for both engine ports, then the
/// publisher, registry, bundle monitor, audio adapter, feedback reader and
/// finally the command endpoint. Teardown happens in reverse.
pub async fn run(config: Config) -> Result<()> {
    let shutdown = CancellationToken::new();
    spawn_signal_listener(shutdown.clone());

    let health = Arc::new(HealthState::new());

    let health_server = ReplyServer::bind(&config.health_endpoint, "health").await?;
    let health_task = health_server.spawn(
        Arc::new(HealthHandler::new(health.clone())),
        shutdown.clone(),
    );

    if !wait_for_engine(&config, &health, &shutdown).await {
        error!("Shutdown requested while waiting for mod-host");
        shutdown.cancel();
        let _ = health_task.await;
        return Err(BridgeError::EngineUnreachable(
            "shutdown requested while waiting for mod-host".into(),
        ));
    }

    let publisher = EventPublisher::new();
    publisher.bind(&config.pub_endpoint, &shutdown).await?;

    let engine = EngineClient::new(config.engine_host.clone(), config.engine_port, health.clone());

    let discovery: Arc<dyn PluginDiscovery> = Arc::new(NullDiscovery::new());
    let registry = Arc::new(PluginRegistry::new(
        engine.clone(),
        discovery,
        publisher.clone(),
    ));
    registry.initialize().await?;

    let monitor_task = BundleMonitor::new(registry.clone(), default_bundle_directories())
        .spawn(shutdown.clone());

    let audio: Arc<dyn AudioSystem> = Arc::new(EngineAudio::new(engine.clone()));
    audio.init().await;

    let feedback_task = FeedbackReader::new(
        config.engine_host.clone(),
        config.engine_feedback_port,
        health.clone(),
        publisher.clone(),
    )
    .spawn(shutdown.clone());

    let command_server = ReplyServer::bind(&config.rep_endpoint, "command").await?;
    let command_task = command_server.spawn(
        Arc::new(CommandHandler::new(registry.clone(), audio.clone(), engine)),
        shutdown.clone(),
    );

    info!("All services started successfully");

    shutdown.cancelled().await;
    info!("Shutting down services...");

    let _ = command_task.await;
    let _ = feedback_task.await;
    audio.close().await;
    let _ = monitor_task.await;
    registry.shutdown().await;
    let _ = health_task.await;

    Ok(())
}

/// Block until both engine ports accept connections, or shutdown is
/// requested (returns false). Health flags track every probe result.
async fn wait_for_engine(
    config: &Config,
    health: &Arc<HealthState>,
    shutdown: &CancellationToken,
) -> bool {
    info!(
        "Waiting for mod-host at {}:{} (command) and {}:{} (feedback)",
        config.engine_host, config.engine_port, config.engine_host, config.engine_feedback_port
    );

    while !shutdown.is_cancelled() {
        if probe_port(&config.engine_host, config.engine_port).await {
            info!(
                "Connected to mod-host command port {}:{}",
                config.engine_host, config.engine_port
            );
            health.mark_command(true);

            if probe_port(&config.engine_host, config.engine_feedback_port).await {
                info!(
                    "Connected to mod-host feedback port {}:{}",
                    config.engine_host, config.engine_feedback_port
                );
                health.mark_feedback(true);
                return true;
            }
            warn!(
                "Cannot connect to mod-host feedback port {}:{}",
                config.engine_host, config.engine_feedback_port
            );
            health.mark_feedback(false);
        } else {
            warn!(
                "Cannot connect to mod-host command port {}:{}",
                config.engine_host, config.engine_port
            );
            health.mark_command(false);
            health.mark_feedback(false);
        }

        tokio::select! {
            _ = tokio::time::sleep(CONNECTION_RETRY_DELAY) => {}
            _ = shutdown.cancelled() => {}
        }
    }
    false
}

async fn probe_port(host: &str, port: u16) -> bool {
    match engine::resolve_engine_addr(host, port).await {
        Ok(addr) => matches!(
            timeout(CONNECTION_TIMEOUT, TcpStream::connect(addr)).await,
            Ok(Ok(_))
        ),
        Err(_) => false,
    }
}

fn spawn_signal_listener(shutdown: CancellationToken) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            match signal(SignalKind::terminate()) {
                Ok(mut term) => {
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => info!("Received SIGINT, initiating shutdown..."),
                        _ = term.recv() => info!("Received SIGTERM, initiating shutdown..."),
                    }
                }
                Err(e) => {
                    error!("Failed to install SIGTERM handler: {}", e);
                    let _ = tokio::signal::ctrl_c().await;
                    info!("Received SIGINT, initiating shutdown...");
                }
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
            info!("Received Ctrl-C, initiating shutdown...");
        }
        shutdown.cancel();
    });
}
