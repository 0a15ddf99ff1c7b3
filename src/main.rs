//! Daemon entry point: logging, configuration, run loop, exit code.

use modhost_bridge::Config;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Fatal error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("Starting modhost-bridge");
    info!(
        "mod-host: {}:{} (command), {}:{} (feedback)",
        config.engine_host, config.engine_port, config.engine_host, config.engine_feedback_port
    );
    info!(
        "Bus: {} (REP), {} (PUB), {} (health)",
        config.rep_endpoint, config.pub_endpoint, config.health_endpoint
    );

    match modhost_bridge::run(config).await {
        Ok(()) => {
            info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Fatal error: {}", e);
            ExitCode::FAILURE
        }
    }
}
