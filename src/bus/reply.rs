//! Reply endpoint: one JSON response per JSON request line.

use super::parse_endpoint;
use crate::error::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Processes one decoded request into one response value.
///
/// Implementations must not panic; protocol-level failures are returned as
/// `{"error": ...}` objects.
#[async_trait]
pub trait RequestHandler: Send + Sync + 'static {
    async fn handle(&self, request: Value) -> Value;
}

/// A bound reply endpoint. Bind failures are fatal at startup.
pub struct ReplyServer {
    listener: TcpListener,
    name: &'static str,
}

impl ReplyServer {
    pub async fn bind(endpoint: &str, name: &'static str) -> Result<Self> {
        let addr = parse_endpoint(endpoint)?;
        let listener = TcpListener::bind(addr).await?;
        info!("{} REP bound to {}", name, endpoint);
        Ok(Self { listener, name })
    }

    /// Actual bound address (useful when the endpoint requested port 0).
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve connections until shutdown. In-flight requests finish before
    /// the connection tasks exit.
    pub fn spawn(self, handler: Arc<dyn RequestHandler>, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(handler, shutdown))
    }

    async fn run(self, handler: Arc<dyn RequestHandler>, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        debug!("{}: client connected from {}", self.name, peer);
                        let handler = handler.clone();
                        let shutdown = shutdown.clone();
                        let name = self.name;
                        tokio::spawn(serve_connection(stream, handler, shutdown, name));
                    }
                    Err(e) => {
                        error!("{}: accept failed: {}", self.name, e);
                        tokio::time::sleep(Duration::from_millis(500)).await;
                    }
                },
            }
        }
        debug!("{}: listener stopped", self.name);
    }
}

async fn serve_connection(
    stream: TcpStream,
    handler: Arc<dyn RequestHandler>,
    shutdown: CancellationToken,
    name: &'static str,
) {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    loop {
        let line = tokio::select! {
            _ = shutdown.cancelled() => break,
            line = lines.next_line() => line,
        };

        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!("{}: read error: {}", name, e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Value>(&line) {
            Ok(request) => handler.handle(request).await,
            Err(e) => {
                error!("{}: failed to parse request: {}", name, e);
                json!({"error": "Invalid request format"})
            }
        };

        let mut payload = response.to_string();
        payload.push('\n');
        if let Err(e) = writer.write_all(payload.as_bytes()).await {
            warn!("{}: failed to send response: {}", name, e);
            break;
        }
    }
}
