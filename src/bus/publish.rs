//! Publish endpoint: best-effort event fan-out to subscribers.
//!
//! All producers go through one broadcast channel, which linearizes event
//! order for every subscriber. Publishing never fails the caller; a send
//! with no subscribers is normal, and serialization failures are logged.

use super::parse_endpoint;
use crate::error::Result;
use crate::events::FeedbackEvent;
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Buffered events per subscriber before laggards start missing messages.
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Shared handle for publishing bus events. Cheap to clone.
#[derive(Clone)]
pub struct EventPublisher {
    tx: broadcast::Sender<String>,
}

impl EventPublisher {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Bind the publish endpoint and start accepting subscribers. Returns
    /// the bound address.
    pub async fn bind(
        &self,
        endpoint: &str,
        shutdown: &CancellationToken,
    ) -> Result<std::net::SocketAddr> {
        let addr = parse_endpoint(endpoint)?;
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        info!("Event PUB bound to {}", endpoint);

        let tx = self.tx.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    accepted = listener.accept() => match accepted {
                        Ok((stream, peer)) => {
                            debug!("Event subscriber connected from {}", peer);
                            tokio::spawn(forward_events(
                                stream,
                                tx.subscribe(),
                                shutdown.clone(),
                            ));
                        }
                        Err(e) => {
                            error!("Event PUB accept failed: {}", e);
                            tokio::time::sleep(Duration::from_millis(500)).await;
                        }
                    },
                }
            }
        });
        Ok(local_addr)
    }

    /// Subscribe to the raw event stream (one JSON document per entry).
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }

    /// Publish a feedback event in its flat wire-mirroring form.
    pub fn publish_feedback(&self, event: &FeedbackEvent) {
        self.publish_json(event);
    }

    /// Publish a bridge lifecycle event wrapped in the
    /// `{type, timestamp, data}` envelope.
    pub fn publish_lifecycle(&self, kind: &str, data: Value) {
        let envelope = json!({
            "type": kind,
            "timestamp": Utc::now().timestamp_millis(),
            "data": data,
        });
        self.send_line(envelope.to_string());
    }

    fn publish_json<T: Serialize>(&self, value: &T) {
        match serde_json::to_string(value) {
            Ok(line) => self.send_line(line),
            Err(e) => warn!("Failed to serialize event: {}", e),
        }
    }

    fn send_line(&self, line: String) {
        // Err just means nobody is subscribed right now.
        let _ = self.tx.send(line);
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}

async fn forward_events(
    mut stream: TcpStream,
    mut rx: broadcast::Receiver<String>,
    shutdown: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            _ = shutdown.cancelled() => break,
            event = rx.recv() => event,
        };
        match event {
            Ok(mut line) => {
                line.push('\n');
                if let Err(e) = stream.write_all(line.as_bytes()).await {
                    debug!("Event subscriber dropped: {}", e);
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Event subscriber lagged, skipped {} events", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lifecycle_envelope_shape() {
        let publisher = EventPublisher::new();
        let mut rx = publisher.subscribe();

        publisher.publish_lifecycle("plugin_loaded", json!({"instance_id": "plugin_0_ab"}));

        let line = rx.recv().await.unwrap();
        let value: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["type"], "plugin_loaded");
        assert!(value["timestamp"].is_i64());
        assert_eq!(value["data"]["instance_id"], "plugin_0_ab");
    }

    #[tokio::test]
    async fn test_feedback_events_are_flat() {
        let publisher = EventPublisher::new();
        let mut rx = publisher.subscribe();

        publisher.publish_feedback(&FeedbackEvent::CpuLoad {
            load: 12.5,
            max_load: 40.0,
            xruns: 2,
        });

        let line = rx.recv().await.unwrap();
        let value: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["type"], "cpu_load");
        assert_eq!(value["xruns"], 2);
        assert!(value.get("timestamp").is_none());
        assert!(value.get("data").is_none());
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_silent() {
        let publisher = EventPublisher::new();
        publisher.publish_lifecycle("plugins_rescanned", json!({"plugin_count": 0}));
    }
}
