//! Health endpoint handler.

use crate::bus::RequestHandler;
use crate::health::HealthState;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

/// Answers `{"action": "health"}` with a health snapshot; anything else is
/// rejected. Served before the engine is reachable so external probes work
/// during startup.
pub struct HealthHandler {
    health: Arc<HealthState>,
}

impl HealthHandler {
    pub fn new(health: Arc<HealthState>) -> Self {
        Self { health }
    }
}

#[async_trait]
impl RequestHandler for HealthHandler {
    async fn handle(&self, request: Value) -> Value {
        if request.get("action").and_then(Value::as_str) == Some("health") {
            match serde_json::to_value(self.health.snapshot()) {
                Ok(snapshot) => snapshot,
                Err(_) => json!({"error": "Invalid health request format"}),
            }
        } else {
            json!({"error": "Invalid health request format"})
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_request() {
        let health = Arc::new(HealthState::new());
        health.mark_command(true);
        let handler = HealthHandler::new(health);

        let response = handler.handle(json!({"action": "health"})).await;
        assert_eq!(response["status"], "degraded");
        assert_eq!(response["command_connected"], true);
        assert_eq!(response["feedback_connected"], false);
        assert!(response["message"].as_str().unwrap().contains("degraded"));
    }

    #[tokio::test]
    async fn test_other_requests_rejected() {
        let handler = HealthHandler::new(Arc::new(HealthState::new()));

        let response = handler.handle(json!({"action": "status"})).await;
        assert_eq!(response["error"], "Invalid health request format");

        let response = handler.handle(json!({"command": "ping"})).await;
        assert_eq!(response["error"], "Invalid health request format");
    }
}
