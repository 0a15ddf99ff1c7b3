//! Daemon configuration read from environment variables.
//!
//! Every variable is optional; defaults match a local mod-host with the
//! stock port layout.

use crate::error::{BridgeError, Result};

pub const DEFAULT_MOD_HOST_HOST: &str = "127.0.0.1";
pub const DEFAULT_MOD_HOST_PORT: u16 = 5555;
pub const DEFAULT_MOD_HOST_FEEDBACK_PORT: u16 = 5556;
pub const DEFAULT_REP_ENDPOINT: &str = "tcp://127.0.0.1:6000";
pub const DEFAULT_PUB_ENDPOINT: &str = "tcp://127.0.0.1:6001";
pub const DEFAULT_HEALTH_ENDPOINT: &str = "tcp://127.0.0.1:6002";

/// Resolved daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// mod-host hostname or IPv4 address.
    pub engine_host: String,
    /// mod-host command port (request/reply).
    pub engine_port: u16,
    /// mod-host feedback port (push only).
    pub engine_feedback_port: u16,
    /// Bus reply endpoint for commands.
    pub rep_endpoint: String,
    /// Bus publish endpoint for events.
    pub pub_endpoint: String,
    /// Bus reply endpoint for health probes.
    pub health_endpoint: String,
}

impl Config {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through a variable lookup function.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            engine_host: lookup("MOD_HOST_HOST").unwrap_or_else(|| DEFAULT_MOD_HOST_HOST.into()),
            engine_port: parse_port(&lookup, "MOD_HOST_PORT", DEFAULT_MOD_HOST_PORT)?,
            engine_feedback_port: parse_port(
                &lookup,
                "MOD_HOST_FEEDBACK_PORT",
                DEFAULT_MOD_HOST_FEEDBACK_PORT,
            )?,
            rep_endpoint: lookup("MODHOST_BRIDGE_REP").unwrap_or_else(|| DEFAULT_REP_ENDPOINT.into()),
            pub_endpoint: lookup("MODHOST_BRIDGE_PUB").unwrap_or_else(|| DEFAULT_PUB_ENDPOINT.into()),
            health_endpoint: lookup("MODHOST_BRIDGE_HEALTH")
                .unwrap_or_else(|| DEFAULT_HEALTH_ENDPOINT.into()),
        })
    }
}

fn parse_port<F>(lookup: &F, key: &str, default: u16) -> Result<u16>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .parse::<u16>()
            .map_err(|_| BridgeError::Config(format!("{key} must be a port number, got {raw:?}"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config.engine_host, "127.0.0.1");
        assert_eq!(config.engine_port, 5555);
        assert_eq!(config.engine_feedback_port, 5556);
        assert_eq!(config.rep_endpoint, "tcp://127.0.0.1:6000");
        assert_eq!(config.pub_endpoint, "tcp://127.0.0.1:6001");
        assert_eq!(config.health_endpoint, "tcp://127.0.0.1:6002");
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(|key| match key {
            "MOD_HOST_HOST" => Some("10.0.0.7".into()),
            "MOD_HOST_PORT" => Some("7777".into()),
            "MODHOST_BRIDGE_PUB" => Some("tcp://0.0.0.0:9001".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.engine_host, "10.0.0.7");
        assert_eq!(config.engine_port, 7777);
        assert_eq!(config.engine_feedback_port, 5556);
        assert_eq!(config.pub_endpoint, "tcp://0.0.0.0:9001");
    }

    #[test]
    fn test_bad_port_is_rejected() {
        let result = Config::from_lookup(|key| match key {
            "MOD_HOST_PORT" => Some("not-a-port".into()),
            _ => None,
        });
        assert!(matches!(result, Err(BridgeError::Config(_))));
    }
}
