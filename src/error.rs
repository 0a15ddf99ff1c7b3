//! Error types for the bridge daemon

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Failed to communicate with mod-host: {0}")]
    EngineUnreachable(String),

    #[error("mod-host returned error code: {0}")]
    Engine(i32),

    #[error("Failed to parse mod-host response: {0:?}")]
    EngineProtocol(String),

    #[error("Plugin not found: {0}")]
    PluginNotFound(String),

    #[error("Plugin instance not found: {0}")]
    InstanceNotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("Plugin discovery error: {0}")]
    Adapter(String),

    #[error("Audio system error: {0}")]
    Audio(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BridgeError::Engine(-3);
        assert_eq!(err.to_string(), "mod-host returned error code: -3");

        let err = BridgeError::PluginNotFound("urn:example:verb".into());
        assert!(err.to_string().contains("urn:example:verb"));

        let err = BridgeError::EngineUnreachable("connection refused".into());
        assert!(err.to_string().contains("connection refused"));
    }
}
