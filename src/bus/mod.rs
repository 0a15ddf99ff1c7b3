//! Message bus transport.
//!
//! The bus is plain TCP with newline-delimited JSON framing. Reply
//! endpoints answer one JSON response per request line; the publish
//! endpoint broadcasts event lines to every connected subscriber.

mod publish;
mod reply;

pub use publish::EventPublisher;
pub use reply::{ReplyServer, RequestHandler};

use crate::error::{BridgeError, Result};
use std::net::SocketAddr;

/// Parse a `tcp://host:port` endpoint string into a socket address.
pub fn parse_endpoint(endpoint: &str) -> Result<SocketAddr> {
    let rest = endpoint
        .strip_prefix("tcp://")
        .ok_or_else(|| BridgeError::Config(format!("unsupported endpoint scheme: {endpoint}")))?;
    rest.parse()
        .map_err(|_| BridgeError::Config(format!("invalid endpoint address: {endpoint}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_endpoint() {
        let addr = parse_endpoint("tcp://127.0.0.1:6000").unwrap();
        assert_eq!(addr.port(), 6000);
        assert!(addr.ip().is_loopback());

        let addr = parse_endpoint("tcp://0.0.0.0:0").unwrap();
        assert_eq!(addr.port(), 0);
    }

    #[test]
    fn test_parse_endpoint_rejects_bad_input() {
        assert!(parse_endpoint("ipc:///tmp/bridge").is_err());
        assert!(parse_endpoint("tcp://nowhere").is_err());
        assert!(parse_endpoint("127.0.0.1:6000").is_err());
    }
}
