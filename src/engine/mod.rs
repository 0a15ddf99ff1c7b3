//! Engine-facing transport: the command client and the feedback stream.

mod client;
mod feedback;
pub mod parser;

pub use client::{parse_resp, EngineClient};
pub use feedback::FeedbackReader;

use std::io;
use std::net::SocketAddr;
use tokio::net;

/// Resolve an engine hostname, preferring IPv4. Falls back to parsing the
/// host as a literal IPv4 address when resolution fails.
pub(crate) async fn resolve_engine_addr(host: &str, port: u16) -> io::Result<SocketAddr> {
    if let Ok(addrs) = net::lookup_host((host, port)).await {
        let mut fallback = None;
        for addr in addrs {
            if addr.is_ipv4() {
                return Ok(addr);
            }
            fallback.get_or_insert(addr);
        }
        if let Some(addr) = fallback {
            return Ok(addr);
        }
    }

    host.parse::<std::net::Ipv4Addr>()
        .map(|ip| SocketAddr::from((ip, port)))
        .map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid mod-host address: {host}"),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_literal_ipv4() {
        let addr = resolve_engine_addr("127.0.0.1", 5555).await.unwrap();
        assert_eq!(addr.to_string(), "127.0.0.1:5555");
    }

    #[tokio::test]
    async fn test_resolve_localhost() {
        let addr = resolve_engine_addr("localhost", 5555).await.unwrap();
        assert_eq!(addr.port(), 5555);
        assert!(addr.ip().is_loopback());
    }

    #[tokio::test]
    async fn test_resolve_garbage_fails() {
        assert!(resolve_engine_addr("not an address", 5555).await.is_err());
    }
}
