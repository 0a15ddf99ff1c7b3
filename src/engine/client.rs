//! Request/reply client for the mod-host command port.
//!
//! mod-host treats each command as a one-shot exchange and closes the
//! connection after replying, so every `send` opens a fresh socket. The
//! connection is intentionally never pooled.

use super::resolve_engine_addr;
use crate::error::{BridgeError, Result};
use crate::health::HealthState;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

/// How long to wait for the engine's reply before giving up.
const RECV_TIMEOUT: Duration = Duration::from_secs(1);

/// Thread-safe command client; any task may call `send` concurrently since
/// each call owns its own socket.
#[derive(Clone)]
pub struct EngineClient {
    host: String,
    port: u16,
    health: Arc<HealthState>,
}

impl EngineClient {
    pub fn new(host: impl Into<String>, port: u16, health: Arc<HealthState>) -> Self {
        Self {
            host: host.into(),
            port,
            health,
        }
    }

    /// Send one NUL-terminated command and return the reply body with
    /// trailing NUL and whitespace stripped.
    ///
    /// Any network failure flips the health command flag to false; a
    /// completed exchange flips it to true.
    pub async fn send(&self, command: &str) -> Result<String> {
        debug!("-> mod-host: {}", command);
        match self.exchange(command).await {
            Ok(body) => {
                self.health.mark_command(true);
                debug!("<- mod-host: {}", body);
                Ok(body)
            }
            Err(e) => {
                self.health.mark_command(false);
                Err(BridgeError::EngineUnreachable(e.to_string()))
            }
        }
    }

    async fn exchange(&self, command: &str) -> io::Result<String> {
        let addr = resolve_engine_addr(&self.host, self.port).await?;
        let mut stream = TcpStream::connect(addr).await?;

        stream.write_all(command.as_bytes()).await?;
        stream.write_all(&[0]).await?;

        let mut body = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            match timeout(RECV_TIMEOUT, stream.read(&mut chunk)).await {
                Ok(Ok(0)) => break,
                Ok(Ok(n)) => {
                    body.extend_from_slice(&chunk[..n]);
                    // The reply is NUL-terminated and the engine closes
                    // right after; stop as soon as the terminator arrives.
                    if body.contains(&0) {
                        break;
                    }
                }
                Ok(Err(e)) => return Err(e),
                Err(_) => {
                    if body.is_empty() {
                        return Err(io::Error::new(
                            io::ErrorKind::TimedOut,
                            "timed out waiting for mod-host response",
                        ));
                    }
                    break;
                }
            }
        }

        if let Some(pos) = body.iter().position(|&b| b == 0) {
            body.truncate(pos);
        }
        Ok(String::from_utf8_lossy(&body).trim().to_string())
    }
}

/// Extract the status integer from a `resp <n>` reply body.
///
/// For `add`, a non-negative `n` is the confirmed engine instance number;
/// other commands only use the sign.
pub fn parse_resp(body: &str) -> Result<i32> {
    let rest = match body.find("resp ") {
        Some(pos) => &body[pos + 5..],
        None => body,
    };
    rest.split_whitespace()
        .next()
        .and_then(|token| token.parse::<i32>().ok())
        .ok_or_else(|| BridgeError::EngineProtocol(body.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_resp_success() {
        assert_eq!(parse_resp("resp 0").unwrap(), 0);
        assert_eq!(parse_resp("resp 42").unwrap(), 42);
        assert_eq!(parse_resp("resp -3").unwrap(), -3);
    }

    #[test]
    fn test_parse_resp_with_trailing_payload() {
        assert_eq!(parse_resp("resp 7 extra data").unwrap(), 7);
    }

    #[test]
    fn test_parse_resp_without_prefix() {
        // Some replies carry a bare integer body.
        assert_eq!(parse_resp("5").unwrap(), 5);
    }

    #[test]
    fn test_parse_resp_malformed() {
        assert!(parse_resp("resp").is_err());
        assert!(parse_resp("resp abc").is_err());
        assert!(parse_resp("").is_err());
        assert!(parse_resp("garbage").is_err());
    }
}
