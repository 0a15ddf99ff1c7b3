//! Long-lived consumer of the mod-host feedback port.
//!
//! Connects, splits the stream on NUL bytes, parses each record and
//! publishes the event on the bus. Reconnects forever with exponential
//! backoff; nothing on this path is fatal.

use super::parser::parse_feedback_line;
use super::resolve_engine_addr;
use crate::bus::EventPublisher;
use crate::health::HealthState;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// First reconnect delay; doubles on every failed attempt.
const MIN_BACKOFF: Duration = Duration::from_millis(100);
/// Backoff ceiling.
const MAX_BACKOFF: Duration = Duration::from_secs(5);

pub struct FeedbackReader {
    host: String,
    port: u16,
    health: Arc<HealthState>,
    publisher: EventPublisher,
}

impl FeedbackReader {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        health: Arc<HealthState>,
        publisher: EventPublisher,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            health,
            publisher,
        }
    }

    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    async fn run(self, shutdown: CancellationToken) {
        let mut delay = MIN_BACKOFF;

        while !shutdown.is_cancelled() {
            match self.connect().await {
                Ok(stream) => {
                    info!("Connected to mod-host feedback {}:{}", self.host, self.port);
                    self.health.mark_feedback(true);
                    delay = MIN_BACKOFF;

                    self.stream_records(stream, &shutdown).await;
                    self.health.mark_feedback(false);
                }
                Err(e) => {
                    debug!(
                        "Feedback connect to {}:{} failed: {}",
                        self.host, self.port, e
                    );
                    self.health.mark_feedback(false);
                }
            }

            if shutdown.is_cancelled() {
                break;
            }
            debug!("Feedback reader sleeping {:?} before reconnect", delay);
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.cancelled() => break,
            }
            delay = (delay * 2).min(MAX_BACKOFF);
        }
        debug!("Feedback reader stopped");
    }

    async fn connect(&self) -> std::io::Result<TcpStream> {
        let addr = resolve_engine_addr(&self.host, self.port).await?;
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        tune_keepalive(&stream);
        Ok(stream)
    }

    /// Consume records until the peer closes, an error occurs, or shutdown
    /// is requested.
    async fn stream_records(&self, mut stream: TcpStream, shutdown: &CancellationToken) {
        let mut record = Vec::new();
        let mut buf = [0u8; 4096];

        loop {
            let read = tokio::select! {
                _ = shutdown.cancelled() => return,
                read = stream.read(&mut buf) => read,
            };

            match read {
                Ok(0) => {
                    warn!("Feedback connection closed by peer");
                    return;
                }
                Ok(n) => {
                    for &byte in &buf[..n] {
                        if byte == 0 {
                            if !record.is_empty() {
                                let line = String::from_utf8_lossy(&record).into_owned();
                                let event = parse_feedback_line(&line);
                                self.publisher.publish_feedback(&event);
                                record.clear();
                            }
                        } else {
                            record.push(byte);
                        }
                    }
                }
                Err(e) => {
                    warn!("Feedback connection error: {}", e);
                    return;
                }
            }
        }
    }
}

/// Enable TCP keepalive with aggressive probing so a dead engine is
/// detected within ~30s even with no traffic.
#[cfg(unix)]
fn tune_keepalive(stream: &TcpStream) {
    use std::os::fd::AsRawFd;

    let fd = stream.as_raw_fd();
    let enable: libc::c_int = 1;
    unsafe {
        libc::setsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_KEEPALIVE,
            &enable as *const _ as *const libc::c_void,
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        );
    }

    #[cfg(target_os = "linux")]
    unsafe {
        let idle: libc::c_int = 10;
        let interval: libc::c_int = 5;
        let count: libc::c_int = 3;
        libc::setsockopt(
            fd,
            libc::IPPROTO_TCP,
            libc::TCP_KEEPIDLE,
            &idle as *const _ as *const libc::c_void,
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        );
        libc::setsockopt(
            fd,
            libc::IPPROTO_TCP,
            libc::TCP_KEEPINTVL,
            &interval as *const _ as *const libc::c_void,
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        );
        libc::setsockopt(
            fd,
            libc::IPPROTO_TCP,
            libc::TCP_KEEPCNT,
            &count as *const _ as *const libc::c_void,
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        );
    }
}

#[cfg(not(unix))]
fn tune_keepalive(_stream: &TcpStream) {}
