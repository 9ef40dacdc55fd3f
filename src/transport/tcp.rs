//! TCP socket link to the sensor hub (Wi-Fi deployment mode).
//!
//! The hub's network firmware exposes the same line protocol over a plain
//! TCP socket on the local network; the operator supplies the address.

use crate::error::{MonitorError, MonitorResult};
use crate::transport::{LineFramer, Transport};
use async_trait::async_trait;
use log::debug;
use std::collections::VecDeque;
use tokio::net::TcpStream;

/// TCP transport strategy.
pub struct TcpLink {
    /// Hub host address.
    host: String,

    /// Hub listening port.
    port: u16,

    /// The open socket, when connected.
    stream: Option<TcpStream>,

    framer: LineFramer,
    queued: VecDeque<String>,
}

impl TcpLink {
    /// Create a TCP link to `host:port`. No I/O happens until
    /// [`Transport::connect`].
    pub fn new(host: String, port: u16) -> Self {
        Self {
            host,
            port,
            stream: None,
            framer: LineFramer::new(),
            queued: VecDeque::new(),
        }
    }

    fn target(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[async_trait]
impl Transport for TcpLink {
    async fn connect(&mut self) -> MonitorResult<()> {
        let target = self.target();
        let stream = TcpStream::connect(&target).await.map_err(|err| {
            MonitorError::TransportOpen {
                kind: "tcp",
                target: target.clone(),
                reason: err.to_string(),
            }
        })?;

        self.stream = Some(stream);
        debug!("tcp link to {} established", target);
        Ok(())
    }

    async fn read_line(&mut self) -> MonitorResult<Option<String>> {
        let stream = self.stream.as_mut().ok_or(MonitorError::NotConnected)?;
        crate::transport::next_framed_line(stream, &mut self.framer, &mut self.queued)
            .await
            .map_err(|err| MonitorError::TransportRead(err.to_string()))
    }

    async fn disconnect(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            use tokio::io::AsyncWriteExt;
            // A half-closed or already-broken socket fails shutdown; teardown
            // swallows it
            if let Err(err) = stream.shutdown().await {
                debug!("tcp shutdown error ignored: {}", err);
            }
            debug!("tcp link to {} closed", self.target());
        }
        self.framer.clear();
        self.queued.clear();
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn kind(&self) -> &'static str {
        "tcp"
    }

    fn info(&self) -> String {
        format!("tcp {}", self.target())
    }
}
