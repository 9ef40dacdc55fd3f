//! Link transports to the sensor hub.
//!
//! Two deployment modes talk to the same hub firmware: a USB-serial cable
//! and a local-network TCP socket. Both are hidden behind the [`Transport`]
//! trait so the monitor core never knows which one is in use; a mock
//! implementation backs the tests and the `simulate` CLI mode.
//!
//! All strategies share [`LineFramer`] for decoding: byte chunks go in,
//! complete text lines come out, with a partial trailing line buffered
//! across reads and both `\r\n` and `\n` accepted as terminators.

pub mod mock;
pub mod serial;
pub mod tcp;

use crate::error::MonitorResult;
use async_trait::async_trait;
use bytes::BytesMut;
use std::collections::VecDeque;
use tokio::io::{AsyncRead, AsyncReadExt};

pub use mock::{MockLink, SimulatedHub};
pub use serial::SerialLink;
pub use tcp::TcpLink;

/// Read chunk size for the framed-line helpers.
const READ_CHUNK: usize = 256;

/// A line-oriented link to the sensor hub.
#[async_trait]
pub trait Transport: Send {
    /// Open the link. On failure the transport stays disconnected and sensor
    /// state is untouched.
    async fn connect(&mut self) -> MonitorResult<()>;

    /// Next decoded line, without its terminator. `Ok(None)` means the peer
    /// ended the stream. Pends indefinitely on a stalled link; only
    /// cancellation or [`disconnect`](Self::disconnect) ends the wait.
    async fn read_line(&mut self) -> MonitorResult<Option<String>>;

    /// Tear the link down. Always succeeds from the caller's point of view;
    /// transport-level errors during close are logged and swallowed. Safe to
    /// call when never connected.
    async fn disconnect(&mut self);

    /// Whether the link is currently open.
    fn is_connected(&self) -> bool;

    /// Transport strategy name ("serial", "tcp", "mock").
    fn kind(&self) -> &'static str;

    /// Human-readable link description for logs.
    fn info(&self) -> String;
}

/// Splits a byte stream into text lines.
///
/// Lines end at `\n`; an immediately preceding `\r` is stripped. Bytes after
/// the last terminator stay buffered until the next chunk completes them.
/// Decoding is lossy: invalid UTF-8 never kills the session, the parser
/// drops the garbled line downstream.
#[derive(Debug, Default)]
pub struct LineFramer {
    buffer: BytesMut,
}

impl LineFramer {
    /// An empty framer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk; returns every line completed by it, oldest first.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let mut line = self.buffer.split_to(pos + 1);
            line.truncate(pos);
            if line.last() == Some(&b'\r') {
                line.truncate(line.len() - 1);
            }
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        lines
    }

    /// Bytes buffered for a not-yet-terminated line.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Drop any buffered partial line.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

/// Shared read loop for byte-stream transports: drain `queued`, otherwise
/// read chunks through the framer until a complete line or EOF arrives.
pub(crate) async fn next_framed_line<R>(
    reader: &mut R,
    framer: &mut LineFramer,
    queued: &mut VecDeque<String>,
) -> std::io::Result<Option<String>>
where
    R: AsyncRead + Unpin + Send,
{
    if let Some(line) = queued.pop_front() {
        return Ok(Some(line));
    }

    let mut chunk = [0u8; READ_CHUNK];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Ok(None);
        }
        let mut lines = framer.push(&chunk[..n]).into_iter();
        if let Some(first) = lines.next() {
            queued.extend(lines);
            return Ok(Some(first));
        }
    }
}
