//! Mock transports: scripted playback for tests, a free-running simulated
//! hub for demos.
//!
//! [`MockLink`] implements the [`Transport`] trait without hardware. It
//! provides scripted line playback, live line injection through a channel,
//! controllable connect-failure injection, and simulated latency.
//! [`SimulatedHub`] generates plausible raw-intensity traffic for the
//! `simulate` CLI mode, including occasional flare-ups.

use crate::error::{MonitorError, MonitorResult};
use crate::transport::Transport;
use async_trait::async_trait;
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::mpsc;

/// Hardware-free transport for tests.
///
/// # Example
///
/// ```
/// use flamewatch::transport::{MockLink, Transport};
///
/// # tokio_test::block_on(async {
/// let mut link = MockLink::scripted(["10,20,30"]);
/// link.connect().await.unwrap();
/// assert_eq!(link.read_line().await.unwrap().as_deref(), Some("10,20,30"));
/// assert_eq!(link.read_line().await.unwrap(), None);
/// # })
/// ```
pub struct MockLink {
    lines: VecDeque<String>,
    injected: Option<mpsc::UnboundedReceiver<String>>,
    connected: bool,
    fail_connect: bool,
    fail_after_script: bool,
    latency: Duration,
}

impl MockLink {
    /// A link that plays the given lines in order, then ends the stream.
    pub fn scripted<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            injected: None,
            connected: false,
            fail_connect: false,
            fail_after_script: false,
            latency: Duration::ZERO,
        }
    }

    /// A link that plays the given lines, then breaks mid-session instead of
    /// closing cleanly.
    pub fn scripted_then_error<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut link = Self::scripted(lines);
        link.fail_after_script = true;
        link
    }

    /// A link fed through a channel. The stream ends when the sender is
    /// dropped.
    pub fn channelled() -> (Self, mpsc::UnboundedSender<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let link = Self {
            lines: VecDeque::new(),
            injected: Some(rx),
            connected: false,
            fail_connect: false,
            fail_after_script: false,
            latency: Duration::ZERO,
        };
        (link, tx)
    }

    /// A link whose next connect attempt fails.
    pub fn failing() -> Self {
        let mut link = Self::scripted(Vec::<String>::new());
        link.fail_connect = true;
        link
    }

    /// Add simulated per-operation latency.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

#[async_trait]
impl Transport for MockLink {
    async fn connect(&mut self) -> MonitorResult<()> {
        if self.latency > Duration::ZERO {
            tokio::time::sleep(self.latency).await;
        }
        if self.fail_connect {
            self.fail_connect = false;
            return Err(MonitorError::TransportOpen {
                kind: "mock",
                target: "scripted".to_string(),
                reason: "injected connect failure".to_string(),
            });
        }
        self.connected = true;
        debug!("mock link connected");
        Ok(())
    }

    async fn read_line(&mut self) -> MonitorResult<Option<String>> {
        if !self.connected {
            return Err(MonitorError::NotConnected);
        }
        if self.latency > Duration::ZERO {
            tokio::time::sleep(self.latency).await;
        }
        if let Some(line) = self.lines.pop_front() {
            return Ok(Some(line));
        }
        if self.fail_after_script {
            return Err(MonitorError::TransportRead(
                "injected mid-session failure".to_string(),
            ));
        }
        match self.injected.as_mut() {
            Some(rx) => Ok(rx.recv().await),
            None => Ok(None),
        }
    }

    async fn disconnect(&mut self) {
        self.connected = false;
        debug!("mock link disconnected");
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn kind(&self) -> &'static str {
        "mock"
    }

    fn info(&self) -> String {
        format!("mock ({} scripted lines)", self.lines.len())
    }
}

/// Free-running traffic generator in the hub's raw-intensity grammar.
///
/// Emits one line per interval. Most readings idle in the safe band with
/// some drift into the nominal band; each line has a small chance of a
/// flare-up on a random sensor.
pub struct SimulatedHub {
    interval: Duration,
    flare_chance: f64,
    rng: StdRng,
    connected: bool,
}

impl SimulatedHub {
    /// Hub emitting one line per `interval`.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            flare_chance: 0.02,
            rng: StdRng::from_entropy(),
            connected: false,
        }
    }

    /// Override the per-line flare probability (0.0 disables flares).
    pub fn with_flare_chance(mut self, chance: f64) -> Self {
        self.flare_chance = chance.clamp(0.0, 1.0);
        self
    }

    fn next_frame(&mut self) -> String {
        let mut values = [0i32; 3];
        for value in &mut values {
            // Idle traffic: safe band with occasional nominal drift
            *value = if self.rng.gen_bool(0.15) {
                self.rng.gen_range(20..60)
            } else {
                self.rng.gen_range(2..18)
            };
        }
        if self.rng.gen_bool(self.flare_chance) {
            let slot = self.rng.gen_range(0..3);
            values[slot] = self.rng.gen_range(80..100);
        }
        format!("{},{},{}", values[0], values[1], values[2])
    }
}

#[async_trait]
impl Transport for SimulatedHub {
    async fn connect(&mut self) -> MonitorResult<()> {
        self.connected = true;
        debug!("simulated hub online");
        Ok(())
    }

    async fn read_line(&mut self) -> MonitorResult<Option<String>> {
        if !self.connected {
            return Err(MonitorError::NotConnected);
        }
        tokio::time::sleep(self.interval).await;
        Ok(Some(self.next_frame()))
    }

    async fn disconnect(&mut self) {
        self.connected = false;
        debug!("simulated hub offline");
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn kind(&self) -> &'static str {
        "simulated"
    }

    fn info(&self) -> String {
        format!("simulated hub @ {:?} interval", self.interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_playback_then_eof() {
        let mut link = MockLink::scripted(["10,20,30", "SENSORS:1,1,0"]);
        link.connect().await.expect("connect");

        assert_eq!(
            link.read_line().await.expect("line").as_deref(),
            Some("10,20,30")
        );
        assert_eq!(
            link.read_line().await.expect("line").as_deref(),
            Some("SENSORS:1,1,0")
        );
        assert_eq!(link.read_line().await.expect("eof"), None);
    }

    #[tokio::test]
    async fn test_read_requires_connect() {
        let mut link = MockLink::scripted(["1,2,3"]);
        assert!(matches!(
            link.read_line().await,
            Err(MonitorError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_injected_connect_failure_fires_once() {
        let mut link = MockLink::failing();
        assert!(link.connect().await.is_err());
        assert!(!link.is_connected());

        // The failure is one-shot; a retry succeeds
        link.connect().await.expect("second connect");
        assert!(link.is_connected());
    }

    #[tokio::test]
    async fn test_channelled_lines_end_when_sender_drops() {
        let (mut link, tx) = MockLink::channelled();
        link.connect().await.expect("connect");

        tx.send("5,5,5".to_string()).expect("send");
        assert_eq!(
            link.read_line().await.expect("line").as_deref(),
            Some("5,5,5")
        );

        drop(tx);
        assert_eq!(link.read_line().await.expect("eof"), None);
    }

    #[tokio::test]
    async fn test_simulated_hub_emits_parseable_frames() {
        let mut hub = SimulatedHub::new(Duration::ZERO).with_flare_chance(0.0);
        hub.connect().await.expect("connect");

        for _ in 0..10 {
            let line = hub.read_line().await.expect("line").expect("some line");
            let frame = crate::frame::parse_line(&line).expect("parseable frame");
            match frame {
                crate::frame::Frame::Intensities(values) => {
                    for value in values {
                        let value = value.expect("numeric token");
                        assert!((0..75).contains(&value), "no flares expected: {}", value);
                    }
                }
                other => panic!("unexpected frame: {:?}", other),
            }
        }
    }
}
