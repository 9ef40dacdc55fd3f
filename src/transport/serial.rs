//! Serial link to the sensor hub (USB-serial deployment mode).
//!
//! Wraps `tokio-serial` for async reads at the hub's fixed baud rate.
//! Compiled-out builds (no `transport_serial` feature) keep the type and
//! surface a runtime [`MonitorError::SerialFeatureDisabled`] instead, so the
//! CLI can report the missing capability without a rebuild-to-find-out.

use crate::error::{MonitorError, MonitorResult};
use crate::transport::{LineFramer, Transport};
use async_trait::async_trait;
use std::collections::VecDeque;

#[cfg(feature = "transport_serial")]
use tokio_serial::{SerialPortBuilderExt, SerialStream};

/// Serial transport strategy.
pub struct SerialLink {
    /// Port name (e.g., "/dev/ttyUSB0", "COM3").
    port_name: String,

    /// Baud rate. The hub firmware talks at 9600.
    baud_rate: u32,

    /// The open port, when connected.
    #[cfg(feature = "transport_serial")]
    port: Option<SerialStream>,

    framer: LineFramer,
    queued: VecDeque<String>,
}

impl SerialLink {
    /// Create a serial link for the given port and baud rate. No I/O happens
    /// until [`Transport::connect`].
    pub fn new(port_name: String, baud_rate: u32) -> Self {
        Self {
            port_name,
            baud_rate,
            #[cfg(feature = "transport_serial")]
            port: None,
            framer: LineFramer::new(),
            queued: VecDeque::new(),
        }
    }
}

#[async_trait]
impl Transport for SerialLink {
    async fn connect(&mut self) -> MonitorResult<()> {
        #[cfg(feature = "transport_serial")]
        {
            let port = tokio_serial::new(&self.port_name, self.baud_rate)
                .open_native_async()
                .map_err(|err| MonitorError::TransportOpen {
                    kind: "serial",
                    target: self.port_name.clone(),
                    reason: err.to_string(),
                })?;

            self.port = Some(port);
            log::debug!(
                "serial port '{}' opened at {} baud",
                self.port_name, self.baud_rate
            );
            Ok(())
        }

        #[cfg(not(feature = "transport_serial"))]
        {
            Err(MonitorError::SerialFeatureDisabled)
        }
    }

    async fn read_line(&mut self) -> MonitorResult<Option<String>> {
        #[cfg(feature = "transport_serial")]
        {
            let port = self.port.as_mut().ok_or(MonitorError::NotConnected)?;
            crate::transport::next_framed_line(port, &mut self.framer, &mut self.queued)
                .await
                .map_err(|err| MonitorError::TransportRead(err.to_string()))
        }

        #[cfg(not(feature = "transport_serial"))]
        {
            Err(MonitorError::SerialFeatureDisabled)
        }
    }

    async fn disconnect(&mut self) {
        #[cfg(feature = "transport_serial")]
        if self.port.take().is_some() {
            // Dropping the stream releases the descriptor; close errors have
            // nowhere to go and nothing to offer
            log::debug!("serial port '{}' closed", self.port_name);
        }
        self.framer.clear();
        self.queued.clear();
    }

    fn is_connected(&self) -> bool {
        #[cfg(feature = "transport_serial")]
        {
            self.port.is_some()
        }

        #[cfg(not(feature = "transport_serial"))]
        {
            false
        }
    }

    fn kind(&self) -> &'static str {
        "serial"
    }

    fn info(&self) -> String {
        format!("serial {} @ {} baud", self.port_name, self.baud_rate)
    }
}

/// Enumerate serial ports visible on this machine, for the `ports` CLI
/// subcommand.
#[cfg(feature = "transport_serial")]
pub fn available_ports() -> MonitorResult<Vec<String>> {
    let ports = serialport::available_ports().map_err(std::io::Error::from)?;
    Ok(ports.into_iter().map(|p| p.port_name).collect())
}

/// Builds without serial support cannot enumerate ports.
#[cfg(not(feature = "transport_serial"))]
pub fn available_ports() -> MonitorResult<Vec<String>> {
    Err(MonitorError::SerialFeatureDisabled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_link_starts_disconnected() {
        let link = SerialLink::new("/dev/ttyUSB0".to_string(), 9600);
        assert!(!link.is_connected());
        assert_eq!(link.kind(), "serial");
    }

    #[test]
    fn test_info_names_port_and_baud() {
        let link = SerialLink::new("COM3".to_string(), 115200);
        let info = link.info();
        assert!(info.contains("COM3"));
        assert!(info.contains("115200"));
    }

    #[tokio::test]
    async fn test_read_before_connect_is_an_error() {
        let mut link = SerialLink::new("/dev/ttyUSB0".to_string(), 9600);
        assert!(link.read_line().await.is_err());
    }

    #[tokio::test]
    async fn test_disconnect_without_connect_is_safe() {
        let mut link = SerialLink::new("/dev/ttyUSB0".to_string(), 9600);
        link.disconnect().await;
        assert!(!link.is_connected());
    }
}
