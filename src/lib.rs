//! # Flamewatch Core Library
//!
//! This crate is the monitoring core for a three-sensor flame-detection hub.
//! It ingests the hub's line protocol over a serial or TCP link, classifies
//! readings into status bands, arms an alarm exactly once per fire episode,
//! and keeps a short rolling history for charting. The dashboard frontend
//! consumes serialized state snapshots; nothing visual lives here.
//!
//! ## Crate Structure
//!
//! - **`config`**: TOML/env configuration loading and validation.
//! - **`error`**: The `MonitorError` enum for centralized error handling.
//! - **`frame`**: Parser for the hub's line grammars (raw intensities,
//!   binary hub states, single-sensor fire events).
//! - **`sensors`**: The fixed three-slot sensor registry and classification
//!   thresholds.
//! - **`alarm`**: The alarm arbiter: edge-triggered arming with a latched
//!   re-entrancy guard, manual acknowledgement, incident counting.
//! - **`history`**: Fixed-capacity rolling buffer of chart points.
//! - **`transport`**: The `Transport` trait with serial, TCP, and mock
//!   strategies, plus shared line framing.
//! - **`monitor`**: `FireMonitor` (the single writer over all state) and
//!   `LinkSession` (read loop, command intake, snapshot publishing).
//! - **`siren`**: Start/stop seam for the external siren collaborator.
//! - **`trace`**: Tracing/logging initialization.

pub mod alarm;
pub mod config;
pub mod error;
pub mod frame;
pub mod history;
pub mod monitor;
pub mod sensors;
pub mod siren;
pub mod trace;
pub mod transport;

pub use alarm::{AlarmArbiter, AlarmState};
pub use error::{MonitorError, MonitorResult};
pub use frame::{parse_line, Frame};
pub use history::{HistoryBuffer, HistoryPoint};
pub use monitor::{
    ConnectionState, FireMonitor, LinkSession, MonitorCommand, MonitorSnapshot, SessionHandle,
};
pub use sensors::{SensorReading, SensorRegistry, SensorStatus, Thresholds};
pub use siren::{LogSiren, NullSiren, Siren};
pub use transport::{LineFramer, MockLink, SerialLink, SimulatedHub, TcpLink, Transport};
