//! Monitor core and link session.
//!
//! [`FireMonitor`] is the single writer over all monitoring state: the
//! sensor registry, the alarm arbiter, the rolling history, and the
//! connection state. Every incoming hub line and every operator command
//! funnels through it, and each reaction is synchronous: gate on test mode,
//! parse, apply to the registry, check the alarm edge, append history.
//! There is no concurrent writer, so no locking.
//!
//! [`LinkSession`] wires a monitor to one [`Transport`]: it owns the read
//! loop, publishes a [`MonitorSnapshot`] through a watch channel after every
//! mutation, accepts operator commands through an mpsc channel, and
//! guarantees link teardown on every exit path, including cancellation and
//! mid-read failures.

use crate::alarm::{AlarmArbiter, AlarmState};
use crate::config::MonitorConfig;
use crate::error::MonitorResult;
use crate::frame::parse_line;
use crate::history::{HistoryBuffer, HistoryPoint};
use crate::sensors::{wall_clock_stamp, SensorReading, SensorRegistry, Thresholds, SENSOR_COUNT};
use crate::siren::Siren;
use crate::transport::Transport;
use log::{info, trace};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::{mpsc, watch};

/// Link lifecycle state, for the presentation layer only. It never gates
/// alarm logic, except that `Connected` selects the sensor state restored on
/// test-alarm acknowledgement.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// No link.
    #[default]
    Disconnected,
    /// Open in progress.
    Connecting,
    /// Link up, lines flowing.
    Connected,
    /// Link failed to open or broke mid-session.
    Error,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionState::Disconnected => "Disconnected",
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Connected => "Connected",
            ConnectionState::Error => "Error",
        };
        f.write_str(label)
    }
}

/// Operator commands surfaced by the presentation layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MonitorCommand {
    /// Simulate a fire on slot 0 and enter test mode.
    TriggerTest,
    /// Silence an active alarm; exits test mode when it was on.
    Acknowledge,
    /// Reset the incident counter.
    ClearIncidents,
    /// Restore all sensors to the initial disconnected state.
    ResetSensors,
}

/// Everything the presentation layer renders, captured after a mutation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorSnapshot {
    /// Link lifecycle state.
    pub connection: ConnectionState,
    /// The three sensor readings, by slot.
    pub sensors: [SensorReading; SENSOR_COUNT],
    /// Alarm machine state.
    pub alarm: AlarmState,
    /// Chart history, oldest point first.
    pub history: Vec<HistoryPoint>,
}

/// The monitoring core: single writer over registry, arbiter and history.
pub struct FireMonitor {
    registry: SensorRegistry,
    arbiter: AlarmArbiter,
    history: HistoryBuffer,
    connection: ConnectionState,
    siren: Box<dyn Siren>,
    thresholds: Thresholds,
}

impl FireMonitor {
    /// Monitor with default thresholds and history capacity.
    pub fn new(siren: Box<dyn Siren>) -> Self {
        Self {
            registry: SensorRegistry::new(),
            arbiter: AlarmArbiter::new(),
            history: HistoryBuffer::new(),
            connection: ConnectionState::Disconnected,
            siren,
            thresholds: Thresholds::default(),
        }
    }

    /// Monitor configured from the loaded settings.
    pub fn from_config(config: &MonitorConfig, siren: Box<dyn Siren>) -> Self {
        Self {
            registry: SensorRegistry::new(),
            arbiter: AlarmArbiter::new(),
            history: HistoryBuffer::with_capacity(config.history.capacity),
            connection: ConnectionState::Disconnected,
            siren,
            thresholds: Thresholds {
                fire: config.alarm.fire_threshold,
                safe: config.alarm.safe_threshold,
            },
        }
    }

    /// Current link state.
    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    /// Current sensor readings.
    pub fn sensors(&self) -> &[SensorReading; SENSOR_COUNT] {
        self.registry.readings()
    }

    /// Current alarm state.
    pub fn alarm(&self) -> AlarmState {
        self.arbiter.state()
    }

    /// Chart history.
    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    /// Capture a snapshot for the presentation layer.
    pub fn snapshot(&self) -> MonitorSnapshot {
        MonitorSnapshot {
            connection: self.connection,
            sensors: self.registry.readings().clone(),
            alarm: self.arbiter.state(),
            history: self.history.to_vec(),
        }
    }

    /// Ingest one line of hub traffic.
    pub fn handle_line(&mut self, line: &str) {
        if self.arbiter.test_mode() {
            // Test mode owns sensor state exclusively
            trace!("test mode active, hub line discarded");
            return;
        }
        let Some(frame) = parse_line(line) else {
            trace!("unrecognized hub line discarded");
            return;
        };
        let stamp = wall_clock_stamp();
        if self.registry.apply(&frame, self.thresholds, &stamp) {
            self.react(stamp);
        }
    }

    /// Dispatch an operator command.
    pub fn apply_command(&mut self, command: MonitorCommand) {
        match command {
            MonitorCommand::TriggerTest => self.trigger_test(),
            MonitorCommand::Acknowledge => self.acknowledge(),
            MonitorCommand::ClearIncidents => self.clear_incidents(),
            MonitorCommand::ResetSensors => self.reset_sensors(),
        }
    }

    /// Simulate a fire on slot 0. Real hub traffic is suppressed until the
    /// alarm is acknowledged; the forced reading flows through the same
    /// arming path as a real one.
    pub fn trigger_test(&mut self) {
        self.arbiter.enter_test_mode();
        self.registry.mark_test_fire();
        self.react(wall_clock_stamp());
    }

    /// Acknowledge an active alarm: stop the siren, and when a test fire was
    /// running, hand the sensors back to the link (initializing when
    /// connected, full reset otherwise).
    pub fn acknowledge(&mut self) {
        if self.arbiter.is_active() {
            self.siren.stop();
        }
        let was_test = self.arbiter.acknowledge();
        if was_test {
            if self.connection == ConnectionState::Connected {
                self.registry.begin_initializing();
            } else {
                self.registry.reset();
            }
            self.react(wall_clock_stamp());
        }
    }

    /// Reset the incident counter. An active alarm keeps sounding.
    pub fn clear_incidents(&mut self) {
        self.arbiter.clear_incidents();
    }

    /// Restore all sensors to the initial disconnected state. Does not
    /// silence an active alarm.
    pub fn reset_sensors(&mut self) {
        self.registry.reset();
        self.react(wall_clock_stamp());
    }

    /// Link open initiated.
    pub fn mark_connecting(&mut self) {
        self.connection = ConnectionState::Connecting;
    }

    /// Link is up; sensors show initializing until the first frame lands.
    pub fn mark_connected(&mut self) {
        self.connection = ConnectionState::Connected;
        self.registry.begin_initializing();
        self.react(wall_clock_stamp());
    }

    /// Link closed cleanly: sensors return to the initial state and a test
    /// fire is abandoned, but an active alarm stays active until
    /// acknowledged.
    pub fn mark_disconnected(&mut self) {
        self.connection = ConnectionState::Disconnected;
        self.arbiter.exit_test_mode();
        self.registry.reset();
        self.react(wall_clock_stamp());
    }

    /// Link failed: sensors hold their last-known values.
    pub fn mark_error(&mut self) {
        self.connection = ConnectionState::Error;
    }

    /// Link open aborted before any I/O (the build lacks the capability):
    /// the connect command is undone, nothing else changes.
    pub fn mark_aborted(&mut self) {
        self.connection = ConnectionState::Disconnected;
    }

    /// Registry changed: run the alarm edge check, then log a history point.
    fn react(&mut self, stamp: String) {
        if self.arbiter.observe(self.registry.any_fire()) {
            self.siren.start();
        }
        self.history
            .push(HistoryPoint::capture(stamp, self.registry.values()));
    }
}

/// One monitor wired to one transport.
pub struct LinkSession {
    transport: Box<dyn Transport>,
    monitor: FireMonitor,
    updates: watch::Sender<MonitorSnapshot>,
    commands: mpsc::UnboundedReceiver<MonitorCommand>,
    shutdown: watch::Receiver<bool>,
}

/// Control surface handed to the presentation layer / CLI: send commands,
/// observe snapshots, request shutdown.
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<MonitorCommand>,
    updates: watch::Receiver<MonitorSnapshot>,
    shutdown: watch::Sender<bool>,
}

impl SessionHandle {
    /// Send an operator command. Quietly dropped when the session ended.
    pub fn command(&self, command: MonitorCommand) {
        let _ = self.commands.send(command);
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> MonitorSnapshot {
        self.updates.borrow().clone()
    }

    /// Subscribe to snapshot updates.
    pub fn updates(&self) -> watch::Receiver<MonitorSnapshot> {
        self.updates.clone()
    }

    /// Ask the session to close the link and end.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}

impl LinkSession {
    /// Wire a monitor to a transport. Returns the session and its handle.
    pub fn new(transport: Box<dyn Transport>, monitor: FireMonitor) -> (Self, SessionHandle) {
        let (updates_tx, updates_rx) = watch::channel(monitor.snapshot());
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let session = Self {
            transport,
            monitor,
            updates: updates_tx,
            commands: commands_rx,
            shutdown: shutdown_rx,
        };
        let handle = SessionHandle {
            commands: commands_tx,
            updates: updates_rx,
            shutdown: shutdown_tx,
        };
        (session, handle)
    }

    /// Open the link and process lines and commands until shutdown, peer
    /// close, or a link failure. The transport is released on every exit
    /// path; teardown never fails.
    pub async fn run(mut self) -> MonitorResult<()> {
        self.monitor.mark_connecting();
        self.publish();

        if let Err(err) = self.transport.connect().await {
            if matches!(err, crate::error::MonitorError::SerialFeatureDisabled) {
                // Missing capability aborts the command without leaving an
                // error state behind
                self.monitor.mark_aborted();
            } else {
                self.monitor.mark_error();
            }
            self.publish();
            return Err(err);
        }

        self.monitor.mark_connected();
        self.publish();
        info!("link up: {}", self.transport.info());

        let outcome = self.drive().await;

        self.transport.disconnect().await;
        match outcome {
            Ok(()) => {
                self.monitor.mark_disconnected();
                self.publish();
                info!("link closed");
                Ok(())
            }
            Err(err) => {
                // Connection state is already Error; sensors hold their
                // last-known values
                self.publish();
                Err(err)
            }
        }
    }

    async fn drive(&mut self) -> MonitorResult<()> {
        loop {
            tokio::select! {
                changed = self.shutdown.changed() => {
                    // A dropped shutdown sender counts as a shutdown request
                    if changed.is_err() || *self.shutdown.borrow() {
                        info!("shutdown requested, closing link");
                        return Ok(());
                    }
                }
                command = self.commands.recv() => {
                    match command {
                        Some(command) => {
                            self.monitor.apply_command(command);
                            self.publish();
                        }
                        // All handles gone: nobody is left to observe us
                        None => return Ok(()),
                    }
                }
                line = self.transport.read_line() => {
                    match line {
                        Ok(Some(line)) => {
                            self.monitor.handle_line(&line);
                            self.publish();
                        }
                        Ok(None) => {
                            info!("link ended by peer");
                            return Ok(());
                        }
                        Err(err) => {
                            self.monitor.mark_error();
                            return Err(err);
                        }
                    }
                }
            }
        }
    }

    fn publish(&self) {
        // Send only fails with no receivers; the session does not care
        let _ = self.updates.send(self.monitor.snapshot());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::{SensorStatus, DISCONNECTED_STAMP, TEST_MODE_STAMP};
    use crate::siren::NullSiren;

    fn monitor() -> FireMonitor {
        FireMonitor::new(Box::new(NullSiren))
    }

    #[test]
    fn test_safe_then_fire_line_arms_alarm_once() {
        let mut monitor = monitor();
        monitor.mark_connected();

        monitor.handle_line("10,10,10");
        assert_eq!(monitor.sensors()[0].status, SensorStatus::Safe);
        assert!(!monitor.alarm().active);

        monitor.handle_line("80,5,10");
        assert_eq!(monitor.sensors()[0].status, SensorStatus::FireDetected);
        assert_eq!(monitor.sensors()[0].value, 80);
        assert!(monitor.alarm().active);
        assert_eq!(monitor.alarm().incident_count, 1);

        // Same episode: no double count
        monitor.handle_line("90,5,10");
        assert_eq!(monitor.alarm().incident_count, 1);
    }

    #[test]
    fn test_hub_state_line_arms_alarm() {
        let mut monitor = monitor();
        monitor.mark_connected();
        monitor.handle_line("SENSORS:1,1,0");

        let sensors = monitor.sensors();
        assert_eq!(sensors[0].status, SensorStatus::Safe);
        assert_eq!(sensors[0].value, 0);
        assert_eq!(sensors[2].status, SensorStatus::FireDetected);
        assert_eq!(sensors[2].value, 100);
        assert!(monitor.alarm().active);
    }

    #[test]
    fn test_trigger_test_and_acknowledge_while_disconnected() {
        let mut monitor = monitor();
        monitor.trigger_test();

        assert!(monitor.alarm().active);
        assert!(monitor.alarm().test_mode);
        assert_eq!(monitor.sensors()[0].last_updated, TEST_MODE_STAMP);
        assert_eq!(monitor.sensors()[0].value, 100);

        monitor.acknowledge();
        assert!(!monitor.alarm().active);
        assert!(!monitor.alarm().test_mode);
        for reading in monitor.sensors() {
            assert_eq!(reading.status, SensorStatus::NotReady);
            assert_eq!(reading.value, 0);
            assert_eq!(reading.last_updated, DISCONNECTED_STAMP);
        }
    }

    #[test]
    fn test_acknowledge_test_while_connected_reinitializes() {
        let mut monitor = monitor();
        monitor.mark_connected();
        monitor.trigger_test();
        monitor.acknowledge();

        for reading in monitor.sensors() {
            assert_eq!(reading.status, SensorStatus::Initializing);
        }
        assert!(!monitor.alarm().test_mode);
    }

    #[test]
    fn test_test_mode_suppresses_hub_lines() {
        let mut monitor = monitor();
        monitor.mark_connected();
        monitor.trigger_test();

        monitor.handle_line("5,5,5");
        assert_eq!(monitor.sensors()[0].value, 100);
        assert_eq!(monitor.sensors()[0].last_updated, TEST_MODE_STAMP);
    }

    #[test]
    fn test_malformed_line_changes_nothing() {
        let mut monitor = monitor();
        monitor.mark_connected();
        let points_before = monitor.history().len();

        monitor.handle_line("abc");
        for reading in monitor.sensors() {
            assert_eq!(reading.status, SensorStatus::Initializing);
        }
        assert!(!monitor.alarm().active);
        assert_eq!(monitor.history().len(), points_before);
    }

    #[test]
    fn test_history_tracks_each_update() {
        let mut monitor = monitor();
        monitor.mark_connected();
        let base = monitor.history().len();

        monitor.handle_line("1,2,3");
        monitor.handle_line("4,5,6");
        assert_eq!(monitor.history().len(), base + 2);

        let latest = monitor.history().latest().expect("latest point");
        assert_eq!((latest.alpha, latest.beta, latest.gamma), (4, 5, 6));
    }

    #[test]
    fn test_disconnect_keeps_alarm_but_resets_sensors() {
        let mut monitor = monitor();
        monitor.mark_connected();
        monitor.handle_line("90,5,5");
        assert!(monitor.alarm().active);

        monitor.mark_disconnected();
        assert_eq!(monitor.connection(), ConnectionState::Disconnected);
        assert_eq!(monitor.sensors()[0].status, SensorStatus::NotReady);
        // Only acknowledgement silences the alarm
        assert!(monitor.alarm().active);

        monitor.acknowledge();
        assert!(!monitor.alarm().active);
    }

    #[test]
    fn test_aborted_connect_leaves_no_trace() {
        let mut monitor = monitor();
        monitor.mark_connecting();
        monitor.mark_aborted();

        assert_eq!(monitor.connection(), ConnectionState::Disconnected);
        assert_eq!(monitor.sensors()[0].status, SensorStatus::NotReady);
        assert!(monitor.history().is_empty());
    }

    #[test]
    fn test_error_holds_last_values() {
        let mut monitor = monitor();
        monitor.mark_connected();
        monitor.handle_line("42,43,44");

        monitor.mark_error();
        assert_eq!(monitor.connection(), ConnectionState::Error);
        assert_eq!(monitor.sensors()[0].value, 42);
        assert_eq!(monitor.sensors()[1].value, 43);
    }

    #[test]
    fn test_clear_incidents_via_command() {
        let mut monitor = monitor();
        monitor.mark_connected();
        monitor.handle_line("90,5,5");
        assert_eq!(monitor.alarm().incident_count, 1);

        monitor.apply_command(MonitorCommand::ClearIncidents);
        assert_eq!(monitor.alarm().incident_count, 0);
        assert!(monitor.alarm().active);
    }

    #[test]
    fn test_snapshot_round_trips_through_json() {
        let mut monitor = monitor();
        monitor.mark_connected();
        monitor.handle_line("10,80,30");

        let snapshot = monitor.snapshot();
        let json = serde_json::to_string(&snapshot).expect("serialize");
        let back: MonitorSnapshot = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, snapshot);
    }

    #[test]
    fn test_connection_state_labels() {
        assert_eq!(ConnectionState::Disconnected.to_string(), "Disconnected");
        assert_eq!(ConnectionState::Error.to_string(), "Error");
    }
}
