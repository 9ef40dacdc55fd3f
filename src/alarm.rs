//! Alarm arbiter: arms the siren exactly once per fire episode.
//!
//! The arbiter is a two-state machine (idle/active) driven by registry
//! changes. A rising edge of "any sensor reads fire" arms the alarm and
//! increments the incident counter; the latched guard then suppresses
//! re-arming until every sensor has left the fire state, so one contiguous
//! fire episode counts as one incident no matter how many samples report it.
//!
//! Deactivation is manual only: sensors dropping out of the fire band never
//! silence an active alarm, an operator acknowledgement does.

use log::{info, warn};
use serde::{Deserialize, Serialize};

/// Snapshot of the alarm machine, as shown to the presentation layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmState {
    /// Whether the siren is currently sounding.
    pub active: bool,
    /// Fire episodes recorded since the last counter clear.
    pub incident_count: u32,
    /// Whether an operator-simulated fire owns the sensor state.
    pub test_mode: bool,
}

/// The alarm state machine.
#[derive(Debug, Default)]
pub struct AlarmArbiter {
    state: AlarmState,
    /// Set when the current fire episode has already been counted; cleared
    /// only when zero sensors read fire.
    fire_latched: bool,
}

impl AlarmArbiter {
    /// A fresh, idle arbiter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot.
    pub fn state(&self) -> AlarmState {
        self.state
    }

    /// Whether the alarm is active.
    pub fn is_active(&self) -> bool {
        self.state.active
    }

    /// Whether test mode owns the sensor state.
    pub fn test_mode(&self) -> bool {
        self.state.test_mode
    }

    /// Fire episodes recorded since the last clear.
    pub fn incident_count(&self) -> u32 {
        self.state.incident_count
    }

    /// Evaluate the registry's fire condition after a change. Returns `true`
    /// exactly when the alarm arms (the caller must start the siren then,
    /// and only then).
    pub fn observe(&mut self, any_fire: bool) -> bool {
        if any_fire {
            if !self.state.active && !self.fire_latched {
                self.state.active = true;
                self.state.incident_count += 1;
                self.fire_latched = true;
                warn!(
                    "fire detected, alarm armed (incident #{})",
                    self.state.incident_count
                );
                return true;
            }
        } else {
            self.fire_latched = false;
        }
        false
    }

    /// Enter operator test mode. The caller forces the sensor state; the
    /// normal [`observe`](Self::observe) path picks the fire up.
    pub fn enter_test_mode(&mut self) {
        self.state.test_mode = true;
        info!("alarm test mode entered");
    }

    /// Operator acknowledgement: deactivate and leave test mode. Returns
    /// `true` when test mode was active (the caller then reverts the sensors
    /// it forced).
    pub fn acknowledge(&mut self) -> bool {
        if self.state.active {
            info!("alarm acknowledged");
        }
        self.state.active = false;
        let was_test = self.state.test_mode;
        self.state.test_mode = false;
        was_test
    }

    /// Leave test mode without acknowledging. Used on link teardown, where
    /// the simulated fire is discarded along with the sensor state but an
    /// active alarm keeps sounding until acknowledged.
    pub fn exit_test_mode(&mut self) {
        self.state.test_mode = false;
    }

    /// Reset the incident counter. Does not touch an active alarm.
    pub fn clear_incidents(&mut self) {
        self.state.incident_count = 0;
    }
}
