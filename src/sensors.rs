//! Sensor registry: the three flame-sensor readings and their lifecycle.
//!
//! The hub exposes exactly three flame sensors. Their slots are fixed for the
//! lifetime of the process; every update replaces the whole three-slot array
//! with a freshly built one, so observers holding an earlier snapshot can
//! diff against the new state without aliasing surprises.
//!
//! Unrecognized or partially recognized frames follow last-value-hold
//! semantics: a slot that the frame does not address keeps its previous
//! reading untouched.

use crate::frame::Frame;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of sensor slots. Fixed by the hub hardware.
pub const SENSOR_COUNT: usize = 3;

/// Operator-facing sensor names, by slot index.
pub const SENSOR_NAMES: [&str; SENSOR_COUNT] = ["Alpha Sensor", "Beta Sensor", "Gamma Sensor"];

/// `last_updated` sentinel used while no link has ever delivered data.
pub const DISCONNECTED_STAMP: &str = "Disconnected";

/// `last_updated` sentinel for an operator-simulated fire condition.
pub const TEST_MODE_STAMP: &str = "TEST_MODE";

/// Forced intensity reported for a fire event (hub binary format and
/// simulated fires alike).
pub const FIRE_EVENT_VALUE: i32 = 100;

/// Classification of a single sensor reading.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SensorStatus {
    /// No link has delivered data for this sensor yet.
    NotReady,
    /// Link is up, first reading still pending.
    Initializing,
    /// Reading in the nominal band.
    Ready,
    /// Reading below the safe threshold.
    Safe,
    /// Reading above the fire threshold.
    FireDetected,
}

impl fmt::Display for SensorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SensorStatus::NotReady => "Not Ready",
            SensorStatus::Initializing => "Initializing",
            SensorStatus::Ready => "Ready",
            SensorStatus::Safe => "Safe Zone",
            SensorStatus::FireDetected => "Fire Detected",
        };
        f.write_str(label)
    }
}

/// One sensor's current state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Operator-facing sensor name.
    pub name: String,
    /// Intensity percentage as reported by the hub. Not clamped; firmware
    /// variants are known to emit values outside 0..=100.
    pub value: i32,
    /// Current classification.
    pub status: SensorStatus,
    /// Wall-clock `HH:MM:SS` of the last applied update, or a sentinel.
    pub last_updated: String,
}

impl SensorReading {
    /// The reading every slot starts from and returns to on reset.
    fn initial(slot: usize) -> Self {
        Self {
            name: SENSOR_NAMES[slot].to_string(),
            value: 0,
            status: SensorStatus::NotReady,
            last_updated: DISCONNECTED_STAMP.to_string(),
        }
    }
}

/// Intensity classification thresholds.
///
/// Values strictly above `fire` classify as [`SensorStatus::FireDetected`],
/// strictly below `safe` as [`SensorStatus::Safe`], everything between as
/// [`SensorStatus::Ready`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Fire band lower bound (exclusive).
    pub fire: i32,
    /// Safe band upper bound (exclusive).
    pub safe: i32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self { fire: 75, safe: 20 }
    }
}

impl Thresholds {
    /// Classify a raw intensity value.
    pub fn classify(&self, value: i32) -> SensorStatus {
        if value > self.fire {
            SensorStatus::FireDetected
        } else if value < self.safe {
            SensorStatus::Safe
        } else {
            SensorStatus::Ready
        }
    }
}

/// Current wall-clock time as `HH:MM:SS`, the stamp format shown next to
/// each sensor and on chart points.
pub fn wall_clock_stamp() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

/// The fixed three-slot sensor registry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorRegistry {
    readings: [SensorReading; SENSOR_COUNT],
}

impl Default for SensorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorRegistry {
    /// Registry with all three slots in the initial disconnected state.
    pub fn new() -> Self {
        Self {
            readings: [
                SensorReading::initial(0),
                SensorReading::initial(1),
                SensorReading::initial(2),
            ],
        }
    }

    /// Current readings, by slot.
    pub fn readings(&self) -> &[SensorReading; SENSOR_COUNT] {
        &self.readings
    }

    /// Current intensity values, by slot.
    pub fn values(&self) -> [i32; SENSOR_COUNT] {
        [
            self.readings[0].value,
            self.readings[1].value,
            self.readings[2].value,
        ]
    }

    /// Whether at least one sensor currently reads fire.
    pub fn any_fire(&self) -> bool {
        self.readings
            .iter()
            .any(|r| r.status == SensorStatus::FireDetected)
    }

    /// Apply a parsed frame. Returns `true` when at least one slot was
    /// addressed by the frame (and the registry was therefore replaced).
    ///
    /// Re-applying an identical frame updates `last_updated` again; "touched"
    /// means the frame addressed the slot, not that the value changed.
    pub fn apply(&mut self, frame: &Frame, thresholds: Thresholds, stamp: &str) -> bool {
        let mut next = self.readings.clone();
        let mut touched = false;

        match frame {
            Frame::Intensities(values) => {
                for (slot, value) in values.iter().enumerate() {
                    if let Some(value) = *value {
                        next[slot].value = value;
                        next[slot].status = thresholds.classify(value);
                        next[slot].last_updated = stamp.to_string();
                        touched = true;
                    }
                }
            }
            Frame::HubStates(states) => {
                for (slot, fire) in states.iter().enumerate() {
                    if let Some(fire) = *fire {
                        if fire {
                            next[slot].value = FIRE_EVENT_VALUE;
                            next[slot].status = SensorStatus::FireDetected;
                        } else {
                            next[slot].value = 0;
                            next[slot].status = SensorStatus::Safe;
                        }
                        next[slot].last_updated = stamp.to_string();
                        touched = true;
                    }
                }
            }
            Frame::Fire(slot) => {
                next[*slot].value = FIRE_EVENT_VALUE;
                next[*slot].status = SensorStatus::FireDetected;
                next[*slot].last_updated = stamp.to_string();
                touched = true;
            }
        }

        if touched {
            self.readings = next;
        }
        touched
    }

    /// Mark all slots as initializing (link is up, data pending). Values and
    /// stamps carry over unchanged.
    pub fn begin_initializing(&mut self) {
        let mut next = self.readings.clone();
        for reading in &mut next {
            reading.status = SensorStatus::Initializing;
        }
        self.readings = next;
    }

    /// Restore all three slots to the initial disconnected state.
    pub fn reset(&mut self) {
        self.readings = [
            SensorReading::initial(0),
            SensorReading::initial(1),
            SensorReading::initial(2),
        ];
    }

    /// Force slot 0 into a simulated fire condition.
    pub fn mark_test_fire(&mut self) {
        let mut next = self.readings.clone();
        next[0].value = FIRE_EVENT_VALUE;
        next[0].status = SensorStatus::FireDetected;
        next[0].last_updated = TEST_MODE_STAMP.to_string();
        self.readings = next;
    }
}
