//! Line-protocol parser for the sensor hub.
//!
//! The hub speaks a UTF-8 text protocol, one frame per line. Two firmware
//! generations are in the field and both grammars are recognized
//! independently:
//!
//! - **Raw intensities**: `"<int>,<int>,<int>"`, one analog percentage per
//!   slot. Extra tokens are tolerated and ignored.
//! - **Binary hub**: `"SENSORS:<0|1>,<0|1>,<0|1>"` (active-low digital flame
//!   sensors; `0` means fire) and `"FIRE:<sensorId>[:<extra>]"` for a
//!   single-sensor fire event.
//!
//! Anything else parses to `None` and is dropped without error; a noisy link
//! must never raise the alarm or surface a fault.

use crate::sensors::{SENSOR_COUNT, SENSOR_NAMES};
use serde::{Deserialize, Serialize};

/// Prefix of a binary hub full-state line.
const SENSORS_PREFIX: &str = "SENSORS:";

/// Prefix of a single-sensor fire event line.
const FIRE_PREFIX: &str = "FIRE:";

/// One recognized line of hub traffic.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frame {
    /// Raw analog intensities, by slot. `None` marks a token that failed
    /// integer parsing; that slot keeps its previous reading.
    Intensities([Option<i32>; SENSOR_COUNT]),
    /// Binary hub states, by slot: `Some(true)` fire, `Some(false)` safe,
    /// `None` unreadable token (slot untouched).
    HubStates([Option<bool>; SENSOR_COUNT]),
    /// Single-sensor fire event for the given slot.
    Fire(usize),
}

/// Parse one line of hub traffic into at most one frame.
pub fn parse_line(line: &str) -> Option<Frame> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    if let Some(rest) = line.strip_prefix(SENSORS_PREFIX) {
        return parse_hub_states(rest);
    }
    if let Some(rest) = line.strip_prefix(FIRE_PREFIX) {
        return parse_fire_event(rest);
    }
    parse_intensities(line)
}

/// `"<int>,<int>,<int>[,...]"`: requires at least [`SENSOR_COUNT`] tokens.
fn parse_intensities(line: &str) -> Option<Frame> {
    let tokens: Vec<&str> = line.split(',').collect();
    if tokens.len() < SENSOR_COUNT {
        return None;
    }

    let mut values = [None; SENSOR_COUNT];
    for (slot, token) in tokens.iter().take(SENSOR_COUNT).enumerate() {
        values[slot] = token.trim().parse::<i32>().ok();
    }
    Some(Frame::Intensities(values))
}

/// `"<0|1>,<0|1>,<0|1>[,...]"` after the `SENSORS:` prefix. Active-low:
/// `0` is fire. Tokens that are neither `0` nor `1` leave their slot alone.
fn parse_hub_states(rest: &str) -> Option<Frame> {
    let tokens: Vec<&str> = rest.split(',').collect();
    if tokens.len() < SENSOR_COUNT {
        return None;
    }

    let mut states = [None; SENSOR_COUNT];
    for (slot, token) in tokens.iter().take(SENSOR_COUNT).enumerate() {
        states[slot] = match token.trim() {
            "0" => Some(true),
            "1" => Some(false),
            _ => None,
        };
    }
    Some(Frame::HubStates(states))
}

/// `"<sensorId>[:<extra>]"` after the `FIRE:` prefix. The identifier is
/// matched against the fixed `Sensor1`..`Sensor3` aliases, then as a
/// case-insensitive substring of a sensor's display name.
fn parse_fire_event(rest: &str) -> Option<Frame> {
    let id = rest.split(':').next().unwrap_or("").trim();
    resolve_sensor_id(id).map(Frame::Fire)
}

/// Resolve a fire-event identifier to a slot index.
fn resolve_sensor_id(id: &str) -> Option<usize> {
    if id.is_empty() {
        return None;
    }

    for (slot, alias) in ["Sensor1", "Sensor2", "Sensor3"].iter().enumerate() {
        if id.eq_ignore_ascii_case(alias) {
            return Some(slot);
        }
    }

    let needle = id.to_ascii_lowercase();
    SENSOR_NAMES
        .iter()
        .position(|name| name.to_ascii_lowercase().contains(&needle))
}
