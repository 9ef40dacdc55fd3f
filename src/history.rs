//! Rolling chart history.
//!
//! A fixed-capacity log of intensity snapshots, one per registry change,
//! consumed by the dashboard chart. The buffer is circular at sample
//! granularity: once full, each append evicts the oldest point.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Default number of retained chart points.
pub const DEFAULT_HISTORY_CAPACITY: usize = 20;

/// One chart sample: the three intensity values at a point in time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryPoint {
    /// Wall-clock `HH:MM:SS` of the snapshot.
    pub time: String,
    /// Slot 0 intensity.
    pub alpha: i32,
    /// Slot 1 intensity.
    pub beta: i32,
    /// Slot 2 intensity.
    pub gamma: i32,
}

impl HistoryPoint {
    /// Snapshot the three current values.
    pub fn capture(time: String, values: [i32; 3]) -> Self {
        Self {
            time,
            alpha: values[0],
            beta: values[1],
            gamma: values[2],
        }
    }
}

/// Fixed-capacity FIFO of chart points.
#[derive(Clone, Debug)]
pub struct HistoryBuffer {
    points: VecDeque<HistoryPoint>,
    capacity: usize,
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryBuffer {
    /// Buffer with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    /// Buffer with a custom capacity (minimum 1).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a point, evicting the oldest when full.
    pub fn push(&mut self, point: HistoryPoint) {
        if self.points.len() == self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(point);
    }

    /// Number of retained points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the buffer holds no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Maximum number of retained points.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recent point, if any.
    pub fn latest(&self) -> Option<&HistoryPoint> {
        self.points.back()
    }

    /// Points in insertion order, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &HistoryPoint> {
        self.points.iter()
    }

    /// Owned snapshot in insertion order, for serialization to the chart.
    pub fn to_vec(&self) -> Vec<HistoryPoint> {
        self.points.iter().cloned().collect()
    }
}
