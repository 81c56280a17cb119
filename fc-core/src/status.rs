//! Published controller status
//!
//! The control loop replaces the whole snapshot on every tick; the status
//! server clones it out under the lock and serializes afterwards.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::history::SwitchEvent;

/// Complete view of the controller at one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub updated_at: String,
    pub fan_on: bool,
    pub temp_c: Option<f64>,
    pub min_c: Option<f64>,
    pub max_c: Option<f64>,
    pub temp_on_c: f64,
    pub temp_off_c: f64,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub switchpoints: Vec<SwitchEvent>,
}

/// Single-slot store for the latest snapshot
#[derive(Debug, Default)]
pub struct StatusStore {
    slot: Mutex<Option<StatusSnapshot>>,
}

impl StatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the published snapshot
    pub fn publish(&self, snapshot: StatusSnapshot) {
        *self.slot.lock() = Some(snapshot);
    }

    /// Copy of the latest snapshot, `None` before the first publish
    pub fn read(&self) -> Option<StatusSnapshot> {
        self.slot.lock().clone()
    }
}
