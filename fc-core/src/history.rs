//! Bounded record of recent fan switches

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::constants::status::MAX_SWITCH_HISTORY;
use crate::display::{now_iso, round1};

/// One applied fan transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchEvent {
    /// Wall-clock time of the switch
    #[serde(rename = "ts")]
    pub timestamp: String,
    pub fan_on: bool,
    /// Reading that caused the switch, one decimal
    pub temp_c: Option<f64>,
    /// Thresholds in effect at switch time
    pub temp_on_c: f64,
    pub temp_off_c: f64,
}

impl SwitchEvent {
    /// Event stamped with the current local time
    pub fn now(fan_on: bool, temp_c: Option<f64>, temp_on_c: f64, temp_off_c: f64) -> Self {
        Self {
            timestamp: now_iso(),
            fan_on,
            temp_c: temp_c.map(round1),
            temp_on_c,
            temp_off_c,
        }
    }
}

/// Append-only ring of the most recent switches, oldest first
#[derive(Debug, Clone, Default)]
pub struct SwitchHistory {
    events: VecDeque<SwitchEvent>,
}

impl SwitchHistory {
    pub fn new() -> Self {
        Self {
            events: VecDeque::with_capacity(MAX_SWITCH_HISTORY + 1),
        }
    }

    /// Append an event, evicting from the front past capacity
    pub fn push(&mut self, event: SwitchEvent) {
        self.events.push_back(event);
        while self.events.len() > MAX_SWITCH_HISTORY {
            self.events.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SwitchEvent> {
        self.events.iter()
    }

    /// Owned copy for embedding in a snapshot
    pub fn to_vec(&self) -> Vec<SwitchEvent> {
        self.events.iter().cloned().collect()
    }
}
