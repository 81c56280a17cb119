//! Hysteresis fan controller
//!
//! Turns temperature readings into on/off decisions for a single fan.
//!
//! # How It Works
//!
//! 1. **Hysteresis**: the fan switches on at `temp_on_c` and off at
//!    `temp_off_c`. Between the two thresholds the current state is kept.
//!
//! 2. **Dwell time**: a wanted flip is applied only when `min_switch_s` has
//!    passed since the previous switch. A suppressed flip is not queued; the
//!    next tick decides again from its own reading.
//!
//! 3. **Fail-safe**: a failed read forces the fan on immediately. This path
//!    skips the dwell guard, writes no history entry and leaves the last-switch
//!    time untouched.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

use crate::actuator::Actuator;
use crate::config::FanConfig;
use crate::constants::status::ERROR_TEMP_READ_FAILED;
use crate::display::{format_context, now_iso, round1};
use crate::history::{SwitchEvent, SwitchHistory};
use crate::status::{StatusSnapshot, StatusStore};
use crate::Result;

/// Fan state wanted for a reading, given the current state.
pub fn desired_state(temp_c: f64, fan_on: bool, temp_on_c: f64, temp_off_c: f64) -> bool {
    if temp_c >= temp_on_c {
        true
    } else if temp_c <= temp_off_c {
        false
    } else {
        fan_on
    }
}

/// What a tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The fan was switched to the given state
    Switched(bool),
    /// No transition was applied
    Held,
    /// The reading failed and the fail-safe forced the fan on
    SensorFailed,
}

/// Mutable controller state, touched only by [`HysteresisController::tick`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControllerState {
    pub fan_on: bool,
    /// Monotonic time of the last applied switch; `None` until the first one
    pub last_switch: Option<Instant>,
    pub min_seen: Option<f64>,
    pub max_seen: Option<f64>,
}

impl ControllerState {
    fn record_reading(&mut self, temp_c: f64) {
        self.min_seen = Some(self.min_seen.map_or(temp_c, |m| m.min(temp_c)));
        self.max_seen = Some(self.max_seen.map_or(temp_c, |m| m.max(temp_c)));
    }

    fn dwell_elapsed(&self, now: Instant, min_switch: Duration) -> bool {
        match self.last_switch {
            Some(last) => now.saturating_duration_since(last) >= min_switch,
            None => true,
        }
    }
}

/// Hysteresis state machine driving one actuator
pub struct HysteresisController<A: Actuator> {
    temp_on_c: f64,
    temp_off_c: f64,
    min_switch: Duration,
    log_each_read: bool,
    version: String,
    actuator: A,
    state: ControllerState,
    history: SwitchHistory,
    status: Arc<StatusStore>,
}

impl<A: Actuator> HysteresisController<A> {
    /// Create a controller for a validated configuration. The actuator is
    /// expected to be at its OFF level already.
    pub fn new(config: &FanConfig, actuator: A, status: Arc<StatusStore>, version: impl Into<String>) -> Self {
        Self {
            temp_on_c: config.temp_on_c,
            temp_off_c: config.temp_off_c,
            min_switch: config.min_switch(),
            log_each_read: config.log_each_read,
            version: version.into(),
            actuator,
            state: ControllerState::default(),
            history: SwitchHistory::new(),
            status,
        }
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn history(&self) -> &SwitchHistory {
        &self.history
    }

    pub fn fan_on(&self) -> bool {
        self.state.fan_on
    }

    /// Hand the actuator over once the loop has stopped
    pub fn into_actuator(self) -> A {
        self.actuator
    }

    /// Publish the startup snapshot: fan off, nothing read yet
    pub fn publish_initial(&self) {
        self.publish(None, None);
    }

    /// Process one reading taken at `now`
    pub fn tick(&mut self, reading: Result<f64>, now: Instant) -> TickOutcome {
        let temp_c = match reading {
            Ok(t) => t,
            Err(e) => {
                self.fail_safe(&e);
                return TickOutcome::SensorFailed;
            }
        };

        self.state.record_reading(temp_c);
        let desired = desired_state(temp_c, self.state.fan_on, self.temp_on_c, self.temp_off_c);

        let outcome = if desired == self.state.fan_on {
            if self.log_each_read {
                info!("Temp; fan {}; {}", on_off(self.state.fan_on), self.context(Some(temp_c)));
            }
            TickOutcome::Held
        } else if !self.state.dwell_elapsed(now, self.min_switch) {
            debug!(
                "Switch to {} suppressed by dwell time; {}",
                on_off(desired),
                self.context(Some(temp_c))
            );
            if self.log_each_read {
                info!("Temp; fan {}; {}", on_off(self.state.fan_on), self.context(Some(temp_c)));
            }
            TickOutcome::Held
        } else {
            self.apply(desired, temp_c, now)
        };

        self.publish(Some(temp_c), None);
        outcome
    }

    fn apply(&mut self, desired: bool, temp_c: f64, now: Instant) -> TickOutcome {
        if let Err(e) = self.actuator.set(desired) {
            error!(
                "Failed to switch fan {} via {}: {}; {}",
                on_off(desired),
                self.actuator.backend(),
                e,
                self.context(Some(temp_c))
            );
            return TickOutcome::Held;
        }

        self.state.fan_on = desired;
        self.state.last_switch = Some(now);
        info!("Fan {}; {}", on_off(desired), self.context(Some(temp_c)));
        self.history
            .push(SwitchEvent::now(desired, Some(temp_c), self.temp_on_c, self.temp_off_c));
        TickOutcome::Switched(desired)
    }

    fn fail_safe(&mut self, err: &crate::FanctrlError) {
        error!("temp read failed: {}; forcing fan ON and retrying; {}", err, self.context(None));
        if let Err(e) = self.actuator.set(true) {
            error!("Failed to force fan ON via {}: {}", self.actuator.backend(), e);
        }
        self.state.fan_on = true;
        self.publish(None, Some(ERROR_TEMP_READ_FAILED.to_string()));
    }

    fn publish(&self, temp_c: Option<f64>, error: Option<String>) {
        self.status.publish(StatusSnapshot {
            updated_at: now_iso(),
            fan_on: self.state.fan_on,
            temp_c: temp_c.map(round1),
            min_c: self.state.min_seen.map(round1),
            max_c: self.state.max_seen.map(round1),
            temp_on_c: self.temp_on_c,
            temp_off_c: self.temp_off_c,
            version: self.version.clone(),
            error,
            switchpoints: self.history.to_vec(),
        });
    }

    fn context(&self, temp_c: Option<f64>) -> String {
        format_context(temp_c, self.temp_on_c, self.temp_off_c)
    }
}

fn on_off(on: bool) -> &'static str {
    if on {
        "ON"
    } else {
        "OFF"
    }
}
