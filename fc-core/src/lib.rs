//! fanctrl Core Library
//!
//! Temperature-driven on/off fan control for single-board computers.
//!
//! # Features
//!
//! - **Hysteresis control**: separate on/off thresholds with a minimum dwell time
//! - **Fail-safe**: a failed sensor read forces the fan on
//! - **Status**: a lock-protected snapshot with the last few switch events
//! - **Actuators**: sysfs GPIO backend with polarity handling, plus a mock
//! - **Shutdown**: cooperative stop that leaves the fan off and the line released
//!
//! # Module Structure
//!
//! - `config` - `[fan]` table loading and validation
//! - `actuator` / `sensor` - hardware edges
//! - `controller` - the hysteresis state machine
//! - `history` / `status` - published state
//! - `shutdown` - termination handling
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Instant;
//! use fc_core::{FanConfig, HysteresisController, MockActuator, SensorSource, StatusStore, ThermalZoneSensor};
//!
//! let config = FanConfig::default().validated().unwrap();
//! let status = Arc::new(StatusStore::new());
//! let mut controller = HysteresisController::new(&config, MockActuator::new(true), status.clone(), "dev");
//! let mut sensor = ThermalZoneSensor::new(&config.temp_path);
//! controller.tick(sensor.read_celsius(), Instant::now());
//! ```

pub mod actuator;
pub mod config;
pub mod constants;
pub mod controller;
pub mod display;
pub mod history;
pub mod sensor;
pub mod shutdown;
pub mod status;

pub use fc_error::{FanctrlError, Result};

pub use actuator::{
    open_actuator, physical_level, Actuator, GpioPaths, MockActuator, MockRecord, SysfsGpioActuator,
};
pub use config::{load_config, FanConfig};
pub use controller::{desired_state, ControllerState, HysteresisController, TickOutcome};
pub use history::{SwitchEvent, SwitchHistory};
pub use sensor::{parse_temperature, SensorSource, ThermalZoneSensor};
pub use shutdown::ShutdownCoordinator;
pub use status::{StatusSnapshot, StatusStore};
