//! Fan actuator backends
//!
//! The controller only speaks in terms of "fan on" and "fan off". Each backend
//! maps that intent to a physical line level according to the wiring polarity.
//!
//! # Backends
//! - **Sysfs GPIO**: exports the line through `/sys/class/gpio` and drives it
//!   as an output, starting at the OFF level
//! - **Mock**: records levels in memory, selected with `mock_gpio`

use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::FanConfig;
use crate::constants::paths;
use crate::{FanctrlError, Result};

/// Binary output driving the fan
pub trait Actuator: Send {
    /// Drive the fan on or off
    fn set(&mut self, on: bool) -> Result<()>;

    /// Give the line back to the system. Safe to call more than once.
    fn release(&mut self) -> Result<()>;

    /// Short backend name for logs
    fn backend(&self) -> &'static str;
}

impl<A: Actuator + ?Sized> Actuator for Box<A> {
    fn set(&mut self, on: bool) -> Result<()> {
        (**self).set(on)
    }

    fn release(&mut self) -> Result<()> {
        (**self).release()
    }

    fn backend(&self) -> &'static str {
        (**self).backend()
    }
}

/// Physical line level for a logical fan state.
///
/// The line is high exactly when the requested state matches the polarity, so
/// active-low wiring gets the inverted level.
pub fn physical_level(on: bool, active_high: bool) -> u8 {
    if on == active_high {
        1
    } else {
        0
    }
}

/// Open the actuator selected by the configuration
pub fn open_actuator(config: &FanConfig) -> Result<Box<dyn Actuator>> {
    if config.mock_gpio {
        warn!("Running with MOCK GPIO");
        return Ok(Box::new(MockActuator::new(config.active_high)));
    }

    let actuator = SysfsGpioActuator::open(&config.gpio_chip, config.gpio_pin, config.active_high)?;
    Ok(Box::new(actuator))
}

// ============================================================================
// Sysfs GPIO
// ============================================================================

/// Filesystem roots used to locate and drive a GPIO line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpioPaths {
    /// Directory holding the gpiochipN character devices
    pub dev_dir: PathBuf,
    /// sysfs GPIO class directory with export/unexport and gpiochip<base> entries
    pub class_dir: PathBuf,
    /// GPIO bus device directory, entries named like the character devices
    pub bus_dir: PathBuf,
}

impl Default for GpioPaths {
    fn default() -> Self {
        Self {
            dev_dir: PathBuf::from(paths::GPIO_DEV_DIR),
            class_dir: PathBuf::from(paths::GPIO_SYSFS_DIR),
            bus_dir: PathBuf::from(paths::GPIO_BUS_DIR),
        }
    }
}

impl GpioPaths {
    /// Base line number of the sysfs class entry backing the character device `chip`.
    ///
    /// Class entries are named after their base (`gpiochip512`), not after the
    /// device index, so the entry is found through its `device` link: it points
    /// either at the bus device itself or at the bus device's parent.
    fn chip_base(&self, chip: &str) -> std::result::Result<u32, String> {
        let bus_entry = self.bus_dir.join(chip);
        let bus_device = std::fs::canonicalize(&bus_entry)
            .map_err(|e| format!("cannot resolve {}: {}", bus_entry.display(), e))?;
        let bus_parent = bus_device.parent().map(Path::to_path_buf);

        let entries = std::fs::read_dir(&self.class_dir)
            .map_err(|e| format!("cannot list {}: {}", self.class_dir.display(), e))?;

        let mut parent_match = None;
        for entry in entries.flatten() {
            if !entry.file_name().to_string_lossy().starts_with("gpiochip") {
                continue;
            }
            let Ok(device) = std::fs::canonicalize(entry.path().join("device")) else {
                continue;
            };
            if device == bus_device {
                return read_base(&entry.path());
            }
            if parent_match.is_none() && bus_parent.as_ref() == Some(&device) {
                parent_match = Some(entry.path());
            }
        }

        match parent_match {
            Some(class_entry) => read_base(&class_entry),
            None => Err(format!(
                "no entry in {} belongs to {}",
                self.class_dir.display(),
                bus_device.display()
            )),
        }
    }
}

fn read_base(class_entry: &Path) -> std::result::Result<u32, String> {
    let base_path = class_entry.join("base");
    std::fs::read_to_string(&base_path)
        .map_err(|e| format!("cannot read {}: {}", base_path.display(), e))?
        .trim()
        .parse()
        .map_err(|e| format!("invalid chip base in {}: {}", base_path.display(), e))
}

/// GPIO line driven through the sysfs class interface
#[derive(Debug)]
pub struct SysfsGpioActuator {
    chip: String,
    pin: u32,
    active_high: bool,
    class_dir: PathBuf,
    line: u32,
    /// Whether this process exported the line and so owns the unexport
    exported: bool,
    released: bool,
}

impl SysfsGpioActuator {
    /// Request `pin` on `chip` as an output already driven to the OFF level
    pub fn open(chip: &str, pin: u32, active_high: bool) -> Result<Self> {
        Self::open_at(&GpioPaths::default(), chip, pin, active_high)
    }

    /// Same as [`open`](Self::open) with explicit filesystem roots
    pub fn open_at(gpio: &GpioPaths, chip: &str, pin: u32, active_high: bool) -> Result<Self> {
        let chip_dev = gpio.dev_dir.join(chip);
        if !chip_dev.exists() {
            return Err(FanctrlError::GpioChipNotFound(chip_dev));
        }

        let request_error = |reason: String| FanctrlError::GpioRequest {
            chip: chip.to_string(),
            pin,
            reason,
        };

        let base = gpio.chip_base(chip).map_err(request_error)?;
        let line = base
            .checked_add(pin)
            .ok_or_else(|| request_error("line number overflow".to_string()))?;

        let mut actuator = Self {
            chip: chip.to_string(),
            pin,
            active_high,
            class_dir: gpio.class_dir.clone(),
            line,
            exported: false,
            released: false,
        };

        if !actuator.line_dir().exists() {
            std::fs::write(gpio.class_dir.join("export"), line.to_string())
                .map_err(|e| request_error(format!("export failed: {}", e)))?;
            actuator.exported = true;
        }

        // "high"/"low" switches to output with the level applied atomically
        let off_level = physical_level(false, active_high);
        let direction = if off_level == 1 { "high" } else { "low" };
        if let Err(e) = actuator.write_attr("direction", direction) {
            if let Err(unexport_err) = actuator.unexport() {
                warn!(line, "Failed to unexport GPIO line after setup error: {}", unexport_err);
            }
            return Err(e);
        }

        info!(
            chip = %actuator.chip,
            pin = actuator.pin,
            line = actuator.line,
            active_high,
            exported = actuator.exported,
            "GPIO line requested, driven OFF"
        );
        Ok(actuator)
    }

    fn line_dir(&self) -> PathBuf {
        self.class_dir.join(format!("gpio{}", self.line))
    }

    fn write_attr(&self, attr: &str, value: &str) -> Result<()> {
        let path = self.line_dir().join(attr);
        std::fs::write(&path, value).map_err(|source| FanctrlError::GpioWrite { path, source })
    }

    /// Unexport the line if this process exported it
    fn unexport(&mut self) -> Result<()> {
        if !self.exported {
            return Ok(());
        }
        self.exported = false;

        let unexport = self.class_dir.join("unexport");
        std::fs::write(&unexport, self.line.to_string()).map_err(|source| FanctrlError::GpioWrite {
            path: unexport,
            source,
        })
    }
}

impl Actuator for SysfsGpioActuator {
    fn set(&mut self, on: bool) -> Result<()> {
        let level = physical_level(on, self.active_high);
        self.write_attr("value", &level.to_string())?;
        debug!(line = self.line, on, level, "GPIO value written");
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        if !self.exported {
            debug!(line = self.line, "GPIO line was exported before startup, leaving it exported");
            return Ok(());
        }
        self.unexport()?;
        debug!(line = self.line, "GPIO line released");
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "sysfs"
    }
}

// ============================================================================
// Mock
// ============================================================================

/// What the mock backend has been asked to do
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MockRecord {
    /// Every physical level written, oldest first
    pub levels: Vec<u8>,
    /// Number of `release` calls
    pub releases: usize,
}

impl MockRecord {
    /// Level currently on the line
    pub fn level(&self) -> Option<u8> {
        self.levels.last().copied()
    }
}

/// No-op actuator for machines without GPIO and for tests.
///
/// Clones share one record so a test can keep a handle while the controller
/// owns the actuator.
#[derive(Debug, Clone)]
pub struct MockActuator {
    active_high: bool,
    record: Arc<Mutex<MockRecord>>,
}

impl MockActuator {
    /// Create the mock with the line at the OFF level
    pub fn new(active_high: bool) -> Self {
        let record = MockRecord {
            levels: vec![physical_level(false, active_high)],
            releases: 0,
        };
        Self {
            active_high,
            record: Arc::new(Mutex::new(record)),
        }
    }

    /// Copy of everything recorded so far
    pub fn record(&self) -> MockRecord {
        self.record.lock().clone()
    }

    /// Logical fan state implied by the current line level
    pub fn is_on(&self) -> bool {
        self.record().level() == Some(physical_level(true, self.active_high))
    }
}

impl Actuator for MockActuator {
    fn set(&mut self, on: bool) -> Result<()> {
        self.record.lock().levels.push(physical_level(on, self.active_high));
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        self.record.lock().releases += 1;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "mock"
    }
}
