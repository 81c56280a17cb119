//! Temperature sources

use std::path::{Path, PathBuf};

use crate::constants::sensor::MILLIDEGREE_THRESHOLD;
use crate::{FanctrlError, Result};

/// Anything that can produce a temperature in °C
pub trait SensorSource: Send {
    /// Take one reading. Blocking is allowed; the loop calls this off the async executor.
    fn read_celsius(&mut self) -> Result<f64>;
}

/// Sysfs thermal file such as `/sys/class/thermal/thermal_zone0/temp`
#[derive(Debug, Clone)]
pub struct ThermalZoneSensor {
    path: PathBuf,
}

impl ThermalZoneSensor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SensorSource for ThermalZoneSensor {
    fn read_celsius(&mut self) -> Result<f64> {
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| FanctrlError::temperature(&self.path, e.to_string()))?;
        parse_temperature(&content).map_err(|reason| FanctrlError::temperature(&self.path, reason))
    }
}

/// Parse a thermal file's content.
///
/// Kernel thermal zones report millidegrees; values above 1000 are scaled down,
/// smaller values are taken as degrees already.
pub fn parse_temperature(content: &str) -> std::result::Result<f64, String> {
    let raw: f64 = content
        .trim()
        .parse()
        .map_err(|e| format!("Failed to parse temperature: {}", e))?;

    if !raw.is_finite() {
        return Err(format!("Non-finite temperature: {}", raw));
    }

    Ok(if raw > MILLIDEGREE_THRESHOLD { raw / 1000.0 } else { raw })
}
