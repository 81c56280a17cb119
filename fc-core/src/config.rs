//! Fan configuration
//!
//! Loads the `[fan]` table of the TOML config file and validates it. Threshold
//! problems are corrected to safe defaults; interval problems are fatal.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::warn;

use crate::constants::{fan as fan_const, paths, timing};
use crate::{FanctrlError, Result};

/// Root of the config file. Only the `[fan]` table is read.
#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    fan: FanConfig,
}

/// Effective controller configuration, immutable once validated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FanConfig {
    /// Line offset on the GPIO chip
    pub gpio_pin: u32,
    /// GPIO chip name under /dev
    pub gpio_chip: String,
    /// Whether a logical "on" drives the line high
    pub active_high: bool,
    /// Seconds between sensor reads
    pub poll_interval_s: f64,
    /// Switch the fan on at or above this temperature
    pub temp_on_c: f64,
    /// Switch the fan off at or below this temperature
    pub temp_off_c: f64,
    /// Minimum seconds between two switches
    pub min_switch_s: f64,
    /// Thermal sensor file
    pub temp_path: String,
    /// Log every reading, not only switches
    pub log_each_read: bool,
    /// Port of the HTTP status endpoint
    pub status_port: u16,
    /// Use the no-op actuator instead of real GPIO
    pub mock_gpio: bool,
}

impl Default for FanConfig {
    fn default() -> Self {
        Self {
            gpio_pin: fan_const::DEFAULT_GPIO_PIN,
            gpio_chip: fan_const::DEFAULT_GPIO_CHIP.to_string(),
            active_high: true,
            poll_interval_s: fan_const::DEFAULT_POLL_INTERVAL_S,
            temp_on_c: fan_const::DEFAULT_TEMP_ON_C,
            temp_off_c: fan_const::DEFAULT_TEMP_OFF_C,
            min_switch_s: fan_const::DEFAULT_MIN_SWITCH_S,
            temp_path: paths::DEFAULT_TEMP_PATH.to_string(),
            log_each_read: true,
            status_port: fan_const::DEFAULT_STATUS_PORT,
            mock_gpio: false,
        }
    }
}

impl FanConfig {
    /// Parse the `[fan]` table from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(content)?;
        Ok(file.fan)
    }

    /// Check the threshold pair and fall back to the safe defaults if the gap is
    /// too small or inverted. Returns true if a correction was made.
    pub fn normalize_thresholds(&mut self) -> bool {
        let gap = self.temp_on_c - self.temp_off_c;
        // Also catches NaN thresholds
        if gap >= fan_const::MIN_THRESHOLD_GAP_C {
            return false;
        }

        warn!(
            "Invalid temperature thresholds in config; temp_on_c={}, temp_off_c={}. \
             Falling back to defaults on={}, off={}.",
            self.temp_on_c,
            self.temp_off_c,
            fan_const::DEFAULT_TEMP_ON_C,
            fan_const::DEFAULT_TEMP_OFF_C
        );
        self.temp_on_c = fan_const::DEFAULT_TEMP_ON_C;
        self.temp_off_c = fan_const::DEFAULT_TEMP_OFF_C;
        true
    }

    /// Reject timing values the control loop cannot run with.
    ///
    /// Both values must also fit in a [`Duration`], so the interval accessors
    /// below cannot fail once this passes.
    pub fn validate_timing(&self) -> Result<()> {
        if !(self.poll_interval_s.is_finite() && self.poll_interval_s > 0.0) {
            return Err(FanctrlError::invalid_config("poll_interval_s", "must be > 0"));
        }
        if !(self.min_switch_s.is_finite() && self.min_switch_s >= 0.0) {
            return Err(FanctrlError::invalid_config("min_switch_s", "must be >= 0"));
        }
        for (field, value) in [
            ("poll_interval_s", self.poll_interval_s),
            ("min_switch_s", self.min_switch_s),
        ] {
            Duration::try_from_secs_f64(value)
                .map_err(|e| FanctrlError::invalid_config(field, format!("{}: {}", value, e)))?;
        }
        Ok(())
    }

    /// Correct the thresholds, then validate the timing values
    pub fn validated(mut self) -> Result<Self> {
        self.normalize_thresholds();
        self.validate_timing()?;
        Ok(self)
    }

    /// Pause between successful ticks
    pub fn poll_interval(&self) -> Duration {
        secs_or_max(self.poll_interval_s)
    }

    /// Pause after a failed sensor read
    pub fn failure_retry_interval(&self) -> Duration {
        secs_or_max(self.poll_interval_s.max(timing::MIN_FAILURE_RETRY_S))
    }

    /// Minimum dwell time between switches
    pub fn min_switch(&self) -> Duration {
        secs_or_max(self.min_switch_s)
    }
}

/// Seconds as a [`Duration`], saturating for values validation rejects
fn secs_or_max(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or(if secs > 0.0 { Duration::MAX } else { Duration::ZERO })
}

/// Load the fan configuration from a TOML file.
///
/// A missing file is not an error: a warning is logged and defaults are used.
/// The result is not validated yet; call [`FanConfig::validated`].
pub fn load_config(path: impl AsRef<Path>) -> Result<FanConfig> {
    let path = path.as_ref();
    if !path.exists() {
        warn!("Config file {} not found, using defaults", path.display());
        return Ok(FanConfig::default());
    }

    let content = std::fs::read_to_string(path).map_err(|source| FanctrlError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    FanConfig::from_toml_str(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::io::Write;
    use std::sync::Arc;
    use tempfile::NamedTempFile;

    /// Log sink shared between the test and the subscriber
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Run `f` with WARN and above captured as text
    fn capture_warnings<T>(f: impl FnOnce() -> T) -> (T, String) {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .with_writer(move || writer.clone())
            .finish();
        let result = tracing::subscriber::with_default(subscriber, f);
        let logs = String::from_utf8(buffer.0.lock().clone()).unwrap();
        (result, logs)
    }

    #[test]
    fn test_defaults_when_table_missing() {
        let config = FanConfig::from_toml_str("").unwrap();
        assert_eq!(config, FanConfig::default());
        assert_eq!(config.gpio_pin, 33);
        assert_eq!(config.temp_path, "/sys/class/thermal/thermal_zone0/temp");
    }

    #[test]
    fn test_example_file_matches_defaults() {
        let config = FanConfig::from_toml_str(include_str!("../../fanctrl.example.toml")).unwrap();
        assert_eq!(config, FanConfig::default());
    }

    #[test]
    fn test_partial_fan_table() {
        let toml = r#"
            [fan]
            gpio_pin = 17
            active_high = false
            temp_on_c = 60.0
        "#;
        let config = FanConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.gpio_pin, 17);
        assert!(!config.active_high);
        assert_eq!(config.temp_on_c, 60.0);
        assert_eq!(config.temp_off_c, 45.0);
        assert_eq!(config.poll_interval_s, 5.0);
    }

    #[test]
    fn test_inverted_thresholds_fall_back() {
        let mut config = FanConfig {
            temp_on_c: 40.0,
            temp_off_c: 45.0,
            ..FanConfig::default()
        };
        let (corrected, logs) = capture_warnings(|| config.normalize_thresholds());
        assert!(corrected);
        assert_eq!(config.temp_on_c, 55.0);
        assert_eq!(config.temp_off_c, 45.0);
        assert!(logs.contains("WARN"), "{}", logs);
        assert!(logs.contains("temp_on_c=40, temp_off_c=45"), "{}", logs);
        assert!(logs.contains("Falling back to defaults on=55, off=45"), "{}", logs);
    }

    #[test]
    fn test_narrow_gap_falls_back() {
        let mut config = FanConfig {
            temp_on_c: 50.0,
            temp_off_c: 49.5,
            ..FanConfig::default()
        };
        assert!(config.normalize_thresholds());
        assert_eq!((config.temp_on_c, config.temp_off_c), (55.0, 45.0));
    }

    #[test]
    fn test_valid_thresholds_kept() {
        let mut config = FanConfig {
            temp_on_c: 50.0,
            temp_off_c: 49.0,
            ..FanConfig::default()
        };
        let (corrected, logs) = capture_warnings(|| config.normalize_thresholds());
        assert!(!corrected);
        assert_eq!((config.temp_on_c, config.temp_off_c), (50.0, 49.0));
        assert!(logs.is_empty(), "{}", logs);
    }

    #[test]
    fn test_invalid_timing_rejected() {
        let config = FanConfig {
            poll_interval_s: 0.0,
            ..FanConfig::default()
        };
        let err = config.validated().unwrap_err();
        assert_eq!(err.exit_code(), 2);

        let config = FanConfig {
            min_switch_s: -1.0,
            ..FanConfig::default()
        };
        assert!(config.validate_timing().is_err());

        let config = FanConfig {
            min_switch_s: 0.0,
            ..FanConfig::default()
        };
        assert!(config.validate_timing().is_ok());
    }

    #[test]
    fn test_oversized_intervals_rejected() {
        let config = FanConfig {
            min_switch_s: 1e20,
            ..FanConfig::default()
        };
        let err = config.validated().unwrap_err();
        assert!(matches!(&err, FanctrlError::InvalidConfig { field, .. } if field == "min_switch_s"));
        assert_eq!(err.exit_code(), 2);

        let config = FanConfig {
            poll_interval_s: 1e20,
            min_switch_s: 1e20,
            ..FanConfig::default()
        };
        let err = config.validated().unwrap_err();
        assert!(matches!(&err, FanctrlError::InvalidConfig { field, .. } if field == "poll_interval_s"));

        // Large but representable values are accepted
        let config = FanConfig {
            poll_interval_s: 86_400.0 * 365.0,
            min_switch_s: 86_400.0,
            ..FanConfig::default()
        };
        let config = config.validated().unwrap();
        assert_eq!(config.min_switch(), Duration::from_secs(86_400));
    }

    #[test]
    fn test_interval_accessors_never_panic() {
        let config = FanConfig {
            poll_interval_s: 1e20,
            min_switch_s: -1.0,
            ..FanConfig::default()
        };
        assert_eq!(config.poll_interval(), Duration::MAX);
        assert_eq!(config.failure_retry_interval(), Duration::MAX);
        assert_eq!(config.min_switch(), Duration::ZERO);
    }

    #[test]
    fn test_failure_retry_has_floor() {
        let config = FanConfig {
            poll_interval_s: 0.2,
            ..FanConfig::default()
        };
        assert_eq!(config.failure_retry_interval(), Duration::from_secs(1));

        let config = FanConfig::default();
        assert_eq!(config.failure_retry_interval(), Duration::from_secs(5));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = load_config("/nonexistent/fanctrl/config.toml").unwrap();
        assert_eq!(config, FanConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[fan]\ngpio_chip = \"gpiochip4\"\nmin_switch_s = 30").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.gpio_chip, "gpiochip4");
        assert_eq!(config.min_switch_s, 30.0);
    }

    #[test]
    fn test_load_rejects_bad_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[fan\ngpio_pin = ").unwrap();
        assert!(matches!(load_config(file.path()), Err(FanctrlError::TomlParse(_))));
    }
}
