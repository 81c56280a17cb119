//! Constants and configuration defaults for fanctrl
//!
//! Centralizes the magic numbers and paths used by the controller and the daemon.

/// System paths
pub mod paths {
    /// Default configuration file
    pub const DEFAULT_CONFIG_FILE: &str = "/config/config.toml";

    /// Default thermal zone used as temperature source
    pub const DEFAULT_TEMP_PATH: &str = "/sys/class/thermal/thermal_zone0/temp";

    /// Character device directory holding gpiochipN nodes
    pub const GPIO_DEV_DIR: &str = "/dev";

    /// Legacy sysfs GPIO class directory, chips named by base line number
    pub const GPIO_SYSFS_DIR: &str = "/sys/class/gpio";

    /// GPIO bus devices, named like the /dev character devices
    pub const GPIO_BUS_DIR: &str = "/sys/bus/gpio/devices";
}

/// Environment variables read by the daemon
pub mod env {
    pub const CONFIG_PATH: &str = "FANCTRL_CONFIG";
    pub const STATUS_PORT: &str = "FANCTRL_STATUS_PORT";
    pub const MOCK_GPIO: &str = "FANCTRL_MOCK_GPIO";
    pub const LOG_FILTER: &str = "FANCTRL_LOG";
}

/// Fan configuration defaults
pub mod fan {
    /// Safe switch-on threshold used when the configured pair is invalid
    pub const DEFAULT_TEMP_ON_C: f64 = 55.0;

    /// Safe switch-off threshold used when the configured pair is invalid
    pub const DEFAULT_TEMP_OFF_C: f64 = 45.0;

    /// Minimum gap between the on and off thresholds
    pub const MIN_THRESHOLD_GAP_C: f64 = 1.0;

    pub const DEFAULT_GPIO_PIN: u32 = 33;
    pub const DEFAULT_GPIO_CHIP: &str = "gpiochip0";
    pub const DEFAULT_POLL_INTERVAL_S: f64 = 5.0;
    pub const DEFAULT_MIN_SWITCH_S: f64 = 10.0;
    pub const DEFAULT_STATUS_PORT: u16 = 9101;
}

/// Control loop timing
pub mod timing {
    /// Lower bound on the pause after a failed sensor read
    pub const MIN_FAILURE_RETRY_S: f64 = 1.0;
}

/// Status reporting
pub mod status {
    /// Number of switch events kept in the history ring
    pub const MAX_SWITCH_HISTORY: usize = 4;

    /// Error code published when the temperature read fails
    pub const ERROR_TEMP_READ_FAILED: &str = "temp_read_failed";
}

/// Thermal sensor parsing
pub mod sensor {
    /// Raw values above this are millidegrees
    pub const MILLIDEGREE_THRESHOLD: f64 = 1000.0;
}
