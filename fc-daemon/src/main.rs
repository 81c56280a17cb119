//! fanctrl Daemon (fanctrld)
//!
//! Polls a thermal sensor and switches a GPIO-driven fan with hysteresis.
//! Live state is served as JSON on `GET /status`.
//!
//! # Startup
//! - Configuration from a TOML `[fan]` table, with environment overrides
//! - Bad thresholds fall back to 55/45 °C; bad intervals exit with status 2
//! - The GPIO line is requested and driven OFF before the loop starts
//!
//! # Shutdown
//! - SIGINT/SIGTERM stop the loop between ticks
//! - The fan is switched OFF, the line released, and the process exits 0

mod fan_control;
mod server;

use std::sync::Arc;
use tracing::{error, info, warn};

use fc_core::constants::{env as env_vars, paths};
use fc_core::display::format_context;
use fc_core::{
    load_config, open_actuator, FanConfig, HysteresisController, SensorSource, ShutdownCoordinator,
    StatusStore, ThermalZoneSensor,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// CLI
// ============================================================================

#[derive(Debug, PartialEq, Eq)]
enum CliAction {
    Run { config_path: Option<String> },
    Help,
    Version,
}

fn parse_args(args: &[String]) -> Result<CliAction, String> {
    let mut config_path = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => return Ok(CliAction::Help),
            "-v" | "--version" => return Ok(CliAction::Version),
            "-c" | "--config" => {
                i += 1;
                let path = args
                    .get(i)
                    .ok_or_else(|| "--config requires a path argument".to_string())?;
                config_path = Some(path.clone());
            }
            arg if arg.ends_with(".toml") && !arg.starts_with('-') => {
                config_path = Some(arg.to_string());
            }
            arg => return Err(format!("Unknown argument: {}", arg)),
        }
        i += 1;
    }

    Ok(CliAction::Run { config_path })
}

fn print_help() {
    eprintln!("fanctrld {} - GPIO fan controller", VERSION);
    eprintln!();
    eprintln!("USAGE:");
    eprintln!("    fanctrld [OPTIONS] [CONFIG.toml]");
    eprintln!();
    eprintln!("OPTIONS:");
    eprintln!("    -c, --config PATH   Config file (default {})", paths::DEFAULT_CONFIG_FILE);
    eprintln!("    -v, --version       Print version");
    eprintln!("    -h, --help          Print this help");
    eprintln!();
    eprintln!("ENVIRONMENT:");
    eprintln!("    {}      Config file path", env_vars::CONFIG_PATH);
    eprintln!("    {} Status HTTP port", env_vars::STATUS_PORT);
    eprintln!("    {}   Use a mock GPIO line when set", env_vars::MOCK_GPIO);
    eprintln!("    {}         Log filter (trace, debug, info, warn, error)", env_vars::LOG_FILTER);
}

fn print_version() {
    println!("fanctrld {}", VERSION);
}

// ============================================================================
// Logging
// ============================================================================

/// Log to stdout with second-precision local timestamps; WARN and above also go to stderr
fn init_logging(filter: &str) {
    use tracing::Level;
    use tracing_subscriber::fmt::{time::ChronoLocal, writer::MakeWriterExt};
    use tracing_subscriber::prelude::*;

    let timer = ChronoLocal::new("%Y-%m-%dT%H:%M:%S%:z".to_string());

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_timer(timer.clone())
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stdout);

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_timer(timer)
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr.with_max_level(Level::WARN));

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter))
        .with(stdout_layer)
        .with(stderr_layer)
        .init();
}

// ============================================================================
// Configuration
// ============================================================================

fn resolve_config_path(cli_path: Option<String>) -> String {
    cli_path
        .or_else(|| std::env::var(env_vars::CONFIG_PATH).ok())
        .unwrap_or_else(|| paths::DEFAULT_CONFIG_FILE.to_string())
}

/// Apply environment overrides on top of the file configuration
fn apply_env_overrides(
    config: &mut FanConfig,
    status_port: Option<String>,
    mock_gpio: Option<String>,
) {
    if let Some(port) = status_port {
        match port.trim().parse::<u16>() {
            Ok(port) => config.status_port = port,
            Err(e) => warn!(
                "Ignoring {}={:?}: {}; using port {}",
                env_vars::STATUS_PORT,
                port,
                e,
                config.status_port
            ),
        }
    }

    if mock_gpio.is_some_and(|v| !v.is_empty()) {
        config.mock_gpio = true;
    }
}

// ============================================================================
// Signals
// ============================================================================

/// Forward SIGINT/SIGTERM to the shutdown coordinator
fn spawn_signal_listener(shutdown: Arc<ShutdownCoordinator>) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = match signal(SignalKind::interrupt()) {
        Ok(s) => s,
        Err(e) => {
            warn!("Failed to install SIGINT handler: {}", e);
            return;
        }
    };
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            warn!("Failed to install SIGTERM handler: {}", e);
            return;
        }
    };

    tokio::spawn(async move {
        let name = tokio::select! {
            _ = sigint.recv() => "SIGINT",
            _ = sigterm.recv() => "SIGTERM",
        };
        info!("Signal {} received, shutting down", name);
        shutdown.request();
    });
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args: Vec<String> = std::env::args().collect();
    let config_path = match parse_args(&args) {
        Ok(CliAction::Help) => {
            print_help();
            return;
        }
        Ok(CliAction::Version) => {
            print_version();
            return;
        }
        Ok(CliAction::Run { config_path }) => config_path,
        Err(e) => {
            eprintln!("Error: {}", e);
            print_help();
            std::process::exit(1);
        }
    };

    let log_filter = std::env::var(env_vars::LOG_FILTER).unwrap_or_else(|_| "info".to_string());
    init_logging(&log_filter);

    // PHASE 1: Configuration
    let config_path = resolve_config_path(config_path);
    let mut config = match load_config(&config_path) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load config {}: {}", config_path, e);
            std::process::exit(e.exit_code());
        }
    };
    apply_env_overrides(
        &mut config,
        std::env::var(env_vars::STATUS_PORT).ok(),
        std::env::var(env_vars::MOCK_GPIO).ok(),
    );
    let config = match config.validated() {
        Ok(c) => c,
        Err(e) => {
            error!("{}", e);
            std::process::exit(e.exit_code());
        }
    };

    // PHASE 2: Actuator, driven OFF before anything else runs
    let actuator = match open_actuator(&config) {
        Ok(a) => a,
        Err(e) => {
            error!("GPIO setup failed: {}", e);
            std::process::exit(e.exit_code());
        }
    };
    let backend = actuator.backend();

    // PHASE 3: Signals
    let shutdown = Arc::new(ShutdownCoordinator::new());
    spawn_signal_listener(shutdown.clone());

    // PHASE 4: Startup report
    info!("Version {}", VERSION);
    let mut sensor = ThermalZoneSensor::new(&config.temp_path);
    let start_temp = sensor.read_celsius().ok();
    info!(
        "Starting fanctrl: pin={} chip={} backend={} poll={}s {}",
        config.gpio_pin,
        config.gpio_chip,
        backend,
        config.poll_interval_s,
        format_context(start_temp, config.temp_on_c, config.temp_off_c)
    );

    // PHASE 5: Initial status, then the status server
    let status = Arc::new(StatusStore::new());
    let controller = HysteresisController::new(&config, actuator, status.clone(), VERSION);
    controller.publish_initial();

    let server_status = status.clone();
    let status_port = config.status_port;
    tokio::spawn(async move {
        if let Err(e) = server::run_server(status_port, server_status).await {
            error!("Status server stopped: {}", e);
        }
    });

    // PHASE 6: Control loop until a termination signal
    let controller = fan_control::run_control_loop(controller, sensor, &config, shutdown.clone()).await;

    // PHASE 7: Fan OFF, release the line, exit
    let mut actuator = controller.into_actuator();
    shutdown.finish(&mut actuator);
    info!("SHUTDOWN: fanctrld terminated gracefully");
    std::process::exit(0);
}
