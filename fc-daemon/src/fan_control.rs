//! Fan Control Loop
//!
//! Reads the sensor, feeds the hysteresis controller and sleeps until the next
//! tick. Sensor I/O runs on the blocking pool so a slow sysfs read never stalls
//! the status server; the read itself has no timeout.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use fc_core::{Actuator, FanConfig, FanctrlError, HysteresisController, SensorSource, ShutdownCoordinator, TickOutcome};

/// Run the control loop until shutdown is requested, then hand the controller back
pub async fn run_control_loop<A, S>(
    mut controller: HysteresisController<A>,
    sensor: S,
    config: &FanConfig,
    shutdown: Arc<ShutdownCoordinator>,
) -> HysteresisController<A>
where
    A: Actuator,
    S: SensorSource + 'static,
{
    info!("Fan control loop starting");

    let sensor = Arc::new(Mutex::new(sensor));
    let poll = config.poll_interval();
    let retry = config.failure_retry_interval();
    let mut iteration: u64 = 0;

    loop {
        if shutdown.is_requested() {
            break;
        }
        iteration += 1;

        let reading = read_sensor(&sensor).await;
        let outcome = controller.tick(reading, Instant::now());
        let pause = next_pause(outcome, poll, retry);
        debug!(iteration, ?outcome, pause_ms = pause.as_millis() as u64, "CONTROL: tick complete");

        if shutdown.sleep(pause).await {
            break;
        }
    }

    info!("Fan control loop stopped after {} iterations", iteration);
    controller
}

/// Pause before the next tick
fn next_pause(outcome: TickOutcome, poll: Duration, retry: Duration) -> Duration {
    match outcome {
        TickOutcome::SensorFailed => retry,
        _ => poll,
    }
}

/// Read the sensor on the blocking pool
async fn read_sensor<S: SensorSource + 'static>(sensor: &Arc<Mutex<S>>) -> fc_core::Result<f64> {
    let sensor = sensor.clone();
    tokio::task::spawn_blocking(move || sensor.lock().read_celsius())
        .await
        .map_err(|e| FanctrlError::SensorTask(e.to_string()))?
}
