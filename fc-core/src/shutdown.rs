//! Cooperative shutdown
//!
//! Signal handlers only raise a flag and wake the control loop. The loop checks
//! the flag at the top of every iteration and while sleeping, so a tick is never
//! cut short. Once the loop has returned the actuator, [`ShutdownCoordinator::finish`]
//! drives the fan to its safe state and releases the line.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{error, info};

use crate::actuator::Actuator;

/// Termination flag shared by the signal task and the control loop
#[derive(Debug, Default)]
pub struct ShutdownCoordinator {
    requested: AtomicBool,
    notify: Notify,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the control loop to stop and wake it if it is sleeping
    pub fn request(&self) {
        if !self.requested.swap(true, Ordering::SeqCst) {
            info!("Shutdown requested");
        }
        // notify_one keeps a permit if the loop is not waiting yet
        self.notify.notify_one();
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Sleep for `duration` unless shutdown is requested first.
    /// Returns true if the sleep ended because of a shutdown request.
    pub async fn sleep(&self, duration: Duration) -> bool {
        if self.is_requested() {
            return true;
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => self.is_requested(),
            _ = self.notify.notified() => true,
        }
    }

    /// Drive the fan off, then release the line, even if switching off failed
    pub fn finish<A: Actuator + ?Sized>(&self, actuator: &mut A) {
        if let Err(e) = actuator.set(false) {
            error!("Failed to switch fan OFF during shutdown: {}", e);
        }
        if let Err(e) = actuator.release() {
            error!("Failed to release {} actuator: {}", actuator.backend(), e);
        }
        info!("Actuator released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::MockActuator;
    use crate::{FanctrlError, Result};
    use std::sync::Arc;
    use std::time::Instant;

    #[tokio::test]
    async fn test_sleep_runs_without_request() {
        let shutdown = ShutdownCoordinator::new();
        assert!(!shutdown.sleep(Duration::from_millis(10)).await);
        assert!(!shutdown.is_requested());
    }

    #[tokio::test]
    async fn test_request_before_sleep() {
        let shutdown = ShutdownCoordinator::new();
        shutdown.request();
        let start = Instant::now();
        assert!(shutdown.sleep(Duration::from_secs(30)).await);
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_request_interrupts_sleep() {
        let shutdown = Arc::new(ShutdownCoordinator::new());
        let requester = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            requester.request();
        });

        let start = Instant::now();
        assert!(shutdown.sleep(Duration::from_secs(30)).await);
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_finish_turns_off_and_releases() {
        let fan = MockActuator::new(true);
        let mut actuator = fan.clone();
        actuator.set(true).unwrap();

        ShutdownCoordinator::new().finish(&mut actuator);
        let record = fan.record();
        assert_eq!(record.level(), Some(0));
        assert_eq!(record.releases, 1);
    }

    struct StuckActuator {
        released: bool,
    }

    impl Actuator for StuckActuator {
        fn set(&mut self, _on: bool) -> Result<()> {
            Err(FanctrlError::Io(std::io::Error::from(std::io::ErrorKind::BrokenPipe)))
        }

        fn release(&mut self) -> Result<()> {
            self.released = true;
            Ok(())
        }

        fn backend(&self) -> &'static str {
            "stuck"
        }
    }

    #[test]
    fn test_finish_releases_after_failed_off() {
        let mut actuator = StuckActuator { released: false };
        ShutdownCoordinator::new().finish(&mut actuator);
        assert!(actuator.released);
    }
}
