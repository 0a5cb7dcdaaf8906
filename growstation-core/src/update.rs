//! Update-session observer
//!
//! The update session (image transport and flashing) is an external
//! collaborator polled from the control loop. [`UpdateLog`] receives its
//! lifecycle callbacks and turns them into log lines.

use growstation_hal::update::{UpdateError, UpdateObserver};

/// Lifecycle of the last observed update session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UpdatePhase {
    /// No session has started
    #[default]
    Idle,
    /// Image transfer in progress, with the last reported percentage
    Receiving(u8),
    /// Session failed
    Failed(UpdateError),
    /// Image accepted
    Complete,
}

/// Logs update progress
#[derive(Debug, Default)]
pub struct UpdateLog {
    phase: UpdatePhase,
}

impl UpdateLog {
    /// Create an observer in the idle phase
    pub const fn new() -> Self {
        Self {
            phase: UpdatePhase::Idle,
        }
    }

    /// Phase of the last observed session
    pub fn phase(&self) -> UpdatePhase {
        self.phase
    }
}

/// Integer percentage of `progress` out of `total`
///
/// A zero total reads 0 and the result never exceeds 100.
pub fn percent(progress: u32, total: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = u64::from(progress) * 100 / u64::from(total);
    pct.min(100) as u8
}

impl UpdateObserver for UpdateLog {
    fn on_start(&mut self) {
        info!("Update start");
        self.phase = UpdatePhase::Receiving(0);
    }

    fn on_progress(&mut self, progress: u32, total: u32) {
        let pct = percent(progress, total);
        // Progress arrives per received block; log each new percentage once
        if self.phase != UpdatePhase::Receiving(pct) {
            info!("Update progress: {}%", pct);
        }
        self.phase = UpdatePhase::Receiving(pct);
    }

    fn on_error(&mut self, error: UpdateError) {
        error!("Update error: {}", error.as_str());
        self.phase = UpdatePhase::Failed(error);
    }

    fn on_end(&mut self) {
        info!("Update end");
        self.phase = UpdatePhase::Complete;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent() {
        assert_eq!(percent(0, 1000), 0);
        assert_eq!(percent(500, 1000), 50);
        assert_eq!(percent(1000, 1000), 100);
        assert_eq!(percent(10, 0), 0);
        assert_eq!(percent(50, 99), 50);
        assert_eq!(percent(u32::MAX, u32::MAX), 100);
        assert_eq!(percent(200, 100), 100);
    }

    #[test]
    fn test_lifecycle() {
        let mut log = UpdateLog::new();
        assert_eq!(log.phase(), UpdatePhase::Idle);

        log.on_start();
        log.on_progress(250, 1000);
        assert_eq!(log.phase(), UpdatePhase::Receiving(25));

        log.on_end();
        assert_eq!(log.phase(), UpdatePhase::Complete);
    }

    #[test]
    fn test_error_kind_recorded() {
        let mut log = UpdateLog::new();
        log.on_start();
        log.on_error(UpdateError::Receive);
        assert_eq!(log.phase(), UpdatePhase::Failed(UpdateError::Receive));
        assert_eq!(UpdateError::Receive.as_str(), "Receive Failed");
    }
}
