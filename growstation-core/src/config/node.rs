//! Node configuration

use heapless::String;

use super::calibration::Calibration;

use serde::{Deserialize, Serialize};

/// Maximum length of the index object name
pub const MAX_INDEX_NAME_LEN: usize = 32;

/// Maximum length of the advertised hostname
pub const MAX_HOSTNAME_LEN: usize = growstation_hal::net::MAX_HOSTNAME_LEN;

/// Configuration validation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Calibration window is empty or inverted
    InvalidCalibration,
    /// Sampling period is zero
    ZeroSamplePeriod,
    /// Idle timeout is zero
    ZeroIdleTimeout,
    /// Index object name is empty or contains a separator
    InvalidIndexName,
}

/// Runtime configuration of one node
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Network name, also used in the editor hint at boot
    pub hostname: String<MAX_HOSTNAME_LEN>,
    /// HTTP listening port
    pub http_port: u16,
    /// Sensor sampling period (ms)
    pub sample_period_ms: u32,
    /// Connection idle time before an in-flight request is dropped (ms)
    pub idle_timeout_ms: u32,
    /// Object served for paths ending in the separator
    pub index_name: String<MAX_INDEX_NAME_LEN>,
    /// Probe calibration window
    pub calibration: Calibration,
}

impl Default for NodeConfig {
    fn default() -> Self {
        let mut hostname = String::new();
        let _ = hostname.push_str("espgrowstation");
        let mut index_name = String::new();
        let _ = index_name.push_str("index.htm");

        Self {
            hostname,
            http_port: 80,
            sample_period_ms: 1000,
            idle_timeout_ms: 5000,
            index_name,
            calibration: Calibration::default(),
        }
    }
}

impl NodeConfig {
    /// Check the values the runtime relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.calibration.is_valid() {
            return Err(ConfigError::InvalidCalibration);
        }
        if self.sample_period_ms == 0 {
            return Err(ConfigError::ZeroSamplePeriod);
        }
        if self.idle_timeout_ms == 0 {
            return Err(ConfigError::ZeroIdleTimeout);
        }
        if self.index_name.is_empty() || self.index_name.contains('/') {
            return Err(ConfigError::InvalidIndexName);
        }
        Ok(())
    }
}
