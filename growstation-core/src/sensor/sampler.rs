//! Soil-moisture sampler

use growstation_hal::analog::{AnalogFrontEnd, CHANNEL_COUNT};

use crate::config::Calibration;

/// Last calibrated reading of every probe channel
///
/// Values are moisture percentages in 0..=100. Overwritten on every
/// sampling tick and never historized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorReading {
    /// Per-channel percentage, indexed by channel
    pub soil: [u8; CHANNEL_COUNT],
}

impl SensorReading {
    /// Build a reading from known percentages
    pub const fn new(soil: [u8; CHANNEL_COUNT]) -> Self {
        Self { soil }
    }
}

/// Reads the four probe channels and applies the calibration window
pub struct SensorSampler<A> {
    front_end: A,
    calibration: Calibration,
}

impl<A: AnalogFrontEnd> SensorSampler<A> {
    /// Create a sampler over an analog front end
    pub fn new(front_end: A, calibration: Calibration) -> Self {
        Self {
            front_end,
            calibration,
        }
    }

    /// Calibration window in use
    pub fn calibration(&self) -> Calibration {
        self.calibration
    }

    /// Access the analog front end
    pub fn front_end_mut(&mut self) -> &mut A {
        &mut self.front_end
    }

    /// Take one sample of every channel and overwrite `reading`
    pub fn sample(&mut self, reading: &mut SensorReading) {
        for (channel, slot) in reading.soil.iter_mut().enumerate() {
            let raw = self.front_end.read_raw(channel as u8);
            let percent = self.calibration.percent(raw);
            debug!("AIN{}: {} SOIL{}: {}%", channel, raw, channel, percent);
            *slot = percent;
        }
    }
}
