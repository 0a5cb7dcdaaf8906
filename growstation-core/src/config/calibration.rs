//! Soil probe calibration window
//!
//! Capacitive probes read high in dry soil and low in wet soil. A raw
//! sample is clamped into the `[wet, dry]` window and mapped linearly onto
//! 0..=100 with the direction inverted, so `wet` reads 100 % and `dry`
//! reads 0 %.

use serde::{Deserialize, Serialize};

/// Raw reading of a probe in water
pub const DEFAULT_WET: i16 = 700;

/// Raw reading of a probe in dry air
pub const DEFAULT_DRY: i16 = 1400;

/// Calibration window shared by all four probe channels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Serialize, Deserialize)]
#[serde(default)]
pub struct Calibration {
    /// Raw value that maps to 100 %
    pub wet: i16,
    /// Raw value that maps to 0 %
    pub dry: i16,
}

impl Default for Calibration {
    fn default() -> Self {
        Self::new(DEFAULT_WET, DEFAULT_DRY)
    }
}

impl Calibration {
    /// Create a calibration window
    pub const fn new(wet: i16, dry: i16) -> Self {
        Self { wet, dry }
    }

    /// Check that the window is non-empty (`wet < dry`)
    pub fn is_valid(&self) -> bool {
        self.wet < self.dry
    }

    /// Clamp a raw sample into the window
    pub fn clamp(&self, raw: i16) -> i16 {
        raw.max(self.wet).min(self.dry)
    }

    /// Map a raw sample to a moisture percentage
    ///
    /// Integer math with truncating division, so the window midpoint maps
    /// to exactly 50 when the span is even. An invalid window reads 0.
    pub fn percent(&self, raw: i16) -> u8 {
        if !self.is_valid() {
            return 0;
        }

        let wet = i32::from(self.wet);
        let span = i32::from(self.dry) - wet;
        let clamped = i32::from(self.clamp(raw));

        let pct = (clamped - wet) * -100 / span + 100;
        pct.clamp(0, 100) as u8
    }
}
