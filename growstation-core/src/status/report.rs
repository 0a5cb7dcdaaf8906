//! JSON documents served by the status endpoints

use serde::ser::{Serialize, SerializeStruct, Serializer};

use growstation_hal::analog::CHANNEL_COUNT;
use growstation_hal::system::SystemProbe;

use crate::sensor::SensorReading;

/// Device health snapshot: `{"heap":..,"analog":..,"gpio":..}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SystemStatus {
    /// Free heap in bytes
    pub heap: u32,
    /// On-chip analog input
    pub analog: u16,
    /// Packed digital pin levels
    pub gpio: u32,
}

impl SystemStatus {
    /// Take a snapshot from the system probe
    pub fn capture<P: SystemProbe>(probe: &mut P) -> Self {
        Self {
            heap: probe.free_heap(),
            analog: probe.ambient_analog(),
            gpio: probe.gpio_levels(),
        }
    }
}

/// Calibrated probe percentages: `{"soil0":..,"soil1":..,..}`
impl Serialize for SensorReading {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        const KEYS: [&str; CHANNEL_COUNT] = ["soil0", "soil1", "soil2", "soil3"];

        let mut doc = serializer.serialize_struct("SensorReading", CHANNEL_COUNT)?;
        for (&key, value) in KEYS.iter().zip(self.soil.iter()) {
            doc.serialize_field(key, value)?;
        }
        doc.end()
    }
}
