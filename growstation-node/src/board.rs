//! Host stand-ins for the on-board peripherals

use growstation_hal::analog::{AnalogFrontEnd, CHANNEL_COUNT};
use growstation_hal::system::{pack_gpio_levels, SystemProbe};
use growstation_hal::update::{UpdateObserver, UpdateSession};

/// Probe front end returning configured raw values
pub struct SimulatedFrontEnd {
    raw: [i16; CHANNEL_COUNT],
}

impl SimulatedFrontEnd {
    pub fn new(raw: [i16; CHANNEL_COUNT]) -> Self {
        Self { raw }
    }
}

impl AnalogFrontEnd for SimulatedFrontEnd {
    fn read_raw(&mut self, channel: u8) -> i16 {
        self.raw
            .get(usize::from(channel))
            .copied()
            .unwrap_or_default()
    }
}

/// System probe for the host
///
/// There is no heap limit to report, so the free heap reads as 0. Pin
/// levels read as all-low.
pub struct HostProbe {
    analog: u16,
}

impl HostProbe {
    pub fn new(analog: u16) -> Self {
        Self { analog }
    }
}

impl SystemProbe for HostProbe {
    fn free_heap(&self) -> u32 {
        0
    }

    fn ambient_analog(&mut self) -> u16 {
        self.analog
    }

    fn gpio_levels(&self) -> u32 {
        pack_gpio_levels(0, 0, false)
    }
}

/// Update session that never receives an image
pub struct NoUpdates;

impl UpdateSession for NoUpdates {
    fn poll(&mut self, _observer: &mut dyn UpdateObserver) {}
}
