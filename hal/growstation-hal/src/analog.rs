//! Analog front end abstraction
//!
//! The node reads its soil probes through an external multi-channel ADC.
//! Conversion electronics live behind this trait; the core only ever sees
//! raw signed samples per channel.

/// Number of probe channels on the analog front end
pub const CHANNEL_COUNT: usize = 4;

/// Raw sample source for the probe channels
pub trait AnalogFrontEnd {
    /// Read one single-ended raw sample from `channel` (0-based)
    ///
    /// Must return promptly: it runs as a scheduled callback inside the
    /// cooperative loop.
    fn read_raw(&mut self, channel: u8) -> i16;
}
