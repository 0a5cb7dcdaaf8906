//! System state probes
//!
//! Readings reported by the status endpoint that come from the chip
//! itself rather than from the soil probes.

/// Chip-level state source
pub trait SystemProbe {
    /// Free heap memory in bytes
    fn free_heap(&self) -> u32;

    /// Reading of the on-chip analog input
    fn ambient_analog(&mut self) -> u16;

    /// Packed digital pin levels
    ///
    /// Bits 0-15 carry GPIO0-15 (input or output latch), bit 16 carries
    /// GPIO16.
    fn gpio_levels(&self) -> u32;
}

/// Pack the 16 regular GPIO levels and GPIO16 into one bitmask
pub fn pack_gpio_levels(inputs: u32, outputs: u32, gpio16: bool) -> u32 {
    ((inputs | outputs) & 0xFFFF) | ((gpio16 as u32) << 16)
}
