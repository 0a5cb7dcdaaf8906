//! Configuration types
//!
//! Board-agnostic configuration structures. The host build loads them from
//! TOML through their `serde` derives.

pub mod calibration;
pub mod node;

pub use calibration::*;
pub use node::*;
