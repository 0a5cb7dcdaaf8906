//! Soil probe sampling

pub mod sampler;

pub use sampler::{SensorReading, SensorSampler};
