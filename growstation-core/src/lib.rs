//! Board-agnostic cooperative runtime for the Growstation sensor node
//!
//! Everything the node does happens inside one control loop with no
//! threads and no preemption. Each component below exposes a non-blocking
//! step that the [`runtime::Node`] drives once per iteration:
//!
//! - File-management HTTP service over the flash store ([`http`])
//! - Streamed uploads and downloads ([`storage::transfer`])
//! - Periodic soil-moisture sampling ([`sensor`], [`scheduler`])
//! - JSON status reports ([`status`])
//! - Update-session progress logging ([`update`])
//! - Configuration type definitions ([`config`])

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

// Must come first so the logging macros are visible to every module
#[macro_use]
mod fmt;

pub mod config;
pub mod http;
pub mod runtime;
pub mod scheduler;
pub mod sensor;
pub mod status;
pub mod storage;
pub mod update;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{Calibration, ConfigError, NodeConfig};
pub use runtime::{Device, Job, Node, NodeError};
pub use sensor::{SensorReading, SensorSampler};
pub use storage::{FileStore, StorePath};
