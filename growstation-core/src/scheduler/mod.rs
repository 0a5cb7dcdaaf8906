//! Cooperative timer scheduler
//!
//! Periodic and one-shot jobs driven by polling from the control loop.

pub mod timer;

pub use timer::{Scheduler, SchedulerError, TimerId, MAX_TIMERS};
