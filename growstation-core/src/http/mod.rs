//! File-management HTTP service
//!
//! - [`content_type`] - MIME type by extension
//! - [`router`] - Exact (method, path) route table
//! - [`handlers`] - Endpoint behavior and the static fallback
//! - [`server`] - Connection state machine driven from the control loop

pub mod content_type;
pub mod handlers;
pub mod router;
pub mod server;

pub use handlers::{Body, Reply, Request};
pub use router::{Endpoint, ROUTES};
pub use server::{CloseReason, HttpServer};
