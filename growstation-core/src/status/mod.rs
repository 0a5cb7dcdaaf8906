//! Status reporting
//!
//! Device and sensor state serialized as flat JSON documents, and the
//! streamed JSON listing of a stored directory.

pub mod json;
pub mod listing;
pub mod report;

pub use json::{measure, render, EncodeError, MAX_DOCUMENT_LEN};
pub use listing::{ListingError, ListingStream};
pub use report::SystemStatus;
