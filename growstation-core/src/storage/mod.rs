//! File storage
//!
//! Path handling, the policy wrapper over the flash store and the
//! streamed transfer state machines.

pub mod path;
pub mod store;
pub mod transfer;

pub use path::{format_bytes, PathError, StorePath, GZIP_SUFFIX};
pub use store::{FileStore, ListEntry, Resolved, StoreError};
pub use transfer::{Download, Transfer, UploadSession, UploadStatus, UploadSummary};
