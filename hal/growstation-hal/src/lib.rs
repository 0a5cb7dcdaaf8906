//! Growstation Hardware Abstraction Layer
//!
//! This crate defines the collaborator traits the node runtime is written
//! against. Board support (or the host build) implements them; the runtime
//! never touches hardware directly.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  growstation-core (cooperative runtime) │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  growstation-hal (this crate - traits)  │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │ board support │       │  host build   │
//! │  (on target)  │       │ (growstation- │
//! │               │       │     node)     │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`storage::FlashStore`], [`storage::StoredFile`] - Persistent storage
//! - [`analog::AnalogFrontEnd`] - Raw probe samples
//! - [`system::SystemProbe`] - Heap, on-chip analog and pin levels
//! - [`net::Listener`], [`net::Connection`] - Non-blocking HTTP transport
//! - [`update::UpdateSession`], [`update::UpdateObserver`] - Remote updates

#![no_std]
#![deny(unsafe_code)]

pub mod analog;
pub mod net;
pub mod storage;
pub mod system;
pub mod update;

// Re-export key traits at crate root for convenience
pub use analog::{AnalogFrontEnd, CHANNEL_COUNT};
pub use net::{Connection, LinkUp, Listener};
pub use storage::{
    DirEntry, EntryKind, FlashStore, OpenMode, StorageError, StoredFile, Visit,
};
pub use system::SystemProbe;
pub use update::{UpdateError, UpdateObserver, UpdateSession};
