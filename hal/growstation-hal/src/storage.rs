//! Flash storage abstractions
//!
//! Provides traits for the path-addressed byte store that lives in the
//! node's onboard flash. Chip-specific implementations wrap their file
//! system (SPIFFS, LittleFS, a host directory, ...).
//!
//! Every operation runs inside the single cooperative control loop, so
//! implementations must complete in bounded, short time and never wait
//! indefinitely on the medium.

use core::ops::ControlFlow;

use heapless::String;

/// Maximum length of a stored object path, separator included
pub const MAX_PATH_LEN: usize = 64;

/// Path separator used for storage namespacing
pub const SEPARATOR: char = '/';

/// Receives the entries of a directory listing one at a time
///
/// Returning [`ControlFlow::Break`] ends the listing early.
pub type Visit<'a> = dyn FnMut(&DirEntry) -> ControlFlow<()> + 'a;

/// Errors from flash storage operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageError {
    /// No object at the requested path
    NotFound,
    /// Path is malformed or too long for the medium
    InvalidPath,
    /// Medium rejected the read, write or erase
    Io,
    /// No space left on the medium
    Full,
}

impl embedded_io::Error for StorageError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            StorageError::NotFound => embedded_io::ErrorKind::NotFound,
            StorageError::InvalidPath => embedded_io::ErrorKind::InvalidInput,
            StorageError::Full => embedded_io::ErrorKind::OutOfMemory,
            StorageError::Io => embedded_io::ErrorKind::Other,
        }
    }
}

/// How a stored object is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OpenMode {
    /// Read from the start of an existing object
    Read,
    /// Create the object, discarding any existing content
    Write,
}

/// Kind of a directory entry as reported by the medium
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EntryKind {
    /// Regular stored object
    File,
    /// Directory (only reported by media with real directories)
    Dir,
}

impl EntryKind {
    /// Name used for this kind in listings
    pub fn as_str(self) -> &'static str {
        match self {
            EntryKind::File => "file",
            EntryKind::Dir => "dir",
        }
    }
}

/// One entry of a directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DirEntry {
    /// Full path of the entry, starting with the separator
    pub path: String<MAX_PATH_LEN>,
    /// Size in bytes (0 for directories)
    pub size: u32,
    /// Entry kind
    pub kind: EntryKind,
}

/// An open handle on a stored object
///
/// Handles are exclusive: the holder is the only writer of the object until
/// the handle is dropped, which closes it.
pub trait StoredFile:
    embedded_io::Read + embedded_io::Write + embedded_io::ErrorType<Error = StorageError>
{
    /// Current size of the object in bytes
    fn size(&self) -> u32;
}

/// Path-addressed persistent byte storage
///
/// This is the only component that touches physical storage. Paths passed
/// in always start with [`SEPARATOR`].
pub trait FlashStore {
    /// Handle type returned by [`FlashStore::open`]
    type File: StoredFile;

    /// Check whether a stored object exists at `path`
    fn exists(&mut self, path: &str) -> bool;

    /// Open the object at `path`
    ///
    /// [`OpenMode::Write`] creates the object or truncates an existing one.
    fn open(&mut self, path: &str, mode: OpenMode) -> Result<Self::File, StorageError>;

    /// Delete the object at `path`
    fn remove(&mut self, path: &str) -> Result<(), StorageError>;

    /// Hand every entry directly under `dir` to `visit`
    ///
    /// Must not descend into subdirectories. Entries come in the same order
    /// on every call as long as the directory is unchanged, so a caller can
    /// resume a listing by skipping the entries it has already seen.
    fn list(&mut self, dir: &str, visit: &mut Visit<'_>) -> Result<(), StorageError>;
}
