//! Flash store wrapper
//!
//! [`FileStore`] sits between the request handlers and the raw
//! [`FlashStore`] capability. It owns path normalization, the rules for
//! creating and deleting objects, listing, and the lookup that picks the
//! compressed variant of a served object.

use core::ops::ControlFlow;

use heapless::String;
use serde::{Serialize, Serializer};

use growstation_hal::storage::{
    DirEntry, EntryKind, FlashStore, OpenMode, StorageError, MAX_PATH_LEN, SEPARATOR,
};

use super::path::{format_bytes, PathError, StorePath, GZIP_SUFFIX};
use crate::config::MAX_INDEX_NAME_LEN;

/// Errors from store operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StoreError {
    /// Target is the root, or the name cannot be normalized
    BadPath,
    /// Object already exists
    Exists,
    /// Object does not exist
    NotFound,
    /// Destination could not be opened for writing
    CreateFailed,
    /// Underlying flash store failed
    Storage(StorageError),
}

impl From<PathError> for StoreError {
    fn from(_: PathError) -> Self {
        StoreError::BadPath
    }
}

impl From<StorageError> for StoreError {
    fn from(e: StorageError) -> Self {
        StoreError::Storage(e)
    }
}

/// One entry of a directory listing, serialized as `{"type":..,"name":..}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ListEntry {
    /// Reported kind (always a file)
    #[serde(rename = "type", serialize_with = "kind_name")]
    pub kind: EntryKind,
    /// Object name without the leading separator
    pub name: String<MAX_PATH_LEN>,
}

fn kind_name<S: Serializer>(kind: &EntryKind, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(kind.as_str())
}

/// Object chosen to answer a static request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// Path as requested, with the index name appended for directories
    pub requested: StorePath,
    /// Path of the object that will actually be streamed
    pub stored: StorePath,
    /// `stored` is the compressed variant of `requested`
    pub compressed: bool,
}

/// Policy layer over the flash store
pub struct FileStore<S> {
    flash: S,
    index_name: String<MAX_INDEX_NAME_LEN>,
}

impl<S: FlashStore> FileStore<S> {
    /// Wrap a flash store
    pub fn new(flash: S, index_name: String<MAX_INDEX_NAME_LEN>) -> Self {
        Self { flash, index_name }
    }

    /// Access the underlying flash store
    pub fn flash_mut(&mut self) -> &mut S {
        &mut self.flash
    }

    /// Check if an object exists
    pub fn exists(&mut self, path: &StorePath) -> bool {
        self.flash.exists(path.as_str())
    }

    /// Open an object
    pub fn open(&mut self, path: &StorePath, mode: OpenMode) -> Result<S::File, StorageError> {
        self.flash.open(path.as_str(), mode)
    }

    /// Remove an object
    pub fn remove(&mut self, path: &StorePath) -> Result<(), StorageError> {
        self.flash.remove(path.as_str())
    }

    /// Create an empty object
    ///
    /// Fails on the root, on an existing object, or when the destination
    /// cannot be opened.
    pub fn create(&mut self, raw: &str) -> Result<StorePath, StoreError> {
        let path = StorePath::normalize(raw)?;
        info!("handleFileCreate: {}", path.as_str());

        if path.is_root() {
            return Err(StoreError::BadPath);
        }
        if self.exists(&path) {
            return Err(StoreError::Exists);
        }

        match self.flash.open(path.as_str(), OpenMode::Write) {
            // Dropping the handle closes the new empty object
            Ok(_file) => Ok(path),
            Err(e) => {
                warn!("create {} failed: {:?}", path.as_str(), e);
                Err(StoreError::CreateFailed)
            }
        }
    }

    /// Delete an object
    pub fn delete(&mut self, raw: &str) -> Result<StorePath, StoreError> {
        let path = StorePath::normalize(raw)?;
        info!("handleFileDelete: {}", path.as_str());

        if path.is_root() {
            return Err(StoreError::BadPath);
        }
        if !self.exists(&path) {
            return Err(StoreError::NotFound);
        }

        self.flash.remove(path.as_str()).map_err(|e| {
            warn!("delete {} failed: {:?}", path.as_str(), e);
            StoreError::Storage(e)
        })?;
        Ok(path)
    }

    /// Hand each file directly inside `dir` to `visit`
    ///
    /// Subdirectories are not followed and not reported. A directory that
    /// does not exist lists as empty.
    pub fn list<V>(&mut self, dir: &str, mut visit: V) -> Result<(), StoreError>
    where
        V: FnMut(&ListEntry) -> ControlFlow<()>,
    {
        let dir = StorePath::normalize(dir)?;

        let mut files = |entry: &DirEntry| {
            if entry.kind != EntryKind::File {
                return ControlFlow::Continue(());
            }
            let name = entry.path.strip_prefix(SEPARATOR).unwrap_or(entry.path.as_str());
            let mut owned = String::new();
            // Same capacity as the path it came from
            let _ = owned.push_str(name);
            visit(&ListEntry {
                kind: EntryKind::File,
                name: owned,
            })
        };

        match self.flash.list(dir.as_str(), &mut files) {
            Ok(()) | Err(StorageError::NotFound) => Ok(()),
            Err(e) => Err(StoreError::Storage(e)),
        }
    }

    /// Find the object that answers a request for `raw`
    ///
    /// Directory paths get the index name appended. When a compressed
    /// variant exists it is preferred over the plain object. Returns
    /// `Ok(None)` when neither exists.
    pub fn resolve(&mut self, raw: &str) -> Result<Option<Resolved>, PathError> {
        let mut requested = StorePath::normalize(raw)?;
        if requested.is_dir() {
            requested = requested.with_suffix(self.index_name.as_str())?;
        }

        if let Ok(compressed) = requested.with_suffix(GZIP_SUFFIX) {
            if self.exists(&compressed) {
                return Ok(Some(Resolved {
                    requested,
                    stored: compressed,
                    compressed: true,
                }));
            }
        }

        if self.exists(&requested) {
            return Ok(Some(Resolved {
                stored: requested.clone(),
                requested,
                compressed: false,
            }));
        }

        Ok(None)
    }

    /// Log every stored file with its size, subdirectories included
    pub fn log_contents(&mut self) {
        if let Err(e) = self.log_dir("/") {
            warn!("FS listing failed: {:?}", e);
        }
    }

    /// Recursion depth is bounded by [`MAX_PATH_LEN`]
    fn log_dir(&mut self, dir: &str) -> Result<(), StorageError> {
        let mut subdirs = 0usize;
        self.flash.list(dir, &mut |entry: &DirEntry| {
            match entry.kind {
                EntryKind::File => {
                    let size = format_bytes(entry.size);
                    info!("FS File: {}, size: {}", entry.path.as_str(), size.as_str());
                }
                EntryKind::Dir => subdirs += 1,
            }
            ControlFlow::Continue(())
        })?;

        // Listing is not reentrant: find each subdirectory with a fresh walk
        for wanted in 0..subdirs {
            let mut seen = 0usize;
            let mut found = None;
            self.flash.list(dir, &mut |entry: &DirEntry| {
                if entry.kind != EntryKind::Dir {
                    return ControlFlow::Continue(());
                }
                if seen == wanted {
                    found = Some(entry.path.clone());
                    return ControlFlow::Break(());
                }
                seen += 1;
                ControlFlow::Continue(())
            })?;

            if let Some(sub) = found {
                self.log_dir(sub.as_str())?;
            }
        }
        Ok(())
    }
}
