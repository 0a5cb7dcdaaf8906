//! Streamed file transfers
//!
//! An upload arrives as a sequence of notifications (start, chunks, end)
//! spread over many loop iterations. [`Transfer`] holds the one session
//! that may be in flight and the exclusive write handle it owns.
//!
//! ```text
//!   begin ──► Starting ──write──► Writing ──finish──► Finished
//!                 │                  │
//!                 └──────abort───────┴──────────────► Aborted
//! ```
//!
//! A download is a [`Download`]: an open read handle drained into the
//! connection's transmit buffer a slice at a time.

use embedded_io::{Read, Write};

use growstation_hal::storage::{FlashStore, OpenMode, StorageError, StoredFile};

use super::path::StorePath;
use super::store::FileStore;

/// Upload session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UploadStatus {
    /// Destination opened, no data yet
    Starting,
    /// At least one chunk received
    Writing,
    /// End of transfer seen, handle closed
    Finished,
    /// Session abandoned, partial object removed
    Aborted,
}

/// Final state of an upload once it leaves the transfer slot
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UploadSummary {
    /// Normalized destination path
    pub path: StorePath,
    /// Bytes received from the client
    pub received: u32,
    /// `Finished` or `Aborted`
    pub status: UploadStatus,
    /// Every received byte reached the store
    pub intact: bool,
}

/// One in-flight upload
#[derive(Debug)]
pub struct UploadSession<F> {
    path: StorePath,
    /// Exclusive write handle; `None` once the destination failed
    handle: Option<F>,
    received: u32,
    status: UploadStatus,
    intact: bool,
}

impl<F> UploadSession<F> {
    /// Destination path
    pub fn path(&self) -> &StorePath {
        &self.path
    }

    /// Bytes received so far
    pub fn received(&self) -> u32 {
        self.received
    }

    /// Current status
    pub fn status(&self) -> UploadStatus {
        self.status
    }

    /// Check whether every chunk so far reached the store
    pub fn is_intact(&self) -> bool {
        self.intact
    }

    fn summary(self, status: UploadStatus) -> UploadSummary {
        UploadSummary {
            path: self.path,
            received: self.received,
            status,
            intact: self.intact,
        }
    }
}

/// Slot for the single upload that may be in flight
#[derive(Debug)]
pub struct Transfer<F> {
    session: Option<UploadSession<F>>,
}

impl<F> Default for Transfer<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F> Transfer<F> {
    /// Create an empty slot
    pub const fn new() -> Self {
        Self { session: None }
    }

    /// Check whether an upload is in flight
    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// The in-flight upload, if any
    pub fn session(&self) -> Option<&UploadSession<F>> {
        self.session.as_ref()
    }
}

impl<F: StoredFile> Transfer<F> {
    /// Start an upload to `filename`
    ///
    /// A session still in flight is aborted first. The destination is
    /// truncated. If it cannot be opened the session still runs but drops
    /// every chunk and reports itself as not intact.
    pub fn begin<S>(&mut self, store: &mut FileStore<S>, filename: &str) -> UploadStatus
    where
        S: FlashStore<File = F>,
    {
        if let Some(stale) = self.abort(store) {
            warn!("upload {} superseded", stale.path.as_str());
        }

        let path = match StorePath::normalize(filename) {
            Ok(path) => path,
            Err(e) => {
                warn!("upload name rejected: {:?}", e);
                self.session = Some(UploadSession {
                    path: StorePath::root(),
                    handle: None,
                    received: 0,
                    status: UploadStatus::Starting,
                    intact: false,
                });
                return UploadStatus::Starting;
            }
        };
        info!("handleFileUpload Name: {}", path.as_str());

        let handle = if path.is_root() {
            None
        } else {
            store
                .open(&path, OpenMode::Write)
                .map_err(|e| warn!("upload open {} failed: {:?}", path.as_str(), e))
                .ok()
        };

        let intact = handle.is_some();
        self.session = Some(UploadSession {
            path,
            handle,
            received: 0,
            status: UploadStatus::Starting,
            intact,
        });
        UploadStatus::Starting
    }

    /// Append one chunk, in arrival order
    ///
    /// Ignored when no upload is in flight.
    pub fn write(&mut self, chunk: &[u8]) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        session.status = UploadStatus::Writing;
        session.received = session.received.saturating_add(chunk.len() as u32);

        if let Some(handle) = session.handle.as_mut() {
            if let Err(e) = handle.write_all(chunk) {
                warn!("upload write {} failed: {:?}", session.path.as_str(), e);
                session.handle = None;
                session.intact = false;
            }
        }
    }

    /// Close the in-flight upload
    pub fn finish(&mut self) -> Option<UploadSummary> {
        let mut session = self.session.take()?;

        if let Some(mut handle) = session.handle.take() {
            if let Err(e) = handle.flush() {
                warn!("upload flush {} failed: {:?}", session.path.as_str(), e);
                session.intact = false;
            }
        }
        info!("handleFileUpload Size: {}", session.received);

        Some(session.summary(UploadStatus::Finished))
    }

    /// Abandon the in-flight upload and remove what was written
    pub fn abort<S>(&mut self, store: &mut FileStore<S>) -> Option<UploadSummary>
    where
        S: FlashStore<File = F>,
    {
        let mut session = self.session.take()?;

        if session.handle.take().is_some() {
            if let Err(e) = store.remove(&session.path) {
                warn!("removing partial {} failed: {:?}", session.path.as_str(), e);
            }
        }
        warn!(
            "upload {} aborted after {} bytes",
            session.path.as_str(),
            session.received
        );

        Some(session.summary(UploadStatus::Aborted))
    }
}

/// An object being streamed to a client
#[derive(Debug)]
pub struct Download<F> {
    file: F,
    remaining: u32,
}

impl<F: StoredFile> Download<F> {
    /// Stream `file` from its start
    pub fn new(file: F) -> Self {
        let remaining = file.size();
        Self { file, remaining }
    }

    /// Bytes not yet produced
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Check whether the whole object has been produced
    pub fn is_done(&self) -> bool {
        self.remaining == 0
    }

    /// Read the next slice of the object into `buf`
    ///
    /// An object that ends before its reported size is an error, since the
    /// response length has already been announced.
    pub fn fill(&mut self, buf: &mut [u8]) -> Result<usize, StorageError> {
        let want = buf.len().min(self.remaining as usize);
        if want == 0 {
            return Ok(0);
        }

        let n = self.file.read(&mut buf[..want])?;
        if n == 0 {
            return Err(StorageError::Io);
        }
        self.remaining -= n as u32;
        Ok(n)
    }
}
