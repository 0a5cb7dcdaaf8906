//! Streamed directory listing
//!
//! `GET /list` answers with a JSON array of `{"type":..,"name":..}` entries
//! that may be longer than any buffer on the node. The array is sized by
//! walking the directory once. Each transmit refill walks it again, skips
//! the entries already sent and serializes whole entries until the buffer
//! is full.

use core::ops::ControlFlow;

use growstation_hal::storage::FlashStore;

use super::json::{measure, EncodeError};
use crate::storage::{FileStore, StoreError, StorePath};

/// Listing failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ListingError {
    /// Walking the directory failed
    Store(StoreError),
    /// An entry could not be serialized
    Encode(EncodeError),
    /// Directory no longer matches the size announced for it
    Changed,
}

impl From<StoreError> for ListingError {
    fn from(e: StoreError) -> Self {
        ListingError::Store(e)
    }
}

/// One directory rendered as a JSON array, a buffer at a time
#[derive(Debug)]
pub struct ListingStream {
    dir: StorePath,
    /// Entries in the array
    count: usize,
    /// Index of the next entry to send
    next: usize,
    /// Exact length of the whole array
    length: usize,
    /// Bytes handed out so far
    produced: usize,
    /// Closing bracket sent
    closed: bool,
}

impl ListingStream {
    /// Size the listing of `dir`
    pub fn open<S: FlashStore>(store: &mut FileStore<S>, dir: &str) -> Result<Self, ListingError> {
        let dir = StorePath::normalize(dir).map_err(StoreError::from)?;

        let mut count = 0;
        let mut length = 2;
        let mut failed = None;
        store.list(dir.as_str(), |entry| match measure(entry) {
            Ok(len) => {
                length += len + usize::from(count > 0);
                count += 1;
                ControlFlow::Continue(())
            }
            Err(e) => {
                failed = Some(e);
                ControlFlow::Break(())
            }
        })?;

        if let Some(e) = failed {
            return Err(ListingError::Encode(e));
        }

        Ok(Self {
            dir,
            count,
            next: 0,
            length,
            produced: 0,
            closed: false,
        })
    }

    /// Exact length of the JSON array in bytes
    pub fn length(&self) -> usize {
        self.length
    }

    /// Number of entries in the array
    pub fn count(&self) -> usize {
        self.count
    }

    /// Check whether the whole array has been produced
    pub fn is_done(&self) -> bool {
        self.closed
    }

    /// Serialize the next part of the array into `buf`
    ///
    /// Returns the number of bytes written, 0 once the array is complete.
    pub fn fill<S: FlashStore>(
        &mut self,
        store: &mut FileStore<S>,
        buf: &mut [u8],
    ) -> Result<usize, ListingError> {
        if self.closed || buf.is_empty() {
            return Ok(0);
        }

        let mut pos = 0;
        if self.produced == 0 {
            buf[0] = b'[';
            pos = 1;
        }

        let count = self.count;
        let next = &mut self.next;
        let mut index = 0;
        let mut full = false;
        store.list(self.dir.as_str(), |entry| {
            if *next == count {
                return ControlFlow::Break(());
            }
            if index < *next {
                index += 1;
                return ControlFlow::Continue(());
            }

            let comma = usize::from(index > 0);
            let written = buf
                .get_mut(pos + comma..)
                .and_then(|dest| serde_json_core::to_slice(entry, dest).ok());
            let Some(len) = written else {
                full = true;
                return ControlFlow::Break(());
            };

            if comma == 1 {
                buf[pos] = b',';
            }
            pos += comma + len;
            index += 1;
            *next = index;
            ControlFlow::Continue(())
        })?;

        if self.next < self.count {
            if !full {
                warn!("{} shrank while listed", self.dir.as_str());
                return Err(ListingError::Changed);
            }
            if pos == 0 {
                return Err(ListingError::Encode(EncodeError::Overflow { needed: buf.len() + 1 }));
            }
        } else if pos < buf.len() {
            buf[pos] = b']';
            pos += 1;
            self.closed = true;
        }

        self.produced += pos;
        if self.produced > self.length || (self.closed && self.produced != self.length) {
            warn!("{} changed while listed", self.dir.as_str());
            return Err(ListingError::Changed);
        }
        Ok(pos)
    }
}
