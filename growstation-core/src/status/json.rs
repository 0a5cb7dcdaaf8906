//! Two-pass JSON encoding
//!
//! Documents are serialized with `serde-json-core`. The first pass
//! serializes into bounded scratch space to learn the exact size, the second
//! renders into the front of the caller's buffer. Nothing is written to the
//! buffer when the measured size does not fit.

use heapless::Vec;
use serde::Serialize;

/// Largest document [`measure`] can size
pub const MAX_DOCUMENT_LEN: usize = 512;

/// JSON encoding errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EncodeError {
    /// Document is longer than [`MAX_DOCUMENT_LEN`]
    TooLarge,
    /// Measured document is larger than the output buffer
    Overflow {
        /// Bytes the document needs
        needed: usize,
    },
    /// Rendering wrote a different number of bytes than measured
    Mismatch,
}

/// Exact encoded size of `doc`
pub fn measure<T: Serialize>(doc: &T) -> Result<usize, EncodeError> {
    let encoded: Vec<u8, MAX_DOCUMENT_LEN> =
        serde_json_core::to_vec(doc).map_err(|_| EncodeError::TooLarge)?;
    Ok(encoded.len())
}

/// Measure `doc`, then render it into the front of `buf`
///
/// Returns the number of bytes written.
pub fn render<T: Serialize>(doc: &T, buf: &mut [u8]) -> Result<usize, EncodeError> {
    let needed = measure(doc)?;
    let dest = buf
        .get_mut(..needed)
        .ok_or(EncodeError::Overflow { needed })?;

    let written = serde_json_core::to_slice(doc, dest).map_err(|_| EncodeError::Mismatch)?;
    if written != needed {
        return Err(EncodeError::Mismatch);
    }
    Ok(needed)
}
