//! Normalized store paths
//!
//! Every object in the store is addressed by an absolute path that starts
//! with the separator. Client-supplied names are normalized here before
//! they reach the flash store.

use core::fmt::Write;

use heapless::String;

use growstation_hal::storage::{MAX_PATH_LEN, SEPARATOR};

/// Suffix tagging the compressed variant of an object
pub const GZIP_SUFFIX: &str = ".gz";

/// Errors from path normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PathError {
    /// Normalized path does not fit [`MAX_PATH_LEN`]
    TooLong,
    /// Path contains a `..` segment
    Traversal,
}

/// Absolute path of an object in the store
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StorePath(String<MAX_PATH_LEN>);

impl StorePath {
    /// The root path (`/`)
    pub fn root() -> Self {
        let mut path = String::new();
        // One byte always fits
        let _ = path.push(SEPARATOR);
        Self(path)
    }

    /// Normalize a client-supplied name
    ///
    /// Prefixes the separator when absent. An empty name is the root.
    pub fn normalize(raw: &str) -> Result<Self, PathError> {
        if raw.split(SEPARATOR).any(|segment| segment == "..") {
            return Err(PathError::Traversal);
        }

        let mut path = String::new();
        if !raw.starts_with(SEPARATOR) {
            path.push(SEPARATOR).map_err(|_| PathError::TooLong)?;
        }
        path.push_str(raw).map_err(|_| PathError::TooLong)?;
        Ok(Self(path))
    }

    /// Path as a string slice
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Check if this is the root path
    pub fn is_root(&self) -> bool {
        self.0.as_str() == "/"
    }

    /// Check if this names a directory (ends in the separator)
    pub fn is_dir(&self) -> bool {
        self.0.ends_with(SEPARATOR)
    }

    /// Same path with `suffix` appended
    pub fn with_suffix(&self, suffix: &str) -> Result<Self, PathError> {
        let mut path = self.0.clone();
        path.push_str(suffix).map_err(|_| PathError::TooLong)?;
        Ok(Self(path))
    }

    /// Path without its leading separator, as reported in listings
    pub fn relative(&self) -> &str {
        self.0.strip_prefix(SEPARATOR).unwrap_or(self.0.as_str())
    }
}

impl core::fmt::Display for StorePath {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Render a byte count the way the boot listing shows it
///
/// Plain bytes below 1 KiB, otherwise two decimals with a `KB`, `MB` or
/// `GB` unit (binary multiples).
pub fn format_bytes(bytes: u32) -> String<16> {
    const KIB: u64 = 1024;
    const UNITS: [(u64, &str); 3] = [
        (KIB * KIB * KIB, "GB"),
        (KIB * KIB, "MB"),
        (KIB, "KB"),
    ];

    let mut out = String::new();
    let bytes = u64::from(bytes);

    let scaled = UNITS.iter().find(|(divisor, _)| bytes >= *divisor);
    // 16 bytes always hold "4294967295B" or "4.00GB"
    let _ = match scaled {
        None => write!(out, "{}B", bytes),
        Some((divisor, unit)) => {
            let hundredths = (bytes * 100 + divisor / 2) / divisor;
            write!(out, "{}.{:02}{}", hundredths / 100, hundredths % 100, unit)
        }
    };
    out
}
