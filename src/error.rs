//! Error types for device initialization
//!
//! Per-call failures (blits, touch reads) have their own small error enums
//! next to the code that produces them; this module covers the failures that
//! decide whether a subsystem comes up at all.

use std::io;
use std::path::PathBuf;

/// Device and configuration errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Device node missing, not accessible, or of the wrong kind
    #[error("cannot open device {}: {source}", path.display())]
    DeviceOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Path exists but is not a character device node
    #[error("{} is not a character device", path.display())]
    NotCharDevice { path: PathBuf },

    /// Geometry query or mode set rejected by the driver
    #[error("{request} failed on {}: {source}", path.display())]
    Ioctl {
        request: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// mmap of the pixel memory failed
    #[error("failed to map {len} bytes of {}: {source}", path.display())]
    Map {
        len: usize,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Geometry reports a depth the blitter cannot address
    #[error("unsupported bit depth: {0} bpp")]
    UnsupportedDepth(u32),

    /// Mode changes are only allowed before the buffer is mapped
    #[error("cannot change mode of {} while it is mapped", path.display())]
    ModeLocked { path: PathBuf },

    /// Configuration file could not be read or parsed
    #[error("invalid configuration in {}: {message}", path.display())]
    Config { path: PathBuf, message: String },
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;
