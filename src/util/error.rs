//! Error types for the Crate reader.

use std::path::PathBuf;
use thiserror::Error;

use crate::crate_file::Version;

/// Main error type for Crate decoding.
#[derive(Error, Debug)]
pub enum Error {
    /// File does not exist or cannot be accessed
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Invalid magic bytes at start of file
    #[error("Invalid Crate file: expected PXR-USDC magic bytes")]
    InvalidMagic,

    /// File version predates compressed structural sections
    #[error("Unsupported Crate version: {0}")]
    UnsupportedVersion(Version),

    /// File is truncated or an offset points past the end
    #[error("Unexpected end of data at position {0}")]
    UnexpectedEof(u64),

    /// Invalid or corrupted data structure in file
    #[error("Invalid file structure: {0}")]
    InvalidStructure(String),

    /// On-disk feature this reader does not implement
    #[error("Unsupported Crate feature: {0}")]
    Unsupported(String),

    /// LZ4 block could not be decoded
    #[error("Decompression failed: {0}")]
    Decompression(String),

    /// A prim spec was composed before its parent
    #[error("Parent of {0} is not present in the layer")]
    MissingParent(String),

    /// Index read from the file does not fit the table it refers to
    #[error("{what} index {index} out of bounds (count: {count})")]
    IndexOutOfBounds {
        what: &'static str,
        index: u64,
        count: usize,
    },

    /// Memory mapping failed
    #[error("Memory mapping failed: {0}")]
    MmapFailed(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// UTF-8 conversion error
    #[error("Invalid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an "other" error from a string.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Create an invalid structure error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidStructure(msg.into())
    }

    /// Create an unsupported-feature error.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    /// Index error for a named table.
    pub fn out_of_bounds(what: &'static str, index: impl Into<u64>, count: usize) -> Self {
        Self::IndexOutOfBounds {
            what,
            index: index.into(),
            count,
        }
    }

    /// True for the unsupported-format conditions, as opposed to corruption.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported(_) | Self::UnsupportedVersion(_))
    }
}

/// Result type alias for Crate operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::InvalidMagic;
        assert!(e.to_string().contains("magic"));

        let e = Error::out_of_bounds("token", 5u32, 3);
        let msg = e.to_string();
        assert!(msg.contains("token"));
        assert!(msg.contains('5'));
        assert!(msg.contains('3'));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_unsupported_is_distinct() {
        assert!(Error::unsupported("multi-chunk").is_unsupported());
        assert!(Error::UnsupportedVersion(Version::new(0, 3, 0)).is_unsupported());
        assert!(!Error::invalid("bad").is_unsupported());
    }
}
