//! Error types for the SEGS crate.

use thiserror::Error;

/// Errors that can occur when reading SEGS blobs.
#[derive(Debug, Error)]
pub enum Error {
    /// Common library error.
    #[error("{0}")]
    Common(#[from] arcsys_common::Error),

    /// A chunk points outside the blob.
    #[error("chunk {index} at {offset:#x}+{len:#x} lies outside the {available:#x}-byte blob")]
    ChunkOutOfRange {
        index: usize,
        offset: usize,
        len: usize,
        available: usize,
    },

    /// Chunks produced more bytes than the declared full size.
    #[error("decompressed size overflow: declared {declared} bytes, chunks produced {actual}")]
    SizeOverflow { declared: usize, actual: usize },

    /// Decompression error.
    #[error("decompression error: {0}")]
    Decompression(String),
}

/// Result type for SEGS operations.
pub type Result<T> = std::result::Result<T, Error>;
