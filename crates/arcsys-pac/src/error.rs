//! Error types for the PAC crate.

use thiserror::Error;

/// Errors that can occur when reading or building PAC containers.
#[derive(Debug, Error)]
pub enum Error {
    /// Common library error.
    #[error("{0}")]
    Common(#[from] arcsys_common::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Directory traversal error while packing a folder.
    #[error("folder walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// Data too short to hold a container header.
    #[error("container header needs 32 bytes, got {0}")]
    TooShort(usize),

    /// Missing "FPAC" magic.
    #[error("not an FPAC container (magic {0:02X?})")]
    InvalidMagic([u8; 4]),

    /// Header fields contradict each other.
    #[error("invalid container header: {0}")]
    InvalidHeader(String),

    /// An entry points past the end of the container.
    #[error("entry {name:?} at {offset:#x}+{length:#x} lies outside the {available:#x}-byte container")]
    EntryOutOfRange {
        name: String,
        offset: usize,
        length: usize,
        available: usize,
    },

    /// A member name cannot fit the fixed name field.
    #[error("file name {name:?} cannot equal or exceed {width} characters with these packing parameters")]
    NameTooLong { name: String, width: usize },

    /// A size does not fit the 32-bit header fields.
    #[error("container too large: {0} bytes")]
    SizeOverflow(usize),
}

/// Result type for PAC operations.
pub type Result<T> = std::result::Result<T, Error>;
