//! Error types for DDS handling.

use thiserror::Error;

/// Errors that can occur when working with DDS textures.
#[derive(Debug, Error)]
pub enum Error {
    /// Common library error.
    #[error("{0}")]
    Common(#[from] arcsys_common::Error),

    /// SEGS-wrapped texture failed to decompress.
    #[error("SEGS error: {0}")]
    Segs(#[from] arcsys_segs::Error),

    /// Invalid DDS magic.
    #[error("invalid DDS magic: expected 'DDS', got {0:?}")]
    InvalidMagic([u8; 3]),

    /// Invalid DDS header.
    #[error("invalid DDS header: {0}")]
    InvalidHeader(String),
}

/// Result type for DDS operations.
pub type Result<T> = std::result::Result<T, Error>;
