//! Error types for the image crate.

use thiserror::Error;

use crate::hip::HipEncoding;

/// Errors that can occur when decoding or encoding images and palettes.
#[derive(Debug, Error)]
pub enum Error {
    /// Common library error.
    #[error("{0}")]
    Common(#[from] arcsys_common::Error),

    /// SEGS-wrapped pixel data failed to decompress.
    #[error("SEGS error: {0}")]
    Segs(#[from] arcsys_segs::Error),

    /// Data does not start with the HIP magic.
    #[error("not a HIP image")]
    NotHip,

    /// Data does not start with the HPL magic.
    #[error("not an HPL palette")]
    NotHpl,

    /// Pixel encoding byte with no known decoder.
    #[error("unsupported pixel encoding: {0:#04x}")]
    UnsupportedEncoding(u8),

    /// Pixel encoding with no encoder.
    #[error("cannot encode pixels as {0:?}")]
    UnsupportedEncoder(HipEncoding),

    /// A run wrote past the end of the pixel buffer.
    #[error("pixel run overflows the {capacity}-byte image buffer")]
    PixelOverflow { capacity: usize },

    /// Pixel buffer does not match the declared dimensions.
    #[error("pixel buffer holds {actual} bytes, expected {expected}")]
    PixelBufferSize { expected: usize, actual: usize },

    /// The pixel stream ended inside a group.
    #[error("pixel data ends inside a group at byte {offset}")]
    TruncatedPixels { offset: usize },

    /// Negative or oversized dimensions.
    #[error("invalid image dimensions {width}x{height}")]
    InvalidDimensions { width: i64, height: i64 },
}

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, Error>;
