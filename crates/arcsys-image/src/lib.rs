//! Image formats used by Arc System Works games.
//!
//! - [`hip`] - HIP bitmaps with layer placement and run-length pixel encodings
//! - [`hpl`] - HPL standalone palettes
//! - [`Bitmap`] - the decoded pixel buffer handed to image consumers

mod bitmap;
mod error;
pub mod hip;
pub mod hpl;

pub use bitmap::{Bitmap, PixelFormat};
pub use error::{Error, Result};
pub use hip::{DecodeOptions, EncodeOptions, HipEncoding, HipHeader};
pub use hpl::{HplPalette, HPL_MAGIC};
