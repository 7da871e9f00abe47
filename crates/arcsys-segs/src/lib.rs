//! SEGS chunked blob support.
//!
//! SEGS wraps a payload as a sequence of independently compressed chunks of
//! at most 64 KiB. HIP images and DDS textures on console builds are commonly
//! stored this way.
//!
//! # Example
//!
//! ```no_run
//! let data = std::fs::read("texture.segs")?;
//! if arcsys_segs::is_segs(&data) {
//!     let plain = arcsys_segs::decompress(&data)?;
//!     println!("{} bytes", plain.len());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod blob;
pub mod decompress;
mod error;

pub use blob::{
    decompress, decompress_with, detect_endian, is_segs, SegsBlob, SegsChunk, HEADER_SIZE,
    SEGS_MAGIC,
};
pub use error::{Error, Result};
