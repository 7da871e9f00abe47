//! HIP images.
//!
//! A HIP file is a 32-byte header, an optional layer header placing the
//! image on a larger canvas, an optional palette, and pixel data in one of
//! several run-length encodings. Pixel data may itself be SEGS-wrapped, in
//! which case it is big-endian.
//!
//! # Example
//!
//! ```no_run
//! use arcsys_image::hip::{decode, DecodeOptions, HipHeader};
//!
//! let data = std::fs::read("vrkyst000_00.hip")?;
//! let header = HipHeader::parse(&data, None, data.len())?;
//! let bitmap = decode(&data, &header, &DecodeOptions::default())?;
//! println!("{}x{} {:?}", bitmap.width, bitmap.height, bitmap.format);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod canvas;
mod decode;
mod encode;
mod header;

pub use canvas::{place_on_canvas, round_canvas, round_canvas_dimension, Placement};
pub use decode::{decode, embedded_palette, DecodeOptions};
pub use encode::{encode, EncodeOptions};
pub use header::{
    HipEncoding, HipHeader, HIP_BASE_HEADER_SIZE, HIP_MAGIC, RENDERABLE_LAYERS,
};
