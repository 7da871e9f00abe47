//! DDS texture adapter.
//!
//! Console builds store DDS textures SEGS-wrapped and big-endian. This crate
//! strips the wrapper, settles the byte order, summarizes the header, and
//! hands the plain texture to a [`TextureDecoder`] supplied by the caller.
//!
//! # Example
//!
//! ```no_run
//! use arcsys_dds::DdsTexture;
//!
//! let data = std::fs::read("stage_bg.dds")?;
//! let texture = DdsTexture::open(&data, None)?;
//! let info = texture.info()?;
//! println!("{}x{} {:?}", info.width, info.height, info.four_cc);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod error;
mod header;
mod texture;

pub use error::{Error, Result};
pub use header::{block_size, mipmap_size, DdsHeader, DdsHeaderDxt10, DdsPixelFormat, FourCC};
pub use texture::{DdsInfo, DdsTexture, TextureDecoder};

/// DDS file magic bytes ("DDS ").
pub const DDS_MAGIC: &[u8; 4] = b"DDS ";
