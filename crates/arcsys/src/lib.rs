//! Arcsys - Arc System Works game file library.
//!
//! This crate bundles the format crates behind one dependency.
//!
//! # Crates
//!
//! - [`arcsys_common`] - Endian-aware binary reader/writer and ARGB colors
//! - [`arcsys_crypto`] - FPAC and MD5-keyed stream ciphers
//! - [`arcsys_segs`] - SEGS chunked blobs
//! - [`arcsys_image`] - HIP images and HPL palettes
//! - [`arcsys_dds`] - DDS texture unwrapping
//! - [`arcsys_pac`] - FPAC containers and file-order manifests
//! - [`arcsys_vfs`] - Lazily resolved virtual file tree
//!
//! # Example
//!
//! ```no_run
//! use arcsys::prelude::*;
//!
//! let mut tree = VirtualTree::new(TreeOptions::default())?;
//! let root = tree.open_file("char_sol_img.pac")?;
//!
//! for child in tree.children(root)? {
//!     if tree.kind(child) == EntryKind::Image {
//!         let bitmap = tree.image(child, &DecodeOptions::default())?;
//!         println!("{}: {}x{}", tree.name(child), bitmap.width, bitmap.height);
//!     }
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Re-export all sub-crates
pub use arcsys_common as common;
pub use arcsys_crypto as crypto;
pub use arcsys_dds as dds;
pub use arcsys_image as image;
pub use arcsys_pac as pac;
pub use arcsys_segs as segs;
pub use arcsys_vfs as vfs;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use arcsys_common::{Argb, BinaryReader, BinaryWriter, Endian};
    pub use arcsys_dds::{DdsTexture, TextureDecoder};
    pub use arcsys_image::{
        Bitmap, DecodeOptions, EncodeOptions, HipEncoding, HipHeader, HplPalette, PixelFormat,
    };
    pub use arcsys_pac::{BuildOptions, FileOrder, PacHeader, PacMember, Parameters};
    pub use arcsys_segs::SegsBlob;
    pub use arcsys_vfs::{
        EntryKind, NodeId, NodeInfo, NodeStatus, Obfuscation, TreeOptions, VirtualTree,
    };
}

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
