//! Common utilities for arcsys.
//!
//! This crate provides foundational types used across all arcsys crates:
//!
//! - [`BinaryReader`] - Zero-copy, endian-aware reading from byte slices
//! - [`BinaryWriter`] - Endian-aware writer with back-patching
//! - [`Endian`] - Byte order selector shared by every codec
//! - [`Argb`] - 32-bit palette color as stored by HIP/HPL files

mod color;
mod endian;
mod error;
mod reader;
mod writer;

pub use color::Argb;
pub use endian::Endian;
pub use error::{Error, Result};
pub use reader::BinaryReader;
pub use writer::BinaryWriter;

/// Re-export zerocopy traits for convenience
pub use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Round `value` up to the next multiple of `alignment`, leaving exact multiples alone.
#[inline]
pub const fn align_up(value: usize, alignment: usize) -> usize {
    let rem = value % alignment;
    if rem == 0 {
        value
    } else {
        value + alignment - rem
    }
}
