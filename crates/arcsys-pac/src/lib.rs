//! FPAC container reader and builder.
//!
//! An FPAC container is a flat directory of named members followed by their
//! 16-byte aligned payloads:
//!
//! - A 32-byte header (magic, header size, total length, member count,
//!   parameter bits, name field width)
//! - One entry per member: NUL-padded name, index, offset, length and an
//!   optional name hash, padded to 16 bytes
//! - Payloads, addressed relative to the end of the header
//!
//! Containers are stored little- or big-endian; the byte order is detected
//! from the header when not known.
//!
//! # Example
//!
//! ```no_run
//! use arcsys_pac::{build, BuildOptions, PacHeader, PacMember};
//!
//! let members = vec![PacMember::new("a.bin", vec![1, 2, 3])];
//! let data = build(&members, &BuildOptions::default())?;
//!
//! let pac = PacHeader::parse(&data, None)?;
//! for entry in &pac.entries {
//!     println!("{}: {} bytes", entry.name, entry.length);
//! }
//! # Ok::<(), arcsys_pac::Error>(())
//! ```

mod builder;
mod error;
mod header;
mod kind;
pub mod order;

pub use builder::{
    build, folder_members, name_field_width, pack_folder, BuildOptions, PacMember,
    DEFAULT_MIN_NAME_WIDTH,
};
pub use error::{Error, Result};
pub use header::{
    detect_endian, is_pac, name_id, PacEntry, PacHeader, Parameters, BCSM_MAGIC, PAC_HEADER_SIZE,
    PAC_MAGIC, WRAPPER_SIZE,
};
pub use kind::{extension, EntryKind};
pub use order::FileOrder;
