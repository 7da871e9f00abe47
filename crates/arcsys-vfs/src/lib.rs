//! Virtual file tree over Arc System Works containers.
//!
//! A [`VirtualTree`] addresses files on disk, in-memory buffers and the
//! members of (possibly nested, possibly obfuscated) FPAC containers through
//! one handle type. Nothing is read until asked for:
//!
//! - Listing a container parses only its directory
//! - Reading a member resolves its parent first, then strips the member's
//!   own obfuscation layers (see [`obfuscation`])
//! - Decode failures make a node permanently inaccessible
//! - Replacing or removing a member rebuilds every container above it
//!
//! # Example
//!
//! ```no_run
//! use arcsys_vfs::{TreeOptions, VirtualTree};
//!
//! let mut tree = VirtualTree::new(TreeOptions::default())?;
//! let root = tree.open_file("char_ram_col.pac")?;
//! for (id, depth) in tree.walk(root)? {
//!     let info = tree.info(id);
//!     println!("{:indent$}{} ({})", "", info.name, info.kind, indent = depth * 2);
//! }
//! # Ok::<(), arcsys_vfs::Error>(())
//! ```

mod error;
mod node;
pub mod obfuscation;
mod options;
mod tree;

pub use arcsys_pac::EntryKind;
pub use error::{Error, ErrorKind, Result};
pub use node::{NodeId, NodeInfo, NodeStatus, PATH_SEPARATOR};
pub use obfuscation::Obfuscation;
pub use options::{Md5Variant, TreeOptions};
pub use tree::VirtualTree;
