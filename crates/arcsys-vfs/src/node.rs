//! Tree nodes.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use arcsys_common::Endian;
use arcsys_pac::EntryKind;
use parking_lot::Mutex;

use crate::obfuscation::Obfuscation;

/// Separator between a container's virtual path and a member name.
pub const PATH_SEPARATOR: char = ':';

/// Handle to a node in a [`VirtualTree`](crate::VirtualTree).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a node's bytes come from.
#[derive(Debug, Clone)]
pub(crate) enum Backing {
    /// A file on disk, mapped on access.
    File(PathBuf),
    /// A range of the parent's resolved bytes.
    Parent,
    /// Bytes held in memory.
    Owned(Arc<[u8]>),
}

/// Mutable per-node state, guarded so that first resolution happens once.
#[derive(Debug, Default)]
pub(crate) struct NodeState {
    pub initialized: bool,
    pub resolved: bool,
    /// Sticky: once set, every operation on the node fails fast.
    pub no_access: bool,
    pub obfuscation: Obfuscation,
    pub endian: Option<Endian>,
    pub magic: Option<[u8; 4]>,
    pub cache: Option<Arc<[u8]>>,
}

#[derive(Debug)]
pub(crate) struct VirtualNode {
    pub name: String,
    pub path: String,
    pub parent: Option<NodeId>,
    pub backing: Backing,
    pub offset: usize,
    pub length: usize,
    pub kind: EntryKind,
    /// Byte order handed down by the parent container.
    pub endian_hint: Option<Endian>,
    /// Members, in directory order, once the container has been listed.
    pub children: Option<Vec<NodeId>>,
    pub state: Mutex<NodeState>,
}

impl VirtualNode {
    pub fn new(
        name: String,
        path: String,
        parent: Option<NodeId>,
        backing: Backing,
        offset: usize,
        length: usize,
    ) -> Self {
        let kind = EntryKind::from_name(&name);
        Self {
            name,
            path,
            parent,
            backing,
            offset,
            length,
            kind,
            endian_hint: None,
            children: None,
            state: Mutex::new(NodeState::default()),
        }
    }

    /// Drop everything learned from the old bytes.
    pub fn reset(&mut self) {
        *self.state.get_mut() = NodeState::default();
    }
}

impl NodeState {
    pub fn status(&self) -> NodeStatus {
        if self.no_access {
            NodeStatus::NoAccess
        } else if self.resolved {
            NodeStatus::ContentResolved
        } else if self.initialized {
            NodeStatus::HeaderParsed
        } else {
            NodeStatus::Uninitialized
        }
    }
}

/// Resolution progress of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    Uninitialized,
    /// Magic and obfuscation layers are known.
    HeaderParsed,
    ContentResolved,
    /// A failure made the node permanently unreadable.
    NoAccess,
}

/// Snapshot of what is known about a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
    pub id: NodeId,
    pub name: String,
    pub path: String,
    pub kind: EntryKind,
    /// Declared length in the backing, before any obfuscation is removed.
    pub length: usize,
    pub obfuscation: Obfuscation,
    pub magic: Option<[u8; 4]>,
    pub status: NodeStatus,
}
