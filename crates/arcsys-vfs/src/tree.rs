//! Arena-backed tree of lazily resolved nodes.
//!
//! Nodes live in a flat arena and refer to each other through [`NodeId`]
//! handles. A node only records where its bytes come from; nothing is read
//! until the node is asked for its header or content. Reads take `&self` and
//! may run from several threads at once, each node serializing its own first
//! resolution. Structural changes (listing a container for the first time,
//! rebuilding, removing members) take `&mut self`.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arcsys_common::{Argb, Endian};
use arcsys_dds::DdsTexture;
use arcsys_image::hip::{self, DecodeOptions, EncodeOptions, HipHeader};
use arcsys_image::{Bitmap, HplPalette};
use arcsys_pac::order::ROOT_NAME;
use arcsys_pac::{BuildOptions, EntryKind, FileOrder, PacEntry, PacHeader, PacMember, WRAPPER_SIZE};
use arcsys_segs::SegsBlob;
use memmap2::Mmap;

use crate::node::{Backing, NodeId, NodeInfo, NodeStatus, VirtualNode, PATH_SEPARATOR};
use crate::obfuscation::{self, Obfuscation};
use crate::options::TreeOptions;
use crate::{Error, ErrorKind, Result};

/// A tree of containers and their members.
#[derive(Debug)]
pub struct VirtualTree {
    nodes: Vec<VirtualNode>,
    roots: Vec<NodeId>,
    options: TreeOptions,
    md5_key: Vec<u8>,
}

impl VirtualTree {
    /// Create an empty tree. Fails when the MD5 key options are unusable.
    pub fn new(options: TreeOptions) -> Result<Self> {
        let md5_key = options.md5_key()?;
        Ok(Self {
            nodes: Vec::new(),
            roots: Vec::new(),
            options,
            md5_key,
        })
    }

    pub fn options(&self) -> &TreeOptions {
        &self.options
    }

    /// Top-level nodes in the order they were added.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Add a file on disk as a root. Its bytes are mapped on first access.
    pub fn open_file(&mut self, path: impl AsRef<Path>) -> Result<NodeId> {
        let path = path.as_ref();
        let length = std::fs::metadata(path)?.len() as usize;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let node = VirtualNode::new(
            name,
            path.display().to_string(),
            None,
            Backing::File(path.to_path_buf()),
            0,
            length,
        );
        tracing::debug!(path = %path.display(), length, "opened root file");
        Ok(self.push_root(node))
    }

    /// Add an in-memory buffer as a root.
    pub fn insert_bytes(&mut self, name: impl Into<String>, data: Vec<u8>) -> NodeId {
        let name = name.into();
        let length = data.len();
        let node = VirtualNode::new(
            name.clone(),
            name,
            None,
            Backing::Owned(Arc::from(data)),
            0,
            length,
        );
        self.push_root(node)
    }

    fn push_root(&mut self, node: VirtualNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        self.roots.push(id);
        id
    }

    /// # Panics
    ///
    /// Panics if `id` was not handed out by this tree.
    fn node(&self, id: NodeId) -> &VirtualNode {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut VirtualNode {
        &mut self.nodes[id.0]
    }

    pub fn name(&self, id: NodeId) -> &str {
        &self.node(id).name
    }

    /// Virtual path: ancestor names joined by [`PATH_SEPARATOR`].
    pub fn path(&self, id: NodeId) -> &str {
        &self.node(id).path
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Length declared by the backing, before obfuscation is removed.
    pub fn length(&self, id: NodeId) -> usize {
        self.node(id).length
    }

    pub fn status(&self, id: NodeId) -> NodeStatus {
        self.node(id).state.lock().status()
    }

    /// Layers found on the last resolution.
    pub fn obfuscation(&self, id: NodeId) -> Obfuscation {
        self.node(id).state.lock().obfuscation
    }

    /// Byte order detected by a codec, or the one handed down by the parent.
    pub fn endian(&self, id: NodeId) -> Option<Endian> {
        let node = self.node(id);
        node.state.lock().endian.or(node.endian_hint)
    }

    /// Kind from the name, refined by the magic once it is known.
    pub fn kind(&self, id: NodeId) -> EntryKind {
        let node = self.node(id);
        let magic = node.state.lock().magic;
        match magic {
            Some(magic) => node.kind.refine(&magic),
            None => node.kind,
        }
    }

    /// Read the header and report what is known. Resolution failures are
    /// reflected in the status rather than returned.
    pub fn info(&self, id: NodeId) -> NodeInfo {
        if let Err(e) = self.initialize(id) {
            tracing::debug!(path = self.path(id), error = %e, "header read failed");
        }
        let node = self.node(id);
        let state = node.state.lock();
        NodeInfo {
            id,
            name: node.name.clone(),
            path: node.path.clone(),
            kind: match state.magic {
                Some(magic) => node.kind.refine(&magic),
                None => node.kind,
            },
            length: node.length,
            obfuscation: state.obfuscation,
            magic: state.magic,
            status: state.status(),
        }
    }

    /// Resolve just enough to know the magic and the obfuscation layers.
    pub fn initialize(&self, id: NodeId) -> Result<Arc<[u8]>> {
        self.resolve(id, true)
    }

    /// Canonical bytes with every obfuscation layer removed.
    pub fn read(&self, id: NodeId) -> Result<Arc<[u8]>> {
        self.resolve(id, false)
    }

    fn resolve(&self, id: NodeId, header_only: bool) -> Result<Arc<[u8]>> {
        let node = self.node(id);
        let mut state = node.state.lock();
        if state.no_access {
            return Err(Error::NoAccess(node.path.clone()));
        }
        if let Some(cache) = &state.cache {
            return Ok(Arc::clone(cache));
        }

        let peeled = self.raw(id).and_then(|raw| {
            obfuscation::peel(raw, &node.name, &self.md5_key, header_only)
        });
        match peeled {
            Ok((bytes, layers)) => {
                state.initialized = true;
                state.obfuscation = layers;
                state.magic = bytes.get(..4).map(|m| [m[0], m[1], m[2], m[3]]);

                let bytes: Arc<[u8]> = Arc::from(bytes);
                if !header_only {
                    state.resolved = true;
                    if self.options.cache_bytes {
                        state.cache = Some(Arc::clone(&bytes));
                    }
                }
                Ok(bytes)
            }
            Err(e) => {
                if e.is_sticky() {
                    state.no_access = true;
                    tracing::warn!(path = %node.path, error = %e, "node is no longer accessible");
                }
                Err(e)
            }
        }
    }

    /// Backing bytes of a node, obfuscation included.
    pub fn raw(&self, id: NodeId) -> Result<Vec<u8>> {
        let node = self.node(id);
        match &node.backing {
            Backing::File(path) => {
                let file = File::open(path)?;
                if file.metadata()?.len() == 0 {
                    return clamp(node, &[]);
                }
                let mmap = unsafe { Mmap::map(&file)? };
                clamp(node, &mmap)
            }
            Backing::Owned(bytes) => clamp(node, bytes),
            Backing::Parent => {
                let parent = node
                    .parent
                    .ok_or_else(|| Error::NoAccess(node.path.clone()))?;
                clamp(node, &self.read(parent)?)
            }
        }
    }

    /// Mark the node inaccessible if the failure is one that sticks.
    fn guard<T>(&self, id: NodeId, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            if e.is_sticky() {
                self.set_no_access(id, e);
            }
        }
        result
    }

    fn set_no_access(&self, id: NodeId, reason: &dyn std::fmt::Display) {
        let node = self.node(id);
        let mut state = node.state.lock();
        if !state.no_access {
            state.no_access = true;
            state.cache = None;
            tracing::warn!(path = %node.path, error = %reason, "node is no longer accessible");
        }
    }

    /// Length a codec may trust for the node's canonical bytes.
    fn declared_len(&self, id: NodeId, bytes: &[u8]) -> usize {
        let node = self.node(id);
        if node.parent.is_some() && self.obfuscation(id).is_empty() {
            node.length
        } else {
            bytes.len()
        }
    }

    /// Parse the node as a container.
    pub fn container(&self, id: NodeId) -> Result<PacHeader> {
        self.parse_container(id).map(|(header, _)| header)
    }

    fn parse_container(&self, id: NodeId) -> Result<(PacHeader, usize)> {
        let bytes = self.read(id)?;
        let header = PacHeader::parse(&bytes, self.node(id).endian_hint)?;
        self.node(id).state.lock().endian = Some(header.endian);
        Ok((header, bytes.len()))
    }

    /// Members of a container, listed on first call.
    ///
    /// A node that is not a container has no members.
    pub fn children(&mut self, id: NodeId) -> Result<Vec<NodeId>> {
        if let Some(children) = &self.node(id).children {
            return Ok(children.clone());
        }

        let (header, available) = match self.parse_container(id) {
            Ok(parsed) => parsed,
            Err(e) if e.kind() == ErrorKind::FormatMismatch => {
                tracing::debug!(path = self.path(id), error = %e, "not a container");
                self.node_mut(id).children = Some(Vec::new());
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        let children: Vec<NodeId> = header
            .entries
            .iter()
            .map(|entry| self.push_child(id, &header, entry, available))
            .collect();
        tracing::debug!(path = self.path(id), count = children.len(), "listed container");
        self.node_mut(id).children = Some(children.clone());
        Ok(children)
    }

    fn push_child(
        &mut self,
        parent: NodeId,
        header: &PacHeader,
        entry: &PacEntry,
        available: usize,
    ) -> NodeId {
        let range = header.data_range(entry);
        let length = clamped_len(self.path(parent), &entry.name, range.start, range.len(), available);

        let path = format!("{}{PATH_SEPARATOR}{}", self.path(parent), entry.name);
        let mut node = VirtualNode::new(
            entry.name.clone(),
            path,
            Some(parent),
            Backing::Parent,
            range.start,
            length,
        );
        node.endian_hint = child_endian(node.kind, header.endian);

        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// Find a member by its path below `root`, e.g. `"chr.pac:chr_00.hip"`.
    pub fn lookup(&mut self, root: NodeId, member_path: &str) -> Result<Option<NodeId>> {
        let mut current = root;
        for name in member_path.split(PATH_SEPARATOR).filter(|s| !s.is_empty()) {
            let children = self.children(current)?;
            match children.into_iter().find(|&c| self.node(c).name == name) {
                Some(child) => current = child,
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }

    /// Depth-first listing of `root` and every member below it.
    ///
    /// Nested containers are expanded; one that fails to list is reported and
    /// skipped without stopping its siblings.
    pub fn walk(&mut self, root: NodeId) -> Result<Vec<(NodeId, usize)>> {
        let mut out = Vec::new();
        let mut stack = vec![(root, 0usize)];

        while let Some((id, depth)) = stack.pop() {
            out.push((id, depth));
            if id != root && !self.node(id).kind.is_container() {
                continue;
            }
            match self.children(id) {
                Ok(children) => stack.extend(children.into_iter().rev().map(|c| (c, depth + 1))),
                Err(e) if id == root => return Err(e),
                Err(e) => {
                    tracing::warn!(path = self.path(id), error = %e, "skipping nested container");
                }
            }
        }
        Ok(out)
    }

    /// Parse the node as a HIP image header.
    pub fn hip_header(&self, id: NodeId) -> Result<HipHeader> {
        let result = self.read(id).and_then(|bytes| {
            let parent_len = self.declared_len(id, &bytes);
            Ok(HipHeader::parse(&bytes, self.node(id).endian_hint, parent_len)?)
        });
        let header = self.guard(id, result)?;
        self.node(id).state.lock().endian = Some(header.endian);
        Ok(header)
    }

    /// Decode the node as a HIP image.
    pub fn image(&self, id: NodeId, options: &DecodeOptions) -> Result<Bitmap> {
        let header = self.hip_header(id)?;
        let result = self
            .read(id)
            .and_then(|bytes| Ok(hip::decode(&bytes, &header, options)?));
        self.guard(id, result)
    }

    /// The palette embedded in an indexed HIP image.
    pub fn hip_palette(&self, id: NodeId) -> Result<Vec<Argb>> {
        let header = self.hip_header(id)?;
        let result = self
            .read(id)
            .and_then(|bytes| Ok(hip::embedded_palette(&bytes, &header)?));
        self.guard(id, result)
    }

    /// Parse the node as an HPL palette.
    pub fn palette(&self, id: NodeId) -> Result<HplPalette> {
        let result = self.read(id).and_then(|bytes| {
            let parent_len = self.declared_len(id, &bytes);
            Ok(HplPalette::parse(&bytes, self.node(id).endian_hint, parent_len)?)
        });
        let palette = self.guard(id, result)?;
        self.node(id).state.lock().endian = Some(palette.endian);
        Ok(palette)
    }

    /// Unwrap the node as a DDS texture.
    pub fn texture(&self, id: NodeId) -> Result<DdsTexture> {
        let result = self
            .read(id)
            .and_then(|bytes| Ok(DdsTexture::open(&bytes, self.node(id).endian_hint)?));
        let texture = self.guard(id, result)?;
        self.node(id).state.lock().endian = Some(texture.endian());
        Ok(texture)
    }

    /// Decompress the node as a SEGS blob.
    pub fn segs(&self, id: NodeId) -> Result<Vec<u8>> {
        let result = self.read(id).and_then(|bytes| {
            let blob = SegsBlob::open(&bytes, self.declared_len(id, &bytes))?;
            self.node(id).state.lock().endian = Some(blob.endian);
            Ok(blob.decompress(&bytes)?)
        });
        self.guard(id, result)
    }

    /// Build a new in-memory container root.
    pub fn create_container(
        &mut self,
        name: impl Into<String>,
        members: &[PacMember],
        options: &BuildOptions,
    ) -> Result<NodeId> {
        let data = arcsys_pac::build(members, options)?;
        Ok(self.insert_bytes(name, data))
    }

    /// Encode a bitmap into a new in-memory HIP root.
    pub fn create_image(
        &mut self,
        name: impl Into<String>,
        bitmap: &Bitmap,
        options: &EncodeOptions,
    ) -> Result<NodeId> {
        let data = hip::encode(bitmap, options)?;
        Ok(self.insert_bytes(name, data))
    }

    /// Write a palette into a new in-memory HPL root.
    pub fn create_palette(
        &mut self,
        name: impl Into<String>,
        palette: &[Argb],
        endian: Endian,
    ) -> NodeId {
        self.insert_bytes(name, HplPalette::encode(palette, endian))
    }

    /// Give a node new bytes and rebuild every container above it.
    pub fn replace_content(&mut self, id: NodeId, data: Vec<u8>) -> Result<()> {
        self.check_access(id)?;
        if let Some(children) = self.node_mut(id).children.take() {
            for child in children {
                self.detach(child);
            }
        }
        self.store(id, data)?;
        tracing::debug!(path = self.path(id), "replaced content");

        match self.parent(id) {
            Some(parent) => self.rebuild(parent, None),
            None => Ok(()),
        }
    }

    /// Add an in-memory member to a container and rebuild it.
    pub fn insert_child(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        data: Vec<u8>,
        order: Option<&FileOrder>,
    ) -> Result<NodeId> {
        self.check_access(parent)?;
        let mut children = self.children(parent)?;

        let name = name.into();
        let length = data.len();
        let path = format!("{}{PATH_SEPARATOR}{name}", self.path(parent));
        let node = VirtualNode::new(
            name,
            path,
            Some(parent),
            Backing::Owned(Arc::from(data)),
            0,
            length,
        );
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);

        children.push(id);
        self.node_mut(parent).children = Some(children);
        self.rebuild(parent, order)?;
        Ok(id)
    }

    /// Drop a member from a container and rebuild it.
    ///
    /// The removed node stays in the arena but can no longer be read.
    pub fn remove_child(
        &mut self,
        parent: NodeId,
        child: NodeId,
        order: Option<&FileOrder>,
    ) -> Result<()> {
        let mut children = self.children(parent)?;
        let Some(position) = children.iter().position(|&c| c == child) else {
            return Err(Error::NotAMember {
                container: self.path(parent).to_string(),
                member: self.path(child).to_string(),
            });
        };
        children.remove(position);
        self.node_mut(parent).children = Some(children);
        self.detach(child);
        tracing::debug!(container = self.path(parent), member = self.path(child), "removed member");

        self.rebuild(parent, order)
    }

    /// Rebuild a container from its current members.
    ///
    /// Members keep their stored bytes, so untouched members keep their
    /// obfuscation. The new container is written back through every parent
    /// until a root persists it.
    pub fn rebuild(&mut self, id: NodeId, order: Option<&FileOrder>) -> Result<()> {
        self.check_access(id)?;
        let header = self.container(id)?;
        let children = self.children(id)?;

        let members = children
            .iter()
            .map(|&c| Ok(PacMember::new(self.name(c), self.raw(c)?)))
            .collect::<Result<Vec<_>>>()?;

        let options = BuildOptions {
            parameters: header.parameters,
            min_name_width: usize::try_from(header.name_width).unwrap_or_default(),
            endian: header.endian,
            order: order.cloned(),
        };
        let mut data = arcsys_pac::build(&members, &options)?;

        if header.base_offset != 0 {
            let old = self.read(id)?;
            let mut wrapped = old[..WRAPPER_SIZE].to_vec();
            wrapped.append(&mut data);
            data = wrapped;
        }

        let layers = self.obfuscation(id);
        if layers.contains(Obfuscation::FPAC_ENCRYPTION)
            && !layers.contains(Obfuscation::FPAC_DEFLATION)
        {
            data = obfuscation::fpac_encrypt(&data, self.name(id));
        }

        tracing::debug!(
            path = self.path(id),
            members = members.len(),
            len = data.len(),
            "rebuilt container"
        );
        self.store(id, data)?;
        self.repoint_children(id)?;

        match self.parent(id) {
            Some(parent) => self.rebuild(parent, None),
            None => Ok(()),
        }
    }

    /// Replace a node's backing. A root file is rewritten on disk.
    fn store(&mut self, id: NodeId, data: Vec<u8>) -> Result<()> {
        let length = data.len();
        let node = self.node_mut(id);
        let file = match (&node.backing, node.parent) {
            (Backing::File(path), None) => Some(path.clone()),
            _ => None,
        };
        match file {
            Some(path) => {
                std::fs::write(&path, &data)?;
                tracing::info!(path = %path.display(), length, "wrote file");
            }
            None => node.backing = Backing::Owned(Arc::from(data)),
        }
        node.offset = 0;
        node.length = length;
        node.reset();
        Ok(())
    }

    /// Point existing members at their new place in a rebuilt container.
    fn repoint_children(&mut self, id: NodeId) -> Result<()> {
        let (header, available) = self.parse_container(id)?;
        let mut old = self.node_mut(id).children.take().unwrap_or_default();

        let mut children = Vec::with_capacity(header.entries.len());
        for entry in &header.entries {
            let matched = old
                .iter()
                .position(|&c| self.node(c).name == entry.name)
                .map(|i| old.remove(i));
            let child = match matched {
                Some(child) => {
                    let range = header.data_range(entry);
                    let length =
                        clamped_len(self.path(id), &entry.name, range.start, range.len(), available);
                    let node = self.node_mut(child);
                    node.backing = Backing::Parent;
                    node.offset = range.start;
                    node.length = length;
                    node.endian_hint = child_endian(node.kind, header.endian);
                    node.reset();
                    child
                }
                None => self.push_child(id, &header, entry, available),
            };
            children.push(child);
        }

        for orphan in old {
            self.detach(orphan);
        }
        self.node_mut(id).children = Some(children);
        Ok(())
    }

    /// Cut a node and its listed members off from the tree.
    fn detach(&mut self, id: NodeId) {
        let node = self.node_mut(id);
        node.parent = None;
        node.backing = Backing::Parent;
        let state = node.state.get_mut();
        state.no_access = true;
        state.cache = None;
        for child in node.children.take().unwrap_or_default() {
            self.detach(child);
        }
    }

    fn check_access(&self, id: NodeId) -> Result<()> {
        if self.node(id).state.lock().no_access {
            Err(Error::NoAccess(self.path(id).to_string()))
        } else {
            Ok(())
        }
    }

    /// Derive a file-order manifest from the current member order.
    ///
    /// Nested containers contribute their own member lists.
    pub fn file_order(&mut self, id: NodeId) -> Result<FileOrder> {
        let mut order = FileOrder::new(ROOT_NAME);
        for child in self.children(id)? {
            let name = self.name(child).to_string();
            let entry = if self.node(child).kind.is_container() {
                match self.file_order(child) {
                    Ok(nested) => FileOrder::with_children(name, nested.children),
                    Err(e) => {
                        tracing::warn!(path = self.path(child), error = %e, "no member order");
                        FileOrder::new(name)
                    }
                }
            } else {
                FileOrder::new(name)
            };
            order.children.push(entry);
        }
        Ok(order)
    }
}

/// Copy a node's range out of its backing, truncating a range that runs
/// past the end.
fn clamp(node: &VirtualNode, data: &[u8]) -> Result<Vec<u8>> {
    if node.offset > data.len() {
        return Err(Error::OutOfRange {
            path: node.path.clone(),
            offset: node.offset,
            available: data.len(),
        });
    }
    let end = node.offset.saturating_add(node.length);
    if end > data.len() {
        tracing::warn!(
            path = %node.path,
            declared = node.length,
            available = data.len() - node.offset,
            "range runs past its backing, truncating"
        );
    }
    Ok(data[node.offset..end.min(data.len())].to_vec())
}

fn clamped_len(container: &str, name: &str, start: usize, length: usize, available: usize) -> usize {
    let fits = available.saturating_sub(start);
    if length > fits {
        tracing::warn!(container, member = name, length, available = fits, "member truncated");
        fits
    } else {
        length
    }
}

/// Byte order handed to a member. Nested containers share their parent's;
/// other formats are only told when the parent is big-endian.
fn child_endian(kind: EntryKind, parent: Endian) -> Option<Endian> {
    match (kind, parent) {
        (EntryKind::Container, endian) => Some(endian),
        (_, Endian::Big) => Some(Endian::Big),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcsys_image::PixelFormat;
    use arcsys_pac::Parameters;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn tree() -> VirtualTree {
        VirtualTree::new(TreeOptions::default()).unwrap()
    }

    fn pack(members: &[(&str, &[u8])], endian: Endian) -> Vec<u8> {
        let members: Vec<_> = members
            .iter()
            .map(|(name, data)| PacMember::new(*name, data.to_vec()))
            .collect();
        let options = BuildOptions {
            endian,
            ..Default::default()
        };
        arcsys_pac::build(&members, &options).unwrap()
    }

    fn nested() -> Vec<u8> {
        let inner = pack(&[("deep.bin", b"deep payload")], Endian::Little);
        pack(&[("inner.pac", &inner), ("top.bin", b"top")], Endian::Little)
    }

    fn names(tree: &VirtualTree, ids: &[NodeId]) -> Vec<String> {
        ids.iter().map(|&id| tree.name(id).to_string()).collect()
    }

    #[test]
    fn test_big_endian_root_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.pac");
        std::fs::write(&path, pack(&[("a.bin", b"alpha"), ("b.bin", b"beta")], Endian::Big)).unwrap();

        let mut tree = tree();
        let root = tree.open_file(&path).unwrap();
        assert_eq!(tree.status(root), NodeStatus::Uninitialized);

        let children = tree.children(root).unwrap();
        assert_eq!(names(&tree, &children), ["a.bin", "b.bin"]);
        assert_eq!(tree.endian(root), Some(Endian::Big));
        assert_eq!(&*tree.read(children[1]).unwrap(), b"beta");
        assert_eq!(tree.path(children[1]), format!("{}:b.bin", path.display()));
        assert_eq!(tree.status(children[0]), NodeStatus::Uninitialized);
    }

    #[test]
    fn test_walk_nested() {
        let mut tree = tree();
        let root = tree.insert_bytes("outer.pac", nested());
        let walked = tree.walk(root).unwrap();

        let listed: Vec<_> = walked
            .iter()
            .map(|&(id, depth)| (tree.path(id).to_string(), depth))
            .collect();
        assert_eq!(
            listed,
            [
                ("outer.pac".to_string(), 0),
                ("outer.pac:inner.pac".to_string(), 1),
                ("outer.pac:inner.pac:deep.bin".to_string(), 2),
                ("outer.pac:top.bin".to_string(), 1),
            ]
        );

        let deep = tree.lookup(root, "inner.pac:deep.bin").unwrap().unwrap();
        assert_eq!(&*tree.read(deep).unwrap(), b"deep payload");
        assert!(tree.lookup(root, "inner.pac:missing").unwrap().is_none());
    }

    #[test]
    fn test_encrypted_root() {
        let plain = pack(&[("a.bin", b"alpha")], Endian::Little);
        let mut tree = tree();
        let root = tree.insert_bytes("chr.pac", obfuscation::fpac_encrypt(&plain, "chr.pac"));

        let info = tree.info(root);
        assert_eq!(info.status, NodeStatus::HeaderParsed);
        assert_eq!(info.obfuscation, Obfuscation::FPAC_ENCRYPTION);
        assert_eq!(info.magic, Some(*b"FPAC"));

        assert_eq!(&*tree.read(root).unwrap(), &plain[..]);
        assert_eq!(tree.status(root), NodeStatus::ContentResolved);
        let child = tree.children(root).unwrap()[0];
        assert_eq!(&*tree.read(child).unwrap(), b"alpha");
        assert!(tree.obfuscation(child).is_empty());
    }

    #[test]
    fn test_not_a_container() {
        let mut tree = tree();
        let odd = tree.insert_bytes("odd.pac", vec![0x55; 48]);
        let text = tree.insert_bytes("readme.txt", b"hello".to_vec());

        assert!(tree.children(odd).unwrap().is_empty());
        assert!(tree.children(text).unwrap().is_empty());
        assert_eq!(tree.walk(text).unwrap().len(), 1);
        assert_eq!(tree.status(odd), NodeStatus::ContentResolved);
    }

    #[test]
    fn test_sticky_no_access() {
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(b"never seen").unwrap();
        let mut data = enc.finish().unwrap();
        data.truncate(12);

        let mut tree = tree();
        let id = tree.insert_bytes("broken.bin", data);
        let err = tree.read(id).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DecodeFailure);
        assert_eq!(tree.status(id), NodeStatus::NoAccess);
        assert!(matches!(tree.read(id), Err(Error::NoAccess(_))));
        assert!(matches!(tree.initialize(id), Err(Error::NoAccess(_))));
    }

    #[test]
    fn test_member_image() {
        let bitmap = Bitmap::new(2, 2, PixelFormat::Argb32, (0..16).collect(), Vec::new()).unwrap();
        let data = hip::encode(&bitmap, &EncodeOptions::default()).unwrap();

        let mut tree = tree();
        let root = tree.insert_bytes("chr.pac", pack(&[("chr_00.hip", &data)], Endian::Little));
        let child = tree.children(root).unwrap()[0];
        assert_eq!(tree.kind(child), EntryKind::Image);

        let header = tree.hip_header(child).unwrap();
        assert_eq!((header.canvas_width, header.canvas_height), (2, 2));
        assert_eq!(tree.image(child, &DecodeOptions::default()).unwrap(), bitmap);
        assert_eq!(tree.endian(child), Some(Endian::Little));
    }

    #[test]
    fn test_corrupt_image_member_spares_siblings() {
        let bitmap = Bitmap::new(2, 2, PixelFormat::Argb32, (0..16).collect(), Vec::new()).unwrap();
        let good = hip::encode(&bitmap, &EncodeOptions::default()).unwrap();
        let mut bad = good.clone();
        bad[0x10..0x14].copy_from_slice(&0x7FFF_FFFFi32.to_le_bytes());
        bad[0x14..0x18].copy_from_slice(&0x7FFF_FFFFi32.to_le_bytes());

        let mut tree = tree();
        let root = tree.insert_bytes(
            "chr.pac",
            pack(&[("chr_00.hip", &bad), ("chr_01.hip", &good)], Endian::Little),
        );
        let children = tree.children(root).unwrap();
        let (bad, good) = (children[0], children[1]);

        let err = tree.image(bad, &DecodeOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DecodeFailure);
        assert_eq!(tree.status(bad), NodeStatus::NoAccess);
        assert!(matches!(tree.read(bad), Err(Error::NoAccess(_))));

        assert_eq!(tree.image(good, &DecodeOptions::default()).unwrap(), bitmap);
        assert_eq!(tree.walk(root).unwrap().len(), 3);
    }

    #[test]
    fn test_not_an_image_is_not_sticky() {
        let mut tree = tree();
        let root = tree.insert_bytes("chr.pac", pack(&[("fake.hip", b"not a hip")], Endian::Little));
        let child = tree.children(root).unwrap()[0];

        let err = tree.hip_header(child).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FormatMismatch);
        assert_ne!(tree.status(child), NodeStatus::NoAccess);
        assert_eq!(&*tree.read(child).unwrap(), b"not a hip");
    }

    #[test]
    fn test_big_endian_palette_member() {
        let colors = [Argb(0xFF00_0000), Argb(0xFF12_3456)];
        let hpl = HplPalette::encode(&colors, Endian::Big);

        let mut tree = tree();
        let root = tree.insert_bytes("pal.pac", pack(&[("p.hpl", &hpl)], Endian::Big));
        let child = tree.children(root).unwrap()[0];
        assert_eq!(tree.endian(child), Some(Endian::Big));

        let palette = tree.palette(child).unwrap();
        assert_eq!(palette.endian, Endian::Big);
        assert_eq!(palette.palette, colors);
    }

    #[test]
    fn test_segs_member() {
        let payload = b"sixteen byte run";
        let mut blob = b"segs".to_vec();
        blob.extend(0u16.to_le_bytes());
        blob.extend(1u16.to_le_bytes());
        blob.extend(16u32.to_le_bytes());
        blob.extend(40u32.to_le_bytes());
        blob.extend(16u16.to_le_bytes());
        blob.extend(16u16.to_le_bytes());
        blob.extend(1u32.to_le_bytes());
        blob.extend(payload);

        let mut tree = tree();
        let root = tree.insert_bytes("blob.pac", pack(&[("data.bin", &blob)], Endian::Little));
        let child = tree.children(root).unwrap()[0];
        assert_eq!(tree.kind(child), EntryKind::Opaque);
        assert_eq!(tree.info(child).kind, EntryKind::CompressedBlob);
        assert_eq!(tree.segs(child).unwrap(), payload);
    }

    #[test]
    fn test_cache_bytes() {
        let options = TreeOptions {
            cache_bytes: true,
            ..Default::default()
        };
        let mut cached = VirtualTree::new(options).unwrap();
        let id = cached.insert_bytes("a.bin", b"abc".to_vec());
        assert!(Arc::ptr_eq(&cached.read(id).unwrap(), &cached.read(id).unwrap()));

        let mut plain = tree();
        let id = plain.insert_bytes("a.bin", b"abc".to_vec());
        assert!(!Arc::ptr_eq(&plain.read(id).unwrap(), &plain.read(id).unwrap()));
    }

    #[test]
    fn test_truncated_member_clamped() {
        let a = [1u8; 16];
        let b: Vec<u8> = (0..32).collect();
        let mut data = pack(&[("a.bin", &a), ("b.bin", &b)], Endian::Little);
        data.truncate(data.len() - 20);

        let mut tree = tree();
        let root = tree.insert_bytes("cut.pac", data);
        let children = tree.children(root).unwrap();
        assert_eq!(tree.length(children[1]), 12);
        assert_eq!(&*tree.read(children[1]).unwrap(), &b[..12]);
        assert_eq!(&*tree.read(children[0]).unwrap(), &a);
    }

    #[test]
    fn test_replace_persists_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.pac");
        std::fs::write(
            &path,
            pack(&[("a.bin", b"alpha"), ("b.bin", b"beta"), ("c.bin", b"gamma")], Endian::Big),
        )
        .unwrap();

        let mut tree = tree();
        let root = tree.open_file(&path).unwrap();
        let children = tree.children(root).unwrap();
        tree.replace_content(children[1], b"a much longer beta payload".to_vec())
            .unwrap();

        assert_eq!(tree.children(root).unwrap(), children);
        assert_eq!(&*tree.read(children[1]).unwrap(), b"a much longer beta payload");
        assert_eq!(&*tree.read(children[2]).unwrap(), b"gamma");

        let mut reopened = VirtualTree::new(TreeOptions::default()).unwrap();
        let root = reopened.open_file(&path).unwrap();
        let children = reopened.children(root).unwrap();
        assert_eq!(reopened.endian(root), Some(Endian::Big));
        assert_eq!(&*reopened.read(children[0]).unwrap(), b"alpha");
        assert_eq!(&*reopened.read(children[1]).unwrap(), b"a much longer beta payload");
        assert_eq!(&*reopened.read(children[2]).unwrap(), b"gamma");
    }

    #[test]
    fn test_nested_replace_propagates() {
        let mut tree = tree();
        let root = tree.insert_bytes("outer.pac", nested());
        let deep = tree.lookup(root, "inner.pac:deep.bin").unwrap().unwrap();
        tree.replace_content(deep, b"rewritten".to_vec()).unwrap();

        let mut fresh = VirtualTree::new(TreeOptions::default()).unwrap();
        let copy = fresh.insert_bytes("outer.pac", tree.read(root).unwrap().to_vec());
        let deep = fresh.lookup(copy, "inner.pac:deep.bin").unwrap().unwrap();
        assert_eq!(&*fresh.read(deep).unwrap(), b"rewritten");
        let top = fresh.lookup(copy, "top.bin").unwrap().unwrap();
        assert_eq!(&*fresh.read(top).unwrap(), b"top");
    }

    #[test]
    fn test_rebuild_keeps_encryption() {
        let plain = pack(&[("a.bin", b"alpha"), ("b.bin", b"beta")], Endian::Little);
        let mut tree = tree();
        let root = tree.insert_bytes("chr.pac", obfuscation::fpac_encrypt(&plain, "chr.pac"));
        let children = tree.children(root).unwrap();
        tree.replace_content(children[0], b"omega".to_vec()).unwrap();

        let raw = tree.raw(root).unwrap();
        assert_ne!(&raw[..4], b"FPAC");
        assert_eq!(&*tree.read(children[0]).unwrap(), b"omega");
        assert_eq!(tree.obfuscation(root), Obfuscation::FPAC_ENCRYPTION);
    }

    #[test]
    fn test_remove_child() {
        let mut tree = tree();
        let root = tree.insert_bytes(
            "data.pac",
            pack(&[("a.bin", b"alpha"), ("b.bin", b"beta"), ("c.bin", b"gamma")], Endian::Little),
        );
        let children = tree.children(root).unwrap();
        tree.remove_child(root, children[1], None).unwrap();

        let remaining = tree.children(root).unwrap();
        assert_eq!(names(&tree, &remaining), ["a.bin", "c.bin"]);
        assert_eq!(tree.container(root).unwrap().file_count(), 2);
        assert_eq!(&*tree.read(remaining[1]).unwrap(), b"gamma");
        assert!(matches!(tree.read(children[1]), Err(Error::NoAccess(_))));

        let other = tree.insert_bytes("x.bin", Vec::new());
        let err = tree.remove_child(root, other, None).unwrap_err();
        assert!(matches!(err, Error::NotAMember { .. }));
        assert_eq!(err.kind(), ErrorKind::Build);
    }

    #[test]
    fn test_insert_child_with_order() {
        let mut tree = tree();
        let root = tree.insert_bytes("data.pac", pack(&[("b.bin", b"beta")], Endian::Little));
        let order = FileOrder::parse("a.bin\nb.bin\n");
        let added = tree.insert_child(root, "a.bin", b"alpha".to_vec(), Some(&order)).unwrap();

        let children = tree.children(root).unwrap();
        assert_eq!(names(&tree, &children), ["a.bin", "b.bin"]);
        assert_eq!(children[0], added);
        assert_eq!(&*tree.read(added).unwrap(), b"alpha");
    }

    #[test]
    fn test_file_order() {
        let mut tree = tree();
        let root = tree.insert_bytes("outer.pac", nested());
        let order = tree.file_order(root).unwrap();
        assert_eq!(order.to_text(), "inner.pac\n{\n    deep.bin\n}\ntop.bin\n");
    }

    #[test]
    fn test_create_roots() {
        let mut tree = tree();
        let members = [PacMember::new("a.bin", vec![9; 3])];
        let options = BuildOptions {
            parameters: Parameters::GENERATE_NAME_ID,
            ..Default::default()
        };
        let pac = tree.create_container("new.pac", &members, &options).unwrap();
        assert_eq!(tree.container(pac).unwrap().name_width, 32);

        let bitmap = Bitmap::new(1, 1, PixelFormat::Argb32, vec![1, 2, 3, 4], Vec::new()).unwrap();
        let hip = tree
            .create_image("new.hip", &bitmap, &EncodeOptions::default())
            .unwrap();
        assert_eq!(tree.image(hip, &DecodeOptions::default()).unwrap(), bitmap);

        let hpl = tree.create_palette("new.hpl", &[Argb(1)], Endian::Little);
        assert_eq!(tree.palette(hpl).unwrap().palette, [Argb(1)]);
        assert_eq!(tree.roots(), [pac, hip, hpl]);
    }
}
