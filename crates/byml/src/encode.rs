//! Document encoding.
//!
//! Every cross-reference in the output is an absolute offset and the format
//! has no relocation records, so nothing can be written until everything has
//! been sized. Encoding runs in three passes:
//!
//! 1. **Build** walks the tree once, interning strings and hash keys,
//!    collecting 8-byte values and binary blobs, and recording one write-time
//!    container per array/hash in pre-order. Value slots are stored as
//!    handles into those tables.
//! 2. **Layout** sorts the pools, sizes every section and assigns each
//!    handle its final offset or index.
//! 3. **Emit** writes the sections front to back, reading only resolved
//!    values.
//!
//! Section order: header, hash key pool, string pool, big data (8-byte
//! values, then binary blobs), path arrays, containers.

use std::collections::HashMap;
use std::sync::Arc;

use log::debug;

use crate::document::Document;
use crate::error::{Error, Result};
use crate::header::{DEFAULT_VERSION, HEADER_SIZE, Header};
use crate::io::{MAX_U24, Writer, align_up};
use crate::kind::NodeKind;
use crate::node::{Node, NodeRef};
use crate::path::PathArray;
use crate::pool::{PoolBuilder, StringPool};

/// Options controlling [`encode_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Version word written to the header.
    pub version: u16,
    /// Emit a container reached through the same [`NodeRef`] twice only once.
    pub share_containers: bool,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            version: DEFAULT_VERSION,
            share_containers: true,
        }
    }
}

impl EncodeOptions {
    /// Default options with the document's own version.
    #[must_use]
    pub fn from_document(doc: &Document) -> Self {
        Self {
            version: doc.version(),
            ..Self::default()
        }
    }
}

/// Encode a document with the document's version and default options.
///
/// # Errors
///
/// Returns `Error::InvalidRootKind` if the root is not an array or hash,
/// `Error::UnsupportedNode` if the tree contains a string pool node,
/// `Error::TooManyEntries` if a container or pool exceeds a 24-bit count and
/// `Error::DocumentTooLarge` if the output would not fit 32-bit offsets.
pub fn encode(doc: &Document) -> Result<Vec<u8>> {
    encode_with(doc, &EncodeOptions::from_document(doc))
}

/// Encode a document with explicit options.
///
/// # Errors
///
/// See [`encode`].
pub fn encode_with(doc: &Document, options: &EncodeOptions) -> Result<Vec<u8>> {
    let mut plan = Plan::build(doc, options)?;
    let layout = plan.layout()?;
    debug!(
        "layout: {} containers, {} keys, {} strings, {} big values, {} blobs, {} path arrays, {} bytes",
        plan.containers.len(),
        layout.keys.pool.len(),
        layout.strings.pool.len(),
        plan.big_data.len(),
        plan.binaries.len(),
        plan.paths.len(),
        layout.size
    );
    plan.emit(&layout, options.version)
}

// ============================================================================
// Build
// ============================================================================

/// Where a value slot's final 4 bytes come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    /// Final value, known at build time.
    Inline(u32),
    /// String pool handle.
    String(u32),
    /// Index into the 8-byte values.
    BigData(usize),
    /// Index into the binary blobs.
    Binary(usize),
    /// Index into the container list.
    Container(usize),
    /// Index into the path arrays.
    Path(usize),
}

#[derive(Debug)]
struct Entry {
    /// Hash key pool handle; `None` for array elements.
    key: Option<u32>,
    kind: NodeKind,
    slot: Slot,
}

#[derive(Debug)]
struct Container {
    kind: NodeKind,
    entries: Vec<Entry>,
}

impl Container {
    fn encoded_len(&self) -> usize {
        let n = self.entries.len();
        match self.kind {
            NodeKind::Array => align_up(4 + n, 4) + 4 * n,
            _ => 4 + 8 * n,
        }
    }
}

struct Plan<'a> {
    share_containers: bool,
    keys: PoolBuilder,
    strings: PoolBuilder,
    big_data: Vec<u64>,
    binaries: Vec<&'a [u8]>,
    /// Document-level path array first when `has_document_path`.
    paths: Vec<&'a PathArray>,
    has_document_path: bool,
    containers: Vec<Container>,
    seen: HashMap<*const Node, usize>,
    seen_paths: HashMap<*const Node, usize>,
}

impl<'a> Plan<'a> {
    fn build(doc: &'a Document, options: &EncodeOptions) -> Result<Self> {
        let root = doc.root();
        let kind = root.kind();
        if !kind.is_valid_root() {
            return Err(Error::InvalidRootKind(kind.byte()));
        }

        let mut plan = Plan {
            share_containers: options.share_containers,
            keys: PoolBuilder::default(),
            strings: PoolBuilder::default(),
            big_data: Vec::new(),
            binaries: Vec::new(),
            paths: Vec::new(),
            has_document_path: false,
            containers: Vec::new(),
            seen: HashMap::new(),
            seen_paths: HashMap::new(),
        };
        if let Some(path_array) = doc.path_array() {
            plan.paths.push(path_array);
            plan.has_document_path = true;
        }
        plan.add_container(root)?;
        Ok(plan)
    }

    /// Record `node` (an array or hash) and its subtree, returning its index.
    fn add_container(&mut self, node: &'a NodeRef) -> Result<usize> {
        let ptr = Arc::as_ptr(node);
        if self.share_containers
            && let Some(&id) = self.seen.get(&ptr)
        {
            return Ok(id);
        }

        let id = self.containers.len();
        self.containers.push(Container {
            kind: node.kind(),
            entries: Vec::new(),
        });
        if self.share_containers {
            self.seen.insert(ptr, id);
        }

        let mut entries = Vec::new();
        match &**node {
            Node::Array(array) => {
                check_count(array.len())?;
                entries.reserve(array.len());
                for child in array {
                    let slot = self.add_value(child)?;
                    entries.push(Entry {
                        key: None,
                        kind: child.kind(),
                        slot,
                    });
                }
            }
            Node::Hash(hash) => {
                check_count(hash.len())?;
                entries.reserve(hash.len());
                for (key, child) in hash.sorted_entries() {
                    let key = self.keys.intern(key);
                    let slot = self.add_value(child)?;
                    entries.push(Entry {
                        key: Some(key),
                        kind: child.kind(),
                        slot,
                    });
                }
            }
            other => return Err(Error::UnsupportedNode(other.kind().name())),
        }
        self.containers[id].entries = entries;
        Ok(id)
    }

    fn add_value(&mut self, node: &'a NodeRef) -> Result<Slot> {
        let slot = match &**node {
            Node::Null => Slot::Inline(0),
            Node::Bool(b) => Slot::Inline(u32::from(*b)),
            Node::Int32(n) => Slot::Inline(*n as u32),
            Node::UInt32(n) => Slot::Inline(*n),
            Node::Float32(f) => Slot::Inline(f.to_bits()),
            Node::Int64(n) => self.add_big_data(*n as u64),
            Node::UInt64(n) => self.add_big_data(*n),
            Node::Float64(f) => self.add_big_data(f.to_bits()),
            Node::String(s) => Slot::String(self.strings.intern(s)),
            Node::Binary(data) => {
                self.binaries.push(data);
                Slot::Binary(self.binaries.len() - 1)
            }
            Node::Array(_) | Node::Hash(_) => Slot::Container(self.add_container(node)?),
            Node::PathArray(path_array) => Slot::Path(self.add_path(node, path_array)),
            Node::StringPool(_) => return Err(Error::UnsupportedNode(NodeKind::StringPool.name())),
        };
        Ok(slot)
    }

    fn add_big_data(&mut self, bits: u64) -> Slot {
        self.big_data.push(bits);
        Slot::BigData(self.big_data.len() - 1)
    }

    fn add_path(&mut self, node: &NodeRef, path_array: &'a PathArray) -> usize {
        let ptr = Arc::as_ptr(node);
        if self.share_containers
            && let Some(&id) = self.seen_paths.get(&ptr)
        {
            return id;
        }
        self.paths.push(path_array);
        let id = self.paths.len() - 1;
        if self.share_containers {
            self.seen_paths.insert(ptr, id);
        }
        id
    }

    // ========================================================================
    // Layout
    // ========================================================================

    fn layout(&mut self) -> Result<Layout> {
        let (key_pool, key_remap) = std::mem::take(&mut self.keys).finish()?;
        let (string_pool, string_remap) = std::mem::take(&mut self.strings).finish()?;

        let mut offset = HEADER_SIZE;
        if self.has_document_path {
            // true root offset follows the header
            offset += 4;
        }

        let keys = PoolSection::place(key_pool, key_remap, &mut offset);
        let strings = PoolSection::place(string_pool, string_remap, &mut offset);

        let big_data_offset = offset;
        offset += 8 * self.big_data.len();

        let mut binary_offsets = Vec::with_capacity(self.binaries.len());
        for data in &self.binaries {
            binary_offsets.push(offset);
            offset += align_up(4 + data.len(), 4);
        }

        let mut path_offsets = Vec::with_capacity(self.paths.len());
        for path_array in &self.paths {
            check_count(path_array.len())?;
            path_offsets.push(offset);
            offset += path_array.encoded_len();
        }

        let mut container_offsets = Vec::with_capacity(self.containers.len());
        for container in &self.containers {
            container_offsets.push(offset);
            offset += container.encoded_len();
        }

        if offset > u32::MAX as usize {
            return Err(Error::DocumentTooLarge { size: offset });
        }

        Ok(Layout {
            keys,
            strings,
            big_data_offset,
            binary_offsets,
            path_offsets,
            container_offsets,
            size: offset,
        })
    }

    // ========================================================================
    // Emit
    // ========================================================================

    fn emit(&self, layout: &Layout, version: u16) -> Result<Vec<u8>> {
        let mut w = Writer::with_capacity(layout.size);

        let root_offset = layout.container_offsets[0] as u32;
        let root_or_path_offset = if self.has_document_path {
            layout.path_offsets[0] as u32
        } else {
            root_offset
        };
        Header {
            version,
            hash_key_pool_offset: layout.keys.offset as u32,
            string_pool_offset: layout.strings.offset as u32,
            root_or_path_offset,
        }
        .write(&mut w)?;
        if self.has_document_path {
            w.u32(root_offset)?;
        }

        for section in [&layout.keys, &layout.strings] {
            if !section.pool.is_empty() {
                debug_assert_eq!(w.pos(), section.offset);
                section.pool.write(&mut w)?;
            }
        }

        debug_assert_eq!(w.pos(), layout.big_data_offset);
        for &bits in &self.big_data {
            w.u64(bits)?;
        }
        for data in &self.binaries {
            w.u32(data.len() as u32)?;
            w.bytes(data)?;
            w.align4()?;
        }

        for path_array in &self.paths {
            path_array.write(&mut w)?;
        }

        for (container, &offset) in self.containers.iter().zip(&layout.container_offsets) {
            debug_assert_eq!(w.pos(), offset);
            write_container(container, layout, &mut w)?;
        }

        debug_assert_eq!(w.pos(), layout.size);
        Ok(w.into_inner())
    }
}

fn check_count(count: usize) -> Result<()> {
    if count > MAX_U24 as usize {
        return Err(Error::TooManyEntries { count });
    }
    Ok(())
}

/// A sorted pool and where it goes. Empty pools are omitted (offset 0).
struct PoolSection {
    pool: StringPool,
    remap: Vec<u32>,
    offset: usize,
}

impl PoolSection {
    fn place(pool: StringPool, remap: Vec<u32>, offset: &mut usize) -> Self {
        let at = if pool.is_empty() {
            0
        } else {
            let at = *offset;
            *offset += pool.encoded_len();
            at
        };
        Self {
            pool,
            remap,
            offset: at,
        }
    }
}

/// Final offsets and indices for every handle in a [`Plan`].
struct Layout {
    keys: PoolSection,
    strings: PoolSection,
    big_data_offset: usize,
    binary_offsets: Vec<usize>,
    path_offsets: Vec<usize>,
    container_offsets: Vec<usize>,
    size: usize,
}

impl Layout {
    fn resolve(&self, slot: Slot) -> u32 {
        match slot {
            Slot::Inline(v) => v,
            Slot::String(handle) => self.strings.remap[handle as usize],
            Slot::BigData(i) => (self.big_data_offset + 8 * i) as u32,
            Slot::Binary(i) => self.binary_offsets[i] as u32,
            Slot::Container(i) => self.container_offsets[i] as u32,
            Slot::Path(i) => self.path_offsets[i] as u32,
        }
    }
}

fn write_container(container: &Container, layout: &Layout, w: &mut Writer) -> Result<()> {
    w.u8(container.kind.byte())?;
    w.u24(container.entries.len() as u32)?;

    if container.kind == NodeKind::Array {
        for entry in &container.entries {
            w.u8(entry.kind.byte())?;
        }
        w.align4()?;
        for entry in &container.entries {
            w.u32(layout.resolve(entry.slot))?;
        }
    } else {
        for entry in &container.entries {
            let key = entry.key.map_or(0, |handle| layout.keys.remap[handle as usize]);
            w.u24(key)?;
            w.u8(entry.kind.byte())?;
            w.u32(layout.resolve(entry.slot))?;
        }
    }
    Ok(())
}
