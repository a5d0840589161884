//! Decoded node tree.
//!
//! Nodes are shared through [`NodeRef`] handles: a decoded document may
//! reference one node from several parents, and the decoder hands out the
//! same handle for every reference to the same offset.
//!
//! # Typed Access
//!
//! ```
//! use byml::{Builder, Node};
//!
//! let mut b = Builder::hash();
//! b.add_i32("Id", 7).unwrap();
//! let doc = b.finish().unwrap();
//!
//! let id = doc.root().key("Id").unwrap();
//! assert_eq!(id.as_i32().unwrap(), 7);
//! assert!(id.as_str().is_err());
//! ```

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::kind::NodeKind;
use crate::path::PathArray;
use crate::pool::StringPool;

/// Shared handle to a node.
pub type NodeRef = Arc<Node>;

/// A node of any kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Null,
    Bool(bool),
    Int32(i32),
    UInt32(u32),
    Float32(f32),
    Int64(i64),
    UInt64(u64),
    Float64(f64),
    String(String),
    Binary(Vec<u8>),
    Array(Array),
    Hash(Hash),
    StringPool(StringPool),
    PathArray(PathArray),
}

impl Node {
    /// Get the kind of this node.
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Null => NodeKind::Null,
            Node::Bool(_) => NodeKind::Bool,
            Node::Int32(_) => NodeKind::Int32,
            Node::UInt32(_) => NodeKind::UInt32,
            Node::Float32(_) => NodeKind::Float32,
            Node::Int64(_) => NodeKind::Int64,
            Node::UInt64(_) => NodeKind::UInt64,
            Node::Float64(_) => NodeKind::Float64,
            Node::String(_) => NodeKind::String,
            Node::Binary(_) => NodeKind::Binary,
            Node::Array(_) => NodeKind::Array,
            Node::Hash(_) => NodeKind::Hash,
            Node::StringPool(_) => NodeKind::StringPool,
            Node::PathArray(_) => NodeKind::PathArray,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Node::Null)
    }

    /// Wrap this node in a shared handle.
    #[must_use]
    pub fn into_ref(self) -> NodeRef {
        Arc::new(self)
    }

    fn mismatch(&self, expected: NodeKind) -> Error {
        Error::UnexpectedType {
            expected: expected.name(),
            found: self.kind().name(),
        }
    }

    // --- Typed accessors ---
    //
    // Each returns `Error::UnexpectedType` when the node is another kind.

    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Node::Bool(b) => Ok(*b),
            _ => Err(self.mismatch(NodeKind::Bool)),
        }
    }

    pub fn as_i32(&self) -> Result<i32> {
        match self {
            Node::Int32(n) => Ok(*n),
            _ => Err(self.mismatch(NodeKind::Int32)),
        }
    }

    pub fn as_u32(&self) -> Result<u32> {
        match self {
            Node::UInt32(n) => Ok(*n),
            _ => Err(self.mismatch(NodeKind::UInt32)),
        }
    }

    pub fn as_f32(&self) -> Result<f32> {
        match self {
            Node::Float32(n) => Ok(*n),
            _ => Err(self.mismatch(NodeKind::Float32)),
        }
    }

    pub fn as_i64(&self) -> Result<i64> {
        match self {
            Node::Int64(n) => Ok(*n),
            _ => Err(self.mismatch(NodeKind::Int64)),
        }
    }

    pub fn as_u64(&self) -> Result<u64> {
        match self {
            Node::UInt64(n) => Ok(*n),
            _ => Err(self.mismatch(NodeKind::UInt64)),
        }
    }

    pub fn as_f64(&self) -> Result<f64> {
        match self {
            Node::Float64(n) => Ok(*n),
            _ => Err(self.mismatch(NodeKind::Float64)),
        }
    }

    pub fn as_str(&self) -> Result<&str> {
        match self {
            Node::String(s) => Ok(s),
            _ => Err(self.mismatch(NodeKind::String)),
        }
    }

    pub fn as_bytes(&self) -> Result<&[u8]> {
        match self {
            Node::Binary(b) => Ok(b),
            _ => Err(self.mismatch(NodeKind::Binary)),
        }
    }

    pub fn as_array(&self) -> Result<&Array> {
        match self {
            Node::Array(a) => Ok(a),
            _ => Err(self.mismatch(NodeKind::Array)),
        }
    }

    pub fn as_hash(&self) -> Result<&Hash> {
        match self {
            Node::Hash(h) => Ok(h),
            _ => Err(self.mismatch(NodeKind::Hash)),
        }
    }

    pub fn as_string_pool(&self) -> Result<&StringPool> {
        match self {
            Node::StringPool(p) => Ok(p),
            _ => Err(self.mismatch(NodeKind::StringPool)),
        }
    }

    pub fn as_path_array(&self) -> Result<&PathArray> {
        match self {
            Node::PathArray(p) => Ok(p),
            _ => Err(self.mismatch(NodeKind::PathArray)),
        }
    }

    /// Mutable access to an array, for editing a tree in place.
    pub fn as_array_mut(&mut self) -> Result<&mut Array> {
        match self {
            Node::Array(a) => Ok(a),
            _ => Err(self.mismatch(NodeKind::Array)),
        }
    }

    /// Mutable access to a hash, for editing a tree in place.
    pub fn as_hash_mut(&mut self) -> Result<&mut Hash> {
        match self {
            Node::Hash(h) => Ok(h),
            _ => Err(self.mismatch(NodeKind::Hash)),
        }
    }

    // --- Navigation ---

    /// Get the child at `index` of an array node.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnexpectedType` if this is not an array, or
    /// `Error::IndexOutOfBounds` if `index` is past the end.
    pub fn index(&self, index: usize) -> Result<&NodeRef> {
        self.as_array()?.get(index)
    }

    /// Get the value for `key` of a hash node.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnexpectedType` if this is not a hash, or
    /// `Error::KeyNotFound` if the key is absent.
    pub fn key(&self, key: &str) -> Result<&NodeRef> {
        self.as_hash()?.entry(key)
    }
}

impl From<bool> for Node {
    fn from(v: bool) -> Self {
        Node::Bool(v)
    }
}

impl From<i32> for Node {
    fn from(v: i32) -> Self {
        Node::Int32(v)
    }
}

impl From<u32> for Node {
    fn from(v: u32) -> Self {
        Node::UInt32(v)
    }
}

impl From<f32> for Node {
    fn from(v: f32) -> Self {
        Node::Float32(v)
    }
}

impl From<i64> for Node {
    fn from(v: i64) -> Self {
        Node::Int64(v)
    }
}

impl From<u64> for Node {
    fn from(v: u64) -> Self {
        Node::UInt64(v)
    }
}

impl From<f64> for Node {
    fn from(v: f64) -> Self {
        Node::Float64(v)
    }
}

impl From<&str> for Node {
    fn from(v: &str) -> Self {
        Node::String(v.to_owned())
    }
}

impl From<String> for Node {
    fn from(v: String) -> Self {
        Node::String(v)
    }
}

impl From<Vec<u8>> for Node {
    fn from(v: Vec<u8>) -> Self {
        Node::Binary(v)
    }
}

impl From<Array> for Node {
    fn from(v: Array) -> Self {
        Node::Array(v)
    }
}

impl From<Hash> for Node {
    fn from(v: Hash) -> Self {
        Node::Hash(v)
    }
}

impl From<PathArray> for Node {
    fn from(v: PathArray) -> Self {
        Node::PathArray(v)
    }
}

/// Heterogeneous list of child nodes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Array {
    items: Vec<NodeRef>,
}

impl Array {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_refs(items: Vec<NodeRef>) -> Self {
        Self { items }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Get the child at `index`.
    ///
    /// # Errors
    ///
    /// Returns `Error::IndexOutOfBounds` if `index` is past the end.
    pub fn get(&self, index: usize) -> Result<&NodeRef> {
        self.items.get(index).ok_or(Error::IndexOutOfBounds {
            index,
            length: self.items.len(),
        })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NodeRef> {
        self.items.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[NodeRef] {
        &self.items
    }

    pub fn push(&mut self, node: impl Into<Node>) {
        self.items.push(Arc::new(node.into()));
    }

    /// Append an existing handle, sharing it with any other parent.
    pub fn push_ref(&mut self, node: NodeRef) {
        self.items.push(node);
    }
}

impl<'a> IntoIterator for &'a Array {
    type Item = &'a NodeRef;
    type IntoIter = std::slice::Iter<'a, NodeRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<N: Into<Node>> FromIterator<N> for Array {
    fn from_iter<I: IntoIterator<Item = N>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().map(|n| Arc::new(n.into())).collect(),
        }
    }
}

/// Key-value entries sorted by key.
///
/// Keys are compared byte-wise over UTF-8, which can order keys mixing
/// characters above U+FFFF with U+E000..=U+FFFF differently from UTF-16
/// ordinal comparison. Lookups binary search, so entries must stay
/// sorted; [`Hash::insert`] keeps them sorted, and decoded hashes are trusted
/// to arrive sorted from the producer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hash {
    entries: Vec<(String, NodeRef)>,
}

impl Hash {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a hash from entries in stored order, without sorting.
    pub(crate) fn from_stored(entries: Vec<(String, NodeRef)>) -> Self {
        Self { entries }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn search(&self, key: &str) -> std::result::Result<usize, usize> {
        self.entries.binary_search_by(|(k, _)| k.as_str().cmp(key))
    }

    /// Look up `key`, returning `None` if absent.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&NodeRef> {
        self.search(key).ok().map(|i| &self.entries[i].1)
    }

    /// Look up `key`.
    ///
    /// # Errors
    ///
    /// Returns `Error::KeyNotFound` if the key is absent.
    pub fn entry(&self, key: &str) -> Result<&NodeRef> {
        self.get(key)
            .ok_or_else(|| Error::KeyNotFound(key.to_owned()))
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.search(key).is_ok()
    }

    /// Iterate entries in stored (key) order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &NodeRef)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &NodeRef> {
        self.entries.iter().map(|(_, v)| v)
    }

    /// Insert or replace `key`, keeping entries sorted.
    ///
    /// Returns the previous value if the key was present.
    pub fn insert(&mut self, key: impl Into<String>, node: impl Into<Node>) -> Option<NodeRef> {
        self.insert_ref(key, Arc::new(node.into()))
    }

    /// Insert an existing handle, sharing it with any other parent.
    pub fn insert_ref(&mut self, key: impl Into<String>, node: NodeRef) -> Option<NodeRef> {
        let key = key.into();
        match self.search(&key) {
            Ok(i) => Some(std::mem::replace(&mut self.entries[i].1, node)),
            Err(i) => {
                self.entries.insert(i, (key, node));
                None
            }
        }
    }

    /// Remove `key`, returning its value if it was present.
    pub fn remove(&mut self, key: &str) -> Option<NodeRef> {
        let i = self.search(key).ok()?;
        Some(self.entries.remove(i).1)
    }

    /// Check whether entries are in strictly ascending key order.
    #[must_use]
    pub fn is_sorted(&self) -> bool {
        self.entries.windows(2).all(|w| w[0].0 < w[1].0)
    }

    /// Entries ordered by key, whatever their stored order.
    pub(crate) fn sorted_entries(&self) -> Vec<(&str, &NodeRef)> {
        let mut entries: Vec<_> = self.iter().collect();
        if !self.is_sorted() {
            entries.sort_by(|a, b| a.0.cmp(b.0));
        }
        entries
    }
}
