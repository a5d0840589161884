//! BYML document.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::header::DEFAULT_VERSION;
use crate::node::{Node, NodeRef};
use crate::path::PathArray;
use crate::pool::StringPool;
use crate::{decode, encode};

/// A decoded or constructed document.
///
/// The root is always an array or a hash. The pools are only populated on
/// decoded documents; the encoder rebuilds them from the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    version: u16,
    root: NodeRef,
    path_array: Option<PathArray>,
    hash_key_pool: Option<StringPool>,
    string_pool: Option<StringPool>,
}

impl Document {
    /// Create a document around `root`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRootKind` if `root` is not an array or hash.
    pub fn new(root: Node) -> Result<Self> {
        Self::from_ref(Arc::new(root))
    }

    /// Create a document around a shared root handle.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRootKind` if `root` is not an array or hash.
    pub fn from_ref(root: NodeRef) -> Result<Self> {
        let kind = root.kind();
        if !kind.is_valid_root() {
            return Err(Error::InvalidRootKind(kind.byte()));
        }
        Ok(Self {
            version: DEFAULT_VERSION,
            root,
            path_array: None,
            hash_key_pool: None,
            string_pool: None,
        })
    }

    pub(crate) fn from_decoded(
        version: u16,
        root: NodeRef,
        path_array: Option<PathArray>,
        hash_key_pool: Option<StringPool>,
        string_pool: Option<StringPool>,
    ) -> Self {
        Self {
            version,
            root,
            path_array,
            hash_key_pool,
            string_pool,
        }
    }

    /// Decode a document from bytes.
    ///
    /// # Errors
    ///
    /// See [`decode::decode`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        decode::decode(bytes)
    }

    /// Encode this document to bytes.
    ///
    /// # Errors
    ///
    /// See [`encode::encode`].
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        encode::encode(self)
    }

    /// Get the root node.
    #[must_use]
    pub fn root(&self) -> &NodeRef {
        &self.root
    }

    /// Get the root for editing.
    ///
    /// The root is cloned first if another handle shares it.
    pub fn root_mut(&mut self) -> &mut Node {
        Arc::make_mut(&mut self.root)
    }

    #[must_use]
    pub fn version(&self) -> u16 {
        self.version
    }

    pub fn set_version(&mut self, version: u16) {
        self.version = version;
    }

    /// Get the legacy path array stored beside the root, if any.
    #[must_use]
    pub fn path_array(&self) -> Option<&PathArray> {
        self.path_array.as_ref()
    }

    pub fn set_path_array(&mut self, path_array: Option<PathArray>) {
        self.path_array = path_array;
    }

    /// Hash key pool read from the input, if any.
    #[must_use]
    pub fn hash_key_pool(&self) -> Option<&StringPool> {
        self.hash_key_pool.as_ref()
    }

    /// String pool read from the input, if any.
    #[must_use]
    pub fn string_pool(&self) -> Option<&StringPool> {
        self.string_pool.as_ref()
    }

    /// Get root array element.
    ///
    /// # Errors
    ///
    /// Returns an error if the root is not an array or `index` is out of range.
    pub fn index(&self, index: usize) -> Result<&NodeRef> {
        self.root.index(index)
    }

    /// Get root hash value.
    ///
    /// # Errors
    ///
    /// Returns an error if the root is not a hash or `key` is absent.
    pub fn key(&self, key: &str) -> Result<&NodeRef> {
        self.root.key(key)
    }
}
