//! Incremental document construction.
//!
//! [`Builder`] keeps a stack of open containers. Values are added to the
//! innermost one; `push_array`/`push_hash` open a child and `pop` closes it.
//! Hash entries take a key and array entries take `None`:
//!
//! ```
//! use byml::Builder;
//!
//! let mut b = Builder::hash();
//! b.add_str("Name", "Obj").unwrap();
//! b.push_array("Scale").unwrap();
//! b.add_f32(None, 1.0).unwrap();
//! b.add_f32(None, 2.0).unwrap();
//! b.pop().unwrap();
//! let doc = b.finish().unwrap();
//!
//! assert_eq!(doc.key("Scale").unwrap().as_array().unwrap().len(), 2);
//! ```

use crate::document::Document;
use crate::error::{Error, Result};
use crate::header::DEFAULT_VERSION;
use crate::node::{Array, Hash, Node, NodeRef};
use crate::path::PathArray;

#[derive(Debug)]
enum Open {
    Array(Array),
    Hash(Hash),
}

#[derive(Debug)]
struct Frame {
    /// Key in the parent hash, if the parent is a hash.
    key: Option<String>,
    container: Open,
}

impl Frame {
    fn new(key: Option<&str>, container: Open) -> Self {
        Self {
            key: key.map(str::to_owned),
            container,
        }
    }

    fn check_key(&self, key: Option<&str>) -> Result<()> {
        match (&self.container, key) {
            (Open::Array(_), None) | (Open::Hash(_), Some(_)) => Ok(()),
            (Open::Array(_), Some(_)) => Err(Error::KeyMismatch { in_hash: false }),
            (Open::Hash(_), None) => Err(Error::KeyMismatch { in_hash: true }),
        }
    }

    fn attach(&mut self, key: Option<&str>, node: NodeRef) -> Result<()> {
        match (&mut self.container, key) {
            (Open::Array(array), None) => array.push_ref(node),
            (Open::Hash(hash), Some(key)) => {
                hash.insert_ref(key, node);
            }
            (Open::Array(_), Some(_)) => return Err(Error::KeyMismatch { in_hash: false }),
            (Open::Hash(_), None) => return Err(Error::KeyMismatch { in_hash: true }),
        }
        Ok(())
    }

    fn into_node(self) -> Node {
        match self.container {
            Open::Array(array) => Node::Array(array),
            Open::Hash(hash) => Node::Hash(hash),
        }
    }
}

/// Push/pop builder for a [`Document`].
#[derive(Debug)]
pub struct Builder {
    root: Frame,
    /// Open containers below the root, innermost last.
    stack: Vec<Frame>,
    version: u16,
    path_array: Option<PathArray>,
}

impl Builder {
    fn new(container: Open) -> Self {
        Self {
            root: Frame::new(None, container),
            stack: Vec::new(),
            version: DEFAULT_VERSION,
            path_array: None,
        }
    }

    /// Start a document whose root is an array.
    #[must_use]
    pub fn array() -> Self {
        Self::new(Open::Array(Array::new()))
    }

    /// Start a document whose root is a hash.
    #[must_use]
    pub fn hash() -> Self {
        Self::new(Open::Hash(Hash::new()))
    }

    /// Set the header version of the finished document.
    #[must_use]
    pub fn with_version(mut self, version: u16) -> Self {
        self.version = version;
        self
    }

    /// Attach a document-level path array.
    #[must_use]
    pub fn with_path_array(mut self, path_array: PathArray) -> Self {
        self.path_array = Some(path_array);
        self
    }

    /// Number of containers open below the root.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    fn current(&mut self) -> &mut Frame {
        self.stack.last_mut().unwrap_or(&mut self.root)
    }

    fn open<'k>(&mut self, key: impl Into<Option<&'k str>>, container: Open) -> Result<()> {
        let key = key.into();
        self.current().check_key(key)?;
        self.stack.push(Frame::new(key, container));
        Ok(())
    }

    /// Open a child array.
    ///
    /// # Errors
    ///
    /// Returns `Error::KeyMismatch` if `key` does not suit the current container.
    pub fn push_array<'k>(&mut self, key: impl Into<Option<&'k str>>) -> Result<()> {
        self.open(key, Open::Array(Array::new()))
    }

    /// Open a child hash.
    ///
    /// # Errors
    ///
    /// Returns `Error::KeyMismatch` if `key` does not suit the current container.
    pub fn push_hash<'k>(&mut self, key: impl Into<Option<&'k str>>) -> Result<()> {
        self.open(key, Open::Hash(Hash::new()))
    }

    /// Close the innermost open container and add it to its parent.
    ///
    /// # Errors
    ///
    /// Returns `Error::PopRoot` if only the root is open.
    pub fn pop(&mut self) -> Result<()> {
        let mut frame = self.stack.pop().ok_or(Error::PopRoot)?;
        let key = frame.key.take();
        let node = frame.into_node().into_ref();
        self.current().attach(key.as_deref(), node)
    }

    /// Add a node to the current container.
    ///
    /// # Errors
    ///
    /// Returns `Error::KeyMismatch` if `key` does not suit the current container.
    pub fn add_node<'k>(&mut self, key: impl Into<Option<&'k str>>, node: impl Into<Node>) -> Result<()> {
        self.add_ref(key, node.into().into_ref())
    }

    /// Add an existing handle, sharing it with any other parent.
    ///
    /// # Errors
    ///
    /// Returns `Error::KeyMismatch` if `key` does not suit the current container.
    pub fn add_ref<'k>(&mut self, key: impl Into<Option<&'k str>>, node: NodeRef) -> Result<()> {
        self.current().attach(key.into(), node)
    }

    // --- Typed adders ---
    //
    // Same rules as `add_node`.

    pub fn add_null<'k>(&mut self, key: impl Into<Option<&'k str>>) -> Result<()> {
        self.add_node(key, Node::Null)
    }

    pub fn add_bool<'k>(&mut self, key: impl Into<Option<&'k str>>, value: bool) -> Result<()> {
        self.add_node(key, value)
    }

    pub fn add_i32<'k>(&mut self, key: impl Into<Option<&'k str>>, value: i32) -> Result<()> {
        self.add_node(key, value)
    }

    pub fn add_u32<'k>(&mut self, key: impl Into<Option<&'k str>>, value: u32) -> Result<()> {
        self.add_node(key, value)
    }

    pub fn add_f32<'k>(&mut self, key: impl Into<Option<&'k str>>, value: f32) -> Result<()> {
        self.add_node(key, value)
    }

    pub fn add_i64<'k>(&mut self, key: impl Into<Option<&'k str>>, value: i64) -> Result<()> {
        self.add_node(key, value)
    }

    pub fn add_u64<'k>(&mut self, key: impl Into<Option<&'k str>>, value: u64) -> Result<()> {
        self.add_node(key, value)
    }

    pub fn add_f64<'k>(&mut self, key: impl Into<Option<&'k str>>, value: f64) -> Result<()> {
        self.add_node(key, value)
    }

    pub fn add_str<'k>(&mut self, key: impl Into<Option<&'k str>>, value: &str) -> Result<()> {
        self.add_node(key, value)
    }

    pub fn add_binary<'k>(&mut self, key: impl Into<Option<&'k str>>, value: &[u8]) -> Result<()> {
        self.add_node(key, value.to_vec())
    }

    pub fn add_path_array<'k>(
        &mut self,
        key: impl Into<Option<&'k str>>,
        value: PathArray,
    ) -> Result<()> {
        self.add_node(key, value)
    }

    /// Close every open container and build the document.
    ///
    /// # Errors
    ///
    /// Returns `Error::KeyMismatch` if an open container's key does not suit
    /// its parent.
    pub fn finish(mut self) -> Result<Document> {
        while !self.stack.is_empty() {
            self.pop()?;
        }
        let mut doc = Document::new(self.root.into_node())?;
        doc.set_version(self.version);
        doc.set_path_array(self.path_array);
        Ok(doc)
    }
}
