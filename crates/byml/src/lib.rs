//! Reader and writer for BYML, the little-endian binary resource tree used by
//! game data files.
//!
//! A document is a tree of arrays, hashes and scalars. Strings and hash keys
//! live in two deduplicated pools, 8-byte values live out of line, and every
//! reference is an absolute offset.
//!
//! ```
//! use byml::{Builder, Document};
//!
//! let mut b = Builder::hash();
//! b.add_str("Name", "Obj").unwrap();
//! b.add_i64("Id", -1).unwrap();
//! let bytes = b.finish().unwrap().to_bytes().unwrap();
//!
//! let doc = Document::from_bytes(&bytes).unwrap();
//! assert_eq!(doc.key("Name").unwrap().as_str().unwrap(), "Obj");
//! assert_eq!(doc.key("Id").unwrap().as_i64().unwrap(), -1);
//! ```

pub mod builder;
pub mod decode;
pub mod document;
pub mod encode;
pub mod error;
pub mod header;
pub(crate) mod io;
pub mod json;
pub mod kind;
pub mod node;
pub mod path;
pub mod pool;

pub use builder::Builder;
pub use decode::decode;
pub use document::Document;
pub use encode::{EncodeOptions, encode, encode_with};
pub use error::{Error, ErrorCategory, Result};
pub use json::{from_json, node_to_json, to_json};
pub use kind::NodeKind;
pub use node::{Array, Hash, Node, NodeRef};
pub use path::{PathArray, PathPoint};
pub use pool::StringPool;
