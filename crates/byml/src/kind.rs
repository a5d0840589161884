//! Node kind bytes.
//!
//! Every node is identified by a single kind byte. The set of kinds is closed:
//! any byte outside this enumeration is a format error.

use crate::error::{Error, Result};

/// Kind of a node, with its on-disk byte as the discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum NodeKind {
    String = 0xA0,
    Binary = 0xA1,
    Array = 0xC0,
    Hash = 0xC1,
    StringPool = 0xC2,
    PathArray = 0xC3,
    Bool = 0xD0,
    Int32 = 0xD1,
    Float32 = 0xD2,
    UInt32 = 0xD3,
    Int64 = 0xD4,
    UInt64 = 0xD5,
    Float64 = 0xD6,
    Null = 0xFF,
}

impl NodeKind {
    /// Parse a kind byte, returning `None` for unknown bytes.
    #[inline]
    #[must_use]
    pub const fn from_byte(b: u8) -> Option<Self> {
        Some(match b {
            0xA0 => NodeKind::String,
            0xA1 => NodeKind::Binary,
            0xC0 => NodeKind::Array,
            0xC1 => NodeKind::Hash,
            0xC2 => NodeKind::StringPool,
            0xC3 => NodeKind::PathArray,
            0xD0 => NodeKind::Bool,
            0xD1 => NodeKind::Int32,
            0xD2 => NodeKind::Float32,
            0xD3 => NodeKind::UInt32,
            0xD4 => NodeKind::Int64,
            0xD5 => NodeKind::UInt64,
            0xD6 => NodeKind::Float64,
            0xFF => NodeKind::Null,
            _ => return None,
        })
    }

    /// Parse a kind byte read at `offset`.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownKind` if the byte is not a recognized kind.
    #[inline]
    pub fn parse(b: u8, offset: usize) -> Result<Self> {
        Self::from_byte(b).ok_or(Error::UnknownKind { byte: b, offset })
    }

    /// Get the raw kind byte.
    #[inline]
    #[must_use]
    pub const fn byte(self) -> u8 {
        self as u8
    }

    /// Get the kind name as a string (for error messages).
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            NodeKind::String => "string",
            NodeKind::Binary => "binary",
            NodeKind::Array => "array",
            NodeKind::Hash => "hash",
            NodeKind::StringPool => "string pool",
            NodeKind::PathArray => "path array",
            NodeKind::Bool => "bool",
            NodeKind::Int32 => "int32",
            NodeKind::Float32 => "float32",
            NodeKind::UInt32 => "uint32",
            NodeKind::Int64 => "int64",
            NodeKind::UInt64 => "uint64",
            NodeKind::Float64 => "float64",
            NodeKind::Null => "null",
        }
    }

    /// Array or hash: the only kinds with child nodes.
    #[inline]
    #[must_use]
    pub const fn is_container(self) -> bool {
        matches!(self, NodeKind::Array | NodeKind::Hash)
    }

    /// Kinds allowed as the document root.
    #[inline]
    #[must_use]
    pub const fn is_valid_root(self) -> bool {
        self.is_container()
    }

}
