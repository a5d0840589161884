//! Error types for BYML operations.

use std::fmt;

/// Broad class of an [`Error`], for callers that only branch on the category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The input bytes are not a well-formed document.
    Format,
    /// A key, index or pool entry does not exist.
    Lookup,
    /// A node was accessed as the wrong kind.
    TypeMismatch,
    /// The tree cannot be represented in the wire format.
    Encode,
    /// The push/pop builder was driven incorrectly.
    Build,
    /// JSON conversion failed.
    Json,
}

/// Error type for BYML operations.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    // Header errors
    /// Document is too small to contain a header.
    DocumentTooSmall { len: usize },
    /// Header magic is not `YB`.
    InvalidMagic([u8; 2]),
    /// Header magic is `BY` (big-endian), which is not supported.
    BigEndianUnsupported,

    // Kind errors
    /// Kind byte is not part of the wire enumeration.
    UnknownKind { byte: u8, offset: usize },
    /// Root node is not an array or hash.
    InvalidRootKind(u8),
    /// A referenced node's tag byte does not match the kind of its slot.
    KindMismatch {
        expected: &'static str,
        found: u8,
        offset: usize,
    },

    // Read errors
    /// Read past the end of the document.
    OutOfBounds { offset: usize, len: usize },
    /// String data contains invalid UTF-8.
    InvalidUtf8 { offset: usize },
    /// Containers nest deeper than the decoder allows (or reference themselves).
    MaxDepthExceeded { offset: usize },

    // Lookup errors
    /// Key not found in hash.
    KeyNotFound(String),
    /// Array index out of bounds.
    IndexOutOfBounds { index: usize, length: usize },
    /// Pool index out of bounds (length is 0 when the pool is absent).
    PoolIndexOutOfBounds { index: u32, length: usize },

    // Type errors
    /// Expected one kind but found another.
    UnexpectedType {
        expected: &'static str,
        found: &'static str,
    },

    // Encode errors
    /// A container or pool has more entries than a 24-bit count can hold.
    TooManyEntries { count: usize },
    /// The encoded document does not fit 32-bit offsets.
    DocumentTooLarge { size: usize },
    /// The node kind cannot appear inside a tree being encoded.
    UnsupportedNode(&'static str),
    /// Writing to the output buffer failed.
    Io(String),

    // Builder errors
    /// A hash entry was added without a key, or an array entry with one.
    KeyMismatch { in_hash: bool },
    /// `pop` was called on the root container.
    PopRoot,

    // JSON errors
    /// Failed to parse JSON input.
    JsonParse(String),
    /// Failed to serialize to JSON.
    JsonSerialize(String),
    /// Float is NaN or Infinity (not representable in JSON).
    NonFiniteFloat(f64),
}

impl Error {
    /// Get the broad category of this error.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::DocumentTooSmall { .. }
            | Error::InvalidMagic(_)
            | Error::BigEndianUnsupported
            | Error::UnknownKind { .. }
            | Error::InvalidRootKind(_)
            | Error::KindMismatch { .. }
            | Error::OutOfBounds { .. }
            | Error::InvalidUtf8 { .. }
            | Error::MaxDepthExceeded { .. } => ErrorCategory::Format,
            Error::KeyNotFound(_)
            | Error::IndexOutOfBounds { .. }
            | Error::PoolIndexOutOfBounds { .. } => ErrorCategory::Lookup,
            Error::UnexpectedType { .. } => ErrorCategory::TypeMismatch,
            Error::TooManyEntries { .. }
            | Error::DocumentTooLarge { .. }
            | Error::UnsupportedNode(_)
            | Error::Io(_) => ErrorCategory::Encode,
            Error::KeyMismatch { .. } | Error::PopRoot => ErrorCategory::Build,
            Error::JsonParse(_) | Error::JsonSerialize(_) | Error::NonFiniteFloat(_) => {
                ErrorCategory::Json
            }
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::DocumentTooSmall { len } => {
                write!(f, "document too small for header ({len} bytes)")
            }
            Error::InvalidMagic(m) => write!(f, "invalid magic {m:02x?}: expected YB"),
            Error::BigEndianUnsupported => write!(f, "big-endian documents are not supported"),
            Error::UnknownKind { byte, offset } => {
                write!(f, "unknown node kind {byte:#04x} at {offset:#x}")
            }
            Error::InvalidRootKind(k) => {
                write!(f, "root node must be an array or hash, found {k:#04x}")
            }
            Error::KindMismatch {
                expected,
                found,
                offset,
            } => write!(f, "expected {expected} tag at {offset:#x}, found {found:#04x}"),
            Error::OutOfBounds { offset, len } => {
                write!(f, "offset {offset:#x} out of bounds (len={len})")
            }
            Error::InvalidUtf8 { offset } => write!(f, "invalid UTF-8 in string at {offset:#x}"),
            Error::MaxDepthExceeded { offset } => {
                write!(f, "max nesting depth exceeded at {offset:#x}")
            }
            Error::KeyNotFound(key) => write!(f, "key not found: {key:?}"),
            Error::IndexOutOfBounds { index, length } => {
                write!(f, "index {index} out of bounds (length={length})")
            }
            Error::PoolIndexOutOfBounds { index, length } => {
                write!(f, "pool index {index} out of bounds (length={length})")
            }
            Error::UnexpectedType { expected, found } => {
                write!(f, "expected {expected}, found {found}")
            }
            Error::TooManyEntries { count } => {
                write!(f, "{count} entries exceed the 24-bit count limit")
            }
            Error::DocumentTooLarge { size } => {
                write!(f, "encoded document of {size} bytes exceeds 32-bit offsets")
            }
            Error::UnsupportedNode(kind) => write!(f, "{kind} node cannot be encoded in a tree"),
            Error::Io(msg) => write!(f, "write error: {msg}"),
            Error::KeyMismatch { in_hash: true } => write!(f, "hash entries require a key"),
            Error::KeyMismatch { in_hash: false } => write!(f, "array entries take no key"),
            Error::PopRoot => write!(f, "cannot pop the root container"),
            Error::JsonParse(msg) => write!(f, "JSON parse error: {msg}"),
            Error::JsonSerialize(msg) => write!(f, "JSON serialize error: {msg}"),
            Error::NonFiniteFloat(n) => write!(f, "cannot encode non-finite float {n} as JSON"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

/// Result type alias for BYML operations.
pub type Result<T> = std::result::Result<T, Error>;
