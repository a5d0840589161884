//! Document header.

use crate::error::{Error, Result};
use crate::io::{Reader, Writer};

/// Magic bytes of a little-endian document.
pub const MAGIC: &[u8; 2] = b"YB";

/// Magic bytes of the big-endian variant, which is rejected.
pub const MAGIC_BIG_ENDIAN: &[u8; 2] = b"BY";

/// Size of the fixed header.
pub const HEADER_SIZE: usize = 16;

/// Version written for documents that do not carry one.
pub const DEFAULT_VERSION: u16 = 1;

/// Fixed 16-byte document header.
///
/// Offsets of 0 mean the referenced section is absent. When a legacy path
/// array is present, `root_or_path_offset` points at it and the true root
/// offset follows the header as an extra u32 (see [`crate::decode`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub version: u16,
    pub hash_key_pool_offset: u32,
    pub string_pool_offset: u32,
    pub root_or_path_offset: u32,
}

impl Header {
    /// Parse the header at the start of `data`.
    ///
    /// # Errors
    ///
    /// Returns `Error::DocumentTooSmall` if `data` is shorter than the header,
    /// `Error::BigEndianUnsupported` for `BY` documents and
    /// `Error::InvalidMagic` for anything else that is not `YB`.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(Error::DocumentTooSmall { len: data.len() });
        }
        let magic = [data[0], data[1]];
        if &magic == MAGIC_BIG_ENDIAN {
            return Err(Error::BigEndianUnsupported);
        }
        if &magic != MAGIC {
            return Err(Error::InvalidMagic(magic));
        }

        let mut r = Reader::new(data);
        r.seek(2);
        Ok(Self {
            version: r.u16()?,
            hash_key_pool_offset: r.u32()?,
            string_pool_offset: r.u32()?,
            root_or_path_offset: r.u32()?,
        })
    }

    /// Write the 16 header bytes.
    pub(crate) fn write(&self, w: &mut Writer) -> Result<()> {
        w.bytes(MAGIC)?;
        w.u16(self.version)?;
        w.u32(self.hash_key_pool_offset)?;
        w.u32(self.string_pool_offset)?;
        w.u32(self.root_or_path_offset)
    }
}
