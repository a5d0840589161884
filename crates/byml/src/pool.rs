//! String pools.
//!
//! Both the general string pool and the hash key pool share one layout:
//!
//! ```text
//! u8   kind (0xC2)
//! u24  count
//! u32  offsets[count + 1]   relative to the pool start
//! ...  null-terminated UTF-8 strings, padded to 4 bytes
//! ```
//!
//! Entry `i` occupies `[offsets[i], offsets[i + 1])`, terminator included.

use indexmap::IndexSet;

use crate::error::{Error, Result};
use crate::io::{MAX_U24, Reader, Writer, align_up};
use crate::kind::NodeKind;

/// Deduplicated table of strings addressed by index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringPool {
    strings: Vec<String>,
}

impl StringPool {
    #[must_use]
    pub fn new(strings: Vec<String>) -> Self {
        Self { strings }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Get the string at `index`.
    ///
    /// # Errors
    ///
    /// Returns `Error::PoolIndexOutOfBounds` if `index` is past the end.
    pub fn get(&self, index: u32) -> Result<&str> {
        self.strings
            .get(index as usize)
            .map(String::as_str)
            .ok_or(Error::PoolIndexOutOfBounds {
                index,
                length: self.strings.len(),
            })
    }

    /// Find the index of `s` by linear scan.
    #[must_use]
    pub fn position(&self, s: &str) -> Option<u32> {
        self.strings.iter().position(|e| e == s).map(|i| i as u32)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.strings.iter().map(String::as_str)
    }

    /// Read a pool whose kind byte is at the cursor.
    ///
    /// On return the cursor sits at the end of the last entry.
    pub(crate) fn read(r: &mut Reader<'_>) -> Result<Self> {
        let start = r.pos();
        let tag = r.u8()?;
        if tag != NodeKind::StringPool.byte() {
            return Err(Error::KindMismatch {
                expected: NodeKind::StringPool.name(),
                found: tag,
                offset: start,
            });
        }
        let count = r.u24()? as usize;
        let mut offsets = Vec::with_capacity(count + 1);
        for _ in 0..=count {
            offsets.push(r.u32()? as usize);
        }

        let mut strings = Vec::with_capacity(count);
        for pair in offsets.windows(2) {
            let (begin, end) = (pair[0], pair[1]);
            let len = end.checked_sub(begin).ok_or(Error::OutOfBounds {
                offset: start + end,
                len: r.len(),
            })?;
            r.seek(start + begin);
            strings.push(r.cstr(len)?);
        }
        r.seek(start + offsets[count]);

        Ok(Self { strings })
    }

    /// Encoded size in bytes, including trailing padding.
    #[must_use]
    pub(crate) fn encoded_len(&self) -> usize {
        let table = 4 + 4 * (self.strings.len() + 1);
        let data: usize = self.strings.iter().map(|s| s.len() + 1).sum();
        align_up(table + data, 4)
    }

    pub(crate) fn write(&self, w: &mut Writer) -> Result<()> {
        let count = self.strings.len();
        if count > MAX_U24 as usize {
            return Err(Error::TooManyEntries { count });
        }
        w.u8(NodeKind::StringPool.byte())?;
        w.u24(count as u32)?;

        let mut offset = 4 + 4 * (count + 1);
        for s in &self.strings {
            w.u32(offset as u32)?;
            offset += s.len() + 1;
        }
        w.u32(offset as u32)?;

        for s in &self.strings {
            w.bytes(s.as_bytes())?;
            w.u8(0)?;
        }
        w.align4()
    }
}

/// Write-side interner for one pool.
///
/// Handles returned by [`PoolBuilder::intern`] are insertion indices; they
/// are remapped to sorted positions by [`PoolBuilder::finish`].
#[derive(Debug, Default)]
pub(crate) struct PoolBuilder {
    set: IndexSet<String>,
}

impl PoolBuilder {
    /// Intern `s`, returning its handle. Equal strings share a handle.
    pub(crate) fn intern(&mut self, s: &str) -> u32 {
        if let Some(index) = self.set.get_index_of(s) {
            return index as u32;
        }
        self.set.insert_full(s.to_owned()).0 as u32
    }

    /// Sort the pool ordinally.
    ///
    /// Returns the sorted pool and a table mapping handles to sorted indices.
    pub(crate) fn finish(self) -> Result<(StringPool, Vec<u32>)> {
        let count = self.set.len();
        if count > MAX_U24 as usize {
            return Err(Error::TooManyEntries { count });
        }

        let mut order: Vec<usize> = (0..count).collect();
        order.sort_by(|&a, &b| self.set[a].cmp(&self.set[b]));

        let mut remap = vec![0u32; count];
        for (sorted, &handle) in order.iter().enumerate() {
            remap[handle] = sorted as u32;
        }

        let mut strings: Vec<Option<String>> = self.set.into_iter().map(Some).collect();
        let sorted = order
            .iter()
            .filter_map(|&handle| strings[handle].take())
            .collect();

        Ok((StringPool::new(sorted), remap))
    }
}
