//! Primitive cursor reads and writes.
//!
//! All multi-byte values are little-endian. Reads are bounds-checked against
//! the document and return `Error::OutOfBounds` rather than panicking.

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};

use crate::error::{Error, Result};

/// Largest count representable in a 3-byte field.
pub const MAX_U24: u32 = 0x00FF_FFFF;

/// Round `value` up to the next multiple of `align` (a power of two).
#[inline]
#[must_use]
pub const fn align_up(value: usize, align: usize) -> usize {
    (value + align - 1) & !(align - 1)
}

/// Read cursor over a complete document buffer.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    #[inline]
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current absolute position.
    #[inline]
    #[must_use]
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Total document length.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Move the cursor to an absolute position.
    ///
    /// Seeking past the end is allowed; the next read reports the error.
    #[inline]
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos;
    }

    /// Advance the cursor to the next 4-byte boundary.
    #[inline]
    pub fn align4(&mut self) {
        self.pos = align_up(self.pos, 4);
    }

    /// Run `f` with the cursor at `offset`, then restore the current position.
    ///
    /// The position is restored even when `f` fails.
    pub fn peek_at<T>(&mut self, offset: usize, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let saved = self.pos;
        self.pos = offset;
        let result = f(self);
        self.pos = saved;
        result
    }

    /// Byte at an absolute offset, without moving the cursor.
    #[inline]
    #[must_use]
    pub fn byte_at(&self, offset: usize) -> Option<u8> {
        self.data.get(offset).copied()
    }

    /// u32 at an absolute offset, without moving the cursor.
    #[must_use]
    pub fn u32_at(&self, offset: usize) -> Option<u32> {
        let bytes = self.data.get(offset..offset.checked_add(4)?)?;
        Some(LittleEndian::read_u32(bytes))
    }

    /// Take the next `n` bytes and advance past them.
    ///
    /// # Errors
    ///
    /// Returns `Error::OutOfBounds` if fewer than `n` bytes remain.
    pub fn bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        let out_of_bounds = Error::OutOfBounds {
            offset: self.pos,
            len: self.data.len(),
        };
        let end = self.pos.checked_add(n).ok_or(out_of_bounds.clone())?;
        let bytes = self.data.get(self.pos..end).ok_or(out_of_bounds)?;
        self.pos = end;
        Ok(bytes)
    }

    pub fn u8(&mut self) -> Result<u8> {
        Ok(self.bytes(1)?[0])
    }

    pub fn u16(&mut self) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.bytes(2)?))
    }

    /// Read a 3-byte unsigned integer into a u32 with the high byte zeroed.
    pub fn u24(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u24(self.bytes(3)?))
    }

    pub fn u32(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.bytes(4)?))
    }

    pub fn i32(&mut self) -> Result<i32> {
        Ok(LittleEndian::read_i32(self.bytes(4)?))
    }

    pub fn f32(&mut self) -> Result<f32> {
        Ok(LittleEndian::read_f32(self.bytes(4)?))
    }

    pub fn u64(&mut self) -> Result<u64> {
        Ok(LittleEndian::read_u64(self.bytes(8)?))
    }

    /// Read a null-terminated UTF-8 string from a span of at most `max_len` bytes.
    ///
    /// The whole span must lie inside the document. The string ends at the
    /// first NUL in the span, or at the end of the span if there is none. The
    /// cursor advances past the terminator when one is found.
    ///
    /// # Errors
    ///
    /// Returns `Error::OutOfBounds` if the span is outside the document, or
    /// `Error::InvalidUtf8` if the bytes are not valid UTF-8.
    pub fn cstr(&mut self, max_len: usize) -> Result<String> {
        let start = self.pos;
        let span = self.bytes(max_len)?;
        let (text, consumed) = match span.iter().position(|&b| b == 0) {
            Some(nul) => (&span[..nul], nul + 1),
            None => (span, span.len()),
        };
        self.pos = start + consumed;
        std::str::from_utf8(text)
            .map(str::to_owned)
            .map_err(|_| Error::InvalidUtf8 { offset: start })
    }
}

/// Append-only output buffer.
#[derive(Debug, Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Current absolute position (bytes written so far).
    #[inline]
    #[must_use]
    pub fn pos(&self) -> usize {
        self.buf.len()
    }

    pub fn u8(&mut self, v: u8) -> Result<()> {
        self.buf.write_u8(v)?;
        Ok(())
    }

    pub fn u16(&mut self, v: u16) -> Result<()> {
        self.buf.write_u16::<LittleEndian>(v)?;
        Ok(())
    }

    /// Write the low three bytes of `v`. Callers check `v <= MAX_U24` first.
    pub fn u24(&mut self, v: u32) -> Result<()> {
        debug_assert!(v <= MAX_U24);
        self.buf.write_u24::<LittleEndian>(v)?;
        Ok(())
    }

    pub fn u32(&mut self, v: u32) -> Result<()> {
        self.buf.write_u32::<LittleEndian>(v)?;
        Ok(())
    }

    pub fn f32(&mut self, v: f32) -> Result<()> {
        self.buf.write_f32::<LittleEndian>(v)?;
        Ok(())
    }

    pub fn u64(&mut self, v: u64) -> Result<()> {
        self.buf.write_u64::<LittleEndian>(v)?;
        Ok(())
    }

    pub fn bytes(&mut self, data: &[u8]) -> Result<()> {
        self.buf.extend_from_slice(data);
        Ok(())
    }

    /// Zero-pad up to the next 4-byte boundary.
    pub fn align4(&mut self) -> Result<()> {
        let target = align_up(self.buf.len(), 4);
        self.buf.resize(target, 0);
        Ok(())
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}
