//! Document decoding.
//!
//! Decoding is a single pass over an in-memory buffer. Every node reached
//! through an offset (arrays, hashes, path arrays, string pools) is memoized
//! by its absolute position, so two slots pointing at the same offset share
//! one [`NodeRef`] and the node is only decoded once.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, trace};

use crate::document::Document;
use crate::error::{Error, Result};
use crate::header::{HEADER_SIZE, Header};
use crate::io::Reader;
use crate::kind::NodeKind;
use crate::node::{Array, Hash, Node, NodeRef};
use crate::path::PathArray;
use crate::pool::StringPool;

/// Deepest container nesting accepted from input.
pub const MAX_DEPTH: usize = 256;

/// Decode a document.
///
/// # Errors
///
/// Returns a format error if the magic is wrong (including big-endian
/// documents), the root is not an array or hash, a kind byte is unknown, or
/// an offset points outside the buffer. Returns a lookup error if a string
/// or key index is outside its pool.
pub fn decode(bytes: &[u8]) -> Result<Document> {
    let header = Header::parse(bytes)?;
    debug!(
        "header: version={} keys@{:#x} strings@{:#x} root/path@{:#x} len={}",
        header.version,
        header.hash_key_pool_offset,
        header.string_pool_offset,
        header.root_or_path_offset,
        bytes.len()
    );

    let mut decoder = Decoder::new(bytes);
    decoder.keys = decoder.read_pool(header.hash_key_pool_offset)?;
    decoder.strings = decoder.read_pool(header.string_pool_offset)?;

    let (root_offset, path_offset) = locate_root(&decoder.reader, &header);
    let path_array = match path_offset {
        Some(offset) => Some(decoder.reader.peek_at(offset, PathArray::read)?),
        None => None,
    };
    let root = decoder.read_root(root_offset)?;
    debug!("decoded {} distinct referenced nodes", decoder.memo.len());

    Ok(Document::from_decoded(
        header.version,
        root,
        path_array,
        decoder.keys,
        decoder.strings,
    ))
}

/// Resolve the root offset and the legacy path array offset, if any.
///
/// Some producers write the path array offset into the root slot of the
/// header and the true root offset into the u32 right after the header. The
/// layout is guessed: if that u32 points at an array or hash tag, and the
/// header's root slot points at a path array tag (or a 0 byte, which some
/// producers write instead), the roles are swapped. Anything else is read as
/// a plain header.
fn locate_root(r: &Reader<'_>, header: &Header) -> (usize, Option<usize>) {
    let declared = header.root_or_path_offset as usize;
    let Some(candidate) = r.u32_at(HEADER_SIZE).map(|v| v as usize) else {
        return (declared, None);
    };

    let shifted_root_likely = candidate > 0
        && candidate < r.len()
        && r.byte_at(candidate)
            .and_then(NodeKind::from_byte)
            .is_some_and(NodeKind::is_valid_root);
    if !shifted_root_likely {
        return (declared, None);
    }

    match r.byte_at(declared) {
        Some(tag) if tag == NodeKind::PathArray.byte() || tag == 0 => {
            debug!("path array at {declared:#x}, root at {candidate:#x}");
            (candidate, Some(declared))
        }
        _ => {
            trace!("root candidate {candidate:#x} rejected: no path array at {declared:#x}");
            (declared, None)
        }
    }
}

struct Memo {
    node: NodeRef,
    len: usize,
}

struct Decoder<'a> {
    reader: Reader<'a>,
    keys: Option<StringPool>,
    strings: Option<StringPool>,
    memo: HashMap<usize, Memo>,
    depth: usize,
}

impl<'a> Decoder<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            reader: Reader::new(data),
            keys: None,
            strings: None,
            memo: HashMap::new(),
            depth: 0,
        }
    }

    fn read_pool(&mut self, offset: u32) -> Result<Option<StringPool>> {
        if offset == 0 {
            return Ok(None);
        }
        let pool = self.reader.peek_at(offset as usize, StringPool::read)?;
        debug!("pool at {offset:#x}: {} entries", pool.len());
        Ok(Some(pool))
    }

    fn read_root(&mut self, offset: usize) -> Result<NodeRef> {
        let tag = self.reader.byte_at(offset).ok_or(Error::OutOfBounds {
            offset,
            len: self.reader.len(),
        })?;
        match NodeKind::from_byte(tag) {
            Some(kind) if kind.is_valid_root() => self.read_reference(kind, offset),
            _ => Err(Error::InvalidRootKind(tag)),
        }
    }

    /// Decode the tagged node at `offset`, reusing an earlier decode of the
    /// same offset. The cursor is left where it was.
    fn read_reference(&mut self, kind: NodeKind, offset: usize) -> Result<NodeRef> {
        if let Some(memo) = self.memo.get(&offset) {
            trace!(
                "memo hit: {} at {offset:#x} ({} bytes)",
                memo.node.kind().name(),
                memo.len
            );
            let found = memo.node.kind();
            if found != kind {
                return Err(Error::KindMismatch {
                    expected: kind.name(),
                    found: found.byte(),
                    offset,
                });
            }
            return Ok(Arc::clone(&memo.node));
        }
        if self.depth >= MAX_DEPTH {
            return Err(Error::MaxDepthExceeded { offset });
        }

        let saved = self.reader.pos();
        self.reader.seek(offset);
        self.depth += 1;
        let result = self.read_body(kind, offset);
        self.depth -= 1;
        let len = self.reader.pos().saturating_sub(offset);
        self.reader.seek(saved);

        let node = Arc::new(result?);
        self.memo.insert(
            offset,
            Memo {
                node: Arc::clone(&node),
                len,
            },
        );
        Ok(node)
    }

    fn read_body(&mut self, kind: NodeKind, offset: usize) -> Result<Node> {
        match kind {
            NodeKind::Array => {
                self.expect_tag(kind, offset)?;
                self.read_array_body()
            }
            NodeKind::Hash => {
                self.expect_tag(kind, offset)?;
                self.read_hash_body()
            }
            NodeKind::StringPool => StringPool::read(&mut self.reader).map(Node::StringPool),
            NodeKind::PathArray => PathArray::read(&mut self.reader).map(Node::PathArray),
            _ => Err(Error::KindMismatch {
                expected: "container",
                found: kind.byte(),
                offset,
            }),
        }
    }

    fn expect_tag(&mut self, kind: NodeKind, offset: usize) -> Result<()> {
        let tag = self.reader.u8()?;
        if tag != kind.byte() {
            return Err(Error::KindMismatch {
                expected: kind.name(),
                found: tag,
                offset,
            });
        }
        Ok(())
    }

    /// `u24 count`, `count` kind bytes, padding to 4, `count` value slots.
    fn read_array_body(&mut self) -> Result<Node> {
        let count = self.reader.u24()? as usize;
        let kinds_start = self.reader.pos();
        let kind_bytes = self.reader.bytes(count)?;
        let kinds = kind_bytes
            .iter()
            .enumerate()
            .map(|(i, &b)| NodeKind::parse(b, kinds_start + i))
            .collect::<Result<Vec<_>>>()?;
        self.reader.align4();

        let mut items = Vec::with_capacity(count);
        for kind in kinds {
            items.push(self.read_value(kind)?);
        }
        Ok(Node::Array(Array::from_refs(items)))
    }

    /// `u24 count`, then `count` entries of `u24 key index`, `u8 kind`, value slot.
    ///
    /// Entries are kept in stored order; producers are trusted to sort them.
    fn read_hash_body(&mut self) -> Result<Node> {
        let count = self.reader.u24()? as usize;
        let mut entries = Vec::new();
        for _ in 0..count {
            let key_index = self.reader.u24()?;
            let kind_offset = self.reader.pos();
            let kind = NodeKind::parse(self.reader.u8()?, kind_offset)?;
            let key = pool_entry(self.keys.as_ref(), key_index)?.to_owned();
            let value = self.read_value(kind)?;
            entries.push((key, value));
        }
        Ok(Node::Hash(Hash::from_stored(entries)))
    }

    /// Decode one 4-byte value slot of the given kind at the cursor.
    fn read_value(&mut self, kind: NodeKind) -> Result<NodeRef> {
        let node = match kind {
            NodeKind::Null => {
                self.reader.u32()?;
                Node::Null
            }
            NodeKind::Bool => Node::Bool(self.reader.u32()? & 1 != 0),
            NodeKind::Int32 => Node::Int32(self.reader.i32()?),
            NodeKind::UInt32 => Node::UInt32(self.reader.u32()?),
            NodeKind::Float32 => Node::Float32(self.reader.f32()?),
            NodeKind::Int64 => Node::Int64(self.read_big_data()? as i64),
            NodeKind::UInt64 => Node::UInt64(self.read_big_data()?),
            NodeKind::Float64 => Node::Float64(f64::from_bits(self.read_big_data()?)),
            NodeKind::String => {
                let index = self.reader.u32()?;
                Node::String(pool_entry(self.strings.as_ref(), index)?.to_owned())
            }
            NodeKind::Binary => {
                let offset = self.reader.u32()? as usize;
                let data = self.reader.peek_at(offset, |r| {
                    let len = r.u32()? as usize;
                    Ok(r.bytes(len)?.to_vec())
                })?;
                Node::Binary(data)
            }
            NodeKind::Array | NodeKind::Hash | NodeKind::StringPool | NodeKind::PathArray => {
                let offset = self.reader.u32()? as usize;
                return self.read_reference(kind, offset);
            }
        };
        Ok(Arc::new(node))
    }

    fn read_big_data(&mut self) -> Result<u64> {
        let offset = self.reader.u32()? as usize;
        self.reader.peek_at(offset, Reader::u64)
    }
}

fn pool_entry(pool: Option<&StringPool>, index: u32) -> Result<&str> {
    match pool {
        Some(pool) => pool.get(index),
        None => Err(Error::PoolIndexOutOfBounds { index, length: 0 }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `{"a": 5i32, "b": "hi"}`
    fn small_hash_doc() -> Vec<u8> {
        vec![
            // header
            b'Y', b'B', 0x01, 0x00, // magic, version 1
            0x10, 0x00, 0x00, 0x00, // hash key pool @ 0x10
            0x24, 0x00, 0x00, 0x00, // string pool @ 0x24
            0x34, 0x00, 0x00, 0x00, // root @ 0x34
            // hash key pool @ 0x10
            0xC2, 0x02, 0x00, 0x00, // kind, count = 2
            0x10, 0x00, 0x00, 0x00, // "a" @ +16
            0x12, 0x00, 0x00, 0x00, // "b" @ +18
            0x14, 0x00, 0x00, 0x00, // end @ +20
            b'a', 0x00, b'b', 0x00, //
            // string pool @ 0x24
            0xC2, 0x01, 0x00, 0x00, // kind, count = 1
            0x0C, 0x00, 0x00, 0x00, // "hi" @ +12
            0x0F, 0x00, 0x00, 0x00, // end @ +15
            b'h', b'i', 0x00, 0x00, // "hi", padding
            // root hash @ 0x34
            0xC1, 0x02, 0x00, 0x00, // kind, count = 2
            0x00, 0x00, 0x00, 0xD1, // key 0 ("a"), int32
            0x05, 0x00, 0x00, 0x00, // 5
            0x01, 0x00, 0x00, 0xA0, // key 1 ("b"), string
            0x00, 0x00, 0x00, 0x00, // string index 0
        ]
    }

    /// `[{}, {}]` where both elements point at the same hash.
    fn shared_hash_doc() -> Vec<u8> {
        vec![
            // header
            b'Y', b'B', 0x01, 0x00, //
            0x00, 0x00, 0x00, 0x00, // no hash key pool
            0x00, 0x00, 0x00, 0x00, // no string pool
            0x10, 0x00, 0x00, 0x00, // root @ 0x10
            // root array @ 0x10
            0xC0, 0x02, 0x00, 0x00, // kind, count = 2
            0xC1, 0xC1, 0x00, 0x00, // kinds, padding
            0x20, 0x00, 0x00, 0x00, // hash @ 0x20
            0x20, 0x00, 0x00, 0x00, // hash @ 0x20 again
            // hash @ 0x20
            0xC1, 0x00, 0x00, 0x00, // kind, count = 0
        ]
    }

    #[test]
    fn decode_small_hash() {
        let doc = decode(&small_hash_doc()).unwrap();
        assert_eq!(doc.version(), 1);
        assert_eq!(doc.key("a").unwrap().as_i32(), Ok(5));
        assert_eq!(doc.key("b").unwrap().as_str(), Ok("hi"));
        assert!(doc.path_array().is_none());
        assert_eq!(doc.hash_key_pool().unwrap().len(), 2);
        assert_eq!(doc.string_pool().unwrap().get(0), Ok("hi"));
    }

    #[test]
    fn decode_memoizes_shared_offsets() {
        let doc = decode(&shared_hash_doc()).unwrap();
        let first = doc.index(0).unwrap();
        let second = doc.index(1).unwrap();
        assert!(Arc::ptr_eq(first, second));
        assert!(first.as_hash().unwrap().is_empty());
    }

    #[test]
    fn decode_rejects_shared_offset_with_other_kind() {
        // second slot claims an array at the hash's offset
        let mut data = shared_hash_doc();
        data[0x15] = 0xC0;
        let expected = Error::KindMismatch {
            expected: "array",
            found: 0xC1,
            offset: 0x20,
        };
        assert_eq!(decode(&data).unwrap_err(), expected);

        // same bytes with the slot kinds swapped
        let mut data = shared_hash_doc();
        data[0x14] = 0xC0;
        assert_eq!(decode(&data).unwrap_err(), expected);
    }

    #[test]
    fn decode_rejects_unknown_kind() {
        let mut data = small_hash_doc();
        data[0x3B] = 0xD9;
        assert_eq!(
            decode(&data).unwrap_err(),
            Error::UnknownKind {
                byte: 0xD9,
                offset: 0x3B
            }
        );
    }

    #[test]
    fn decode_rejects_non_container_root() {
        let mut data = small_hash_doc();
        data[12] = 0x10; // root -> hash key pool
        assert_eq!(decode(&data).unwrap_err(), Error::InvalidRootKind(0xC2));
    }

    #[test]
    fn decode_rejects_root_out_of_bounds() {
        let mut data = small_hash_doc();
        data[12..16].copy_from_slice(&0x1000u32.to_le_bytes());
        assert_eq!(
            decode(&data).unwrap_err(),
            Error::OutOfBounds {
                offset: 0x1000,
                len: data.len()
            }
        );
    }

    #[test]
    fn decode_rejects_truncated_document() {
        let data = small_hash_doc();
        let err = decode(&data[..data.len() - 4]).unwrap_err();
        assert!(matches!(err, Error::OutOfBounds { .. }), "{err:?}");
    }

    #[test]
    fn decode_rejects_big_endian() {
        let mut data = small_hash_doc();
        data.swap(0, 1);
        assert_eq!(decode(&data).unwrap_err(), Error::BigEndianUnsupported);
    }

    #[test]
    fn decode_rejects_string_without_pool() {
        let mut data = small_hash_doc();
        data[8..12].copy_from_slice(&[0, 0, 0, 0]); // drop string pool
        assert_eq!(
            decode(&data).unwrap_err(),
            Error::PoolIndexOutOfBounds {
                index: 0,
                length: 0
            }
        );
    }

    #[test]
    fn decode_rejects_self_reference() {
        let mut data = shared_hash_doc();
        // element 0 becomes an array pointing back at the root
        data[0x14] = 0xC0;
        data[0x18..0x1C].copy_from_slice(&0x10u32.to_le_bytes());
        assert_eq!(
            decode(&data).unwrap_err(),
            Error::MaxDepthExceeded { offset: 0x10 }
        );
    }

    #[test]
    fn locate_root_without_path_array() {
        let data = small_hash_doc();
        let header = Header::parse(&data).unwrap();
        assert_eq!(locate_root(&Reader::new(&data), &header), (0x34, None));
    }

    #[test]
    fn locate_root_rejects_false_positive() {
        // u32 after the header points at a hash, but the declared root slot
        // does not point at a path array.
        let mut data = shared_hash_doc();
        data[16..20].copy_from_slice(&0x20u32.to_le_bytes());
        let header = Header::parse(&data).unwrap();
        assert_eq!(locate_root(&Reader::new(&data), &header), (0x10, None));
    }
}
