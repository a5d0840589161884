//! Encode/decode round trips over built documents.

use byml::{
    Array, Builder, Document, EncodeOptions, Error, ErrorCategory, Hash, Node, NodeKind, NodeRef,
    PathArray, PathPoint, encode_with,
};

fn u32_at(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
}

fn roundtrip(doc: &Document) -> Document {
    let bytes = doc.to_bytes().unwrap();
    Document::from_bytes(&bytes).unwrap()
}

fn point(i: u32) -> PathPoint {
    let f = i as f32;
    PathPoint {
        position: [f, f + 0.5, -f],
        normal: [0.0, 1.0, 0.0],
        unused: i,
    }
}

#[test]
fn test_roundtrip_all_kinds() {
    let mut b = Builder::hash();
    b.add_null("null").unwrap();
    b.add_bool("bool", true).unwrap();
    b.add_i32("i32", -42).unwrap();
    b.add_u32("u32", u32::MAX).unwrap();
    b.add_f32("f32", 3.5).unwrap();
    b.add_i64("i64", i64::MAX).unwrap();
    b.add_u64("u64", u64::MAX).unwrap();
    b.add_f64("f64", -1.0e300).unwrap();
    b.add_str("str", "hello").unwrap();
    b.add_binary("bin", &[0xDE, 0xAD, 0xBE, 0xEF, 0x01]).unwrap();
    b.add_path_array("path", PathArray::new(vec![vec![point(1)]]))
        .unwrap();
    b.push_array("list").unwrap();
    b.add_str(None, "hello").unwrap();
    b.push_hash(None).unwrap();
    b.add_str("inner", "world").unwrap();
    b.push_array("empty").unwrap();
    let doc = b.finish().unwrap();

    let decoded = roundtrip(&doc);
    assert_eq!(decoded.root(), doc.root());
    assert_eq!(decoded.version(), doc.version());

    let kinds: Vec<_> = decoded
        .root()
        .as_hash()
        .unwrap()
        .values()
        .map(|v| v.kind())
        .collect();
    for kind in [
        NodeKind::Null,
        NodeKind::Bool,
        NodeKind::Int32,
        NodeKind::UInt32,
        NodeKind::Float32,
        NodeKind::Int64,
        NodeKind::UInt64,
        NodeKind::Float64,
        NodeKind::String,
        NodeKind::Binary,
        NodeKind::PathArray,
        NodeKind::Array,
    ] {
        assert!(kinds.contains(&kind), "missing {kind:?}");
    }
}

#[test]
fn test_duplicate_strings_pooled_once() {
    let arr: Array = ["same", "same", "other", "same"].into_iter().collect();
    let mut root = Hash::new();
    root.insert("a", arr);
    root.insert("b", "same");

    let decoded = roundtrip(&Document::new(Node::Hash(root)).unwrap());
    let pool = decoded.string_pool().unwrap();
    assert_eq!(pool.iter().collect::<Vec<_>>(), ["other", "same"]);
    assert_eq!(pool.position("same"), Some(1));
}

#[test]
fn test_keys_sorted() {
    let mut b = Builder::hash();
    for (i, key) in ["zebra", "apple", "mango"].into_iter().enumerate() {
        b.add_i32(key, i as i32).unwrap();
    }
    let doc = b.finish().unwrap();
    let decoded = roundtrip(&doc);

    let hash = decoded.root().as_hash().unwrap();
    assert_eq!(hash.keys().collect::<Vec<_>>(), ["apple", "mango", "zebra"]);
    assert!(hash.is_sorted());
    assert_eq!(hash.entry("apple").unwrap().as_i32(), Ok(1));
    assert_eq!(
        decoded.hash_key_pool().unwrap().iter().collect::<Vec<_>>(),
        ["apple", "mango", "zebra"]
    );
}

#[test]
fn test_byte_swapped_magic_rejected() {
    let doc = Builder::array().finish().unwrap();
    let mut bytes = doc.to_bytes().unwrap();
    bytes.swap(0, 1);

    let err = Document::from_bytes(&bytes).unwrap_err();
    assert_eq!(err, Error::BigEndianUnsupported);
    assert_eq!(err.category(), ErrorCategory::Format);
}

#[test]
fn test_int64_never_inline() {
    let values: Vec<i64> = std::iter::once(i64::MIN)
        .chain((1..1000).map(|i| (i - 500) * 1_000_000_007))
        .collect();
    let doc = Document::new(Node::Array(values.iter().copied().collect())).unwrap();
    let bytes = doc.to_bytes().unwrap();

    // every slot is an offset to the 8-byte value
    let root = u32_at(&bytes, 12) as usize;
    assert_eq!(bytes[root], 0xC0);
    let slots = (root + 4 + values.len()).next_multiple_of(4);
    for (i, &value) in values.iter().enumerate() {
        assert_eq!(bytes[root + 4 + i], 0xD4);
        let offset = u32_at(&bytes, slots + 4 * i) as usize;
        assert_eq!(bytes[offset..offset + 8], value.to_le_bytes());
    }

    let decoded = Document::from_bytes(&bytes).unwrap();
    let arr = decoded.root().as_array().unwrap();
    assert_eq!(arr.len(), 1000);
    for (node, &value) in arr.iter().zip(&values) {
        assert_eq!(node.as_i64(), Ok(value));
    }
}

#[test]
fn test_document_path_array() {
    let paths = PathArray::new(vec![
        vec![point(1), point(2)],
        vec![point(3), point(4), point(5)],
    ]);
    let mut b = Builder::hash().with_path_array(paths.clone());
    b.add_str("Name", "Rail").unwrap();
    let doc = b.finish().unwrap();
    let bytes = doc.to_bytes().unwrap();

    let path_offset = u32_at(&bytes, 12) as usize;
    let root_offset = u32_at(&bytes, 16) as usize;
    assert_eq!(bytes[path_offset], 0xC3);
    assert_eq!(bytes[root_offset], 0xC1);

    let decoded = Document::from_bytes(&bytes).unwrap();
    assert_eq!(decoded.path_array(), Some(&paths));
    assert_eq!(decoded.path_array().unwrap().get(1).unwrap().len(), 3);
    assert_eq!(decoded.key("Name").unwrap().as_str(), Ok("Rail"));
    assert_eq!(decoded.to_bytes().unwrap(), bytes);
}

#[test]
fn test_document_path_array_zero_tag() {
    let paths = PathArray::new(vec![vec![point(7), point(8)]]);
    let doc = Builder::array().with_path_array(paths.clone()).finish().unwrap();
    let mut bytes = doc.to_bytes().unwrap();

    let path_offset = u32_at(&bytes, 12) as usize;
    bytes[path_offset] = 0;

    let decoded = Document::from_bytes(&bytes).unwrap();
    assert_eq!(decoded.path_array(), Some(&paths));
    assert!(decoded.root().as_array().unwrap().is_empty());
}

#[test]
fn test_hash_lookup() {
    let mut b = Builder::hash();
    for i in (0..50).rev() {
        b.add_i32(format!("key{i:03}").as_str(), i).unwrap();
    }
    let decoded = roundtrip(&b.finish().unwrap());
    let hash = decoded.root().as_hash().unwrap();

    for i in 0..50 {
        let key = format!("key{i:03}");
        assert_eq!(hash.get(&key).map(|v| v.as_i32()), Some(Ok(i)), "{key}");
    }
    for key in ["", "key050", "key", "zzz", "KEY000"] {
        assert!(hash.get(key).is_none(), "{key}");
        assert!(!hash.contains_key(key));
    }
    assert_eq!(hash.entry("zzz"), Err(Error::KeyNotFound("zzz".into())));
}

#[test]
fn test_array_slots_aligned() {
    let mut b = Builder::array();
    for n in 0..9u32 {
        b.push_array(None).unwrap();
        for i in 0..n {
            b.add_u32(None, i).unwrap();
        }
        b.pop().unwrap();
    }
    let bytes = b.finish().unwrap().to_bytes().unwrap();

    let root = u32_at(&bytes, 12) as usize;
    let root_slots = (root + 4 + 9).next_multiple_of(4);
    for n in 0..9usize {
        let offset = u32_at(&bytes, root_slots + 4 * n) as usize;
        assert_eq!(offset % 4, 0);
        assert_eq!(bytes[offset], 0xC0);
        assert_eq!(u32_at(&bytes, offset) >> 8, n as u32);

        let kinds_end = offset + 4 + n;
        let slots = kinds_end.next_multiple_of(4);
        assert!(bytes[kinds_end..slots].iter().all(|&b| b == 0));
        for i in 0..n {
            assert_eq!(u32_at(&bytes, slots + 4 * i), i as u32);
        }
    }
}

#[test]
fn test_shared_containers() {
    let shared = Node::Hash(Hash::new()).into_ref();
    let mut b = Builder::array();
    b.add_ref(None, shared.clone()).unwrap();
    b.add_ref(None, shared.clone()).unwrap();
    let doc = b.finish().unwrap();

    let shared_bytes = doc.to_bytes().unwrap();
    let decoded = Document::from_bytes(&shared_bytes).unwrap();
    assert!(NodeRef::ptr_eq(
        decoded.index(0).unwrap(),
        decoded.index(1).unwrap()
    ));

    let options = EncodeOptions {
        share_containers: false,
        ..EncodeOptions::from_document(&doc)
    };
    let copied_bytes = encode_with(&doc, &options).unwrap();
    assert_eq!(copied_bytes.len(), shared_bytes.len() + 4);

    let decoded = Document::from_bytes(&copied_bytes).unwrap();
    assert!(!NodeRef::ptr_eq(
        decoded.index(0).unwrap(),
        decoded.index(1).unwrap()
    ));
    assert_eq!(decoded.index(0).unwrap(), decoded.index(1).unwrap());
}

#[test]
fn test_edit_decoded_document() {
    let mut b = Builder::hash();
    b.add_i32("keep", 1).unwrap();
    b.add_i32("drop", 2).unwrap();
    let mut doc = roundtrip(&b.finish().unwrap());

    let hash = doc.root_mut().as_hash_mut().unwrap();
    hash.remove("drop");
    hash.insert("added", "new");

    let decoded = roundtrip(&doc);
    let hash = decoded.root().as_hash().unwrap();
    assert_eq!(hash.keys().collect::<Vec<_>>(), ["added", "keep"]);
    assert_eq!(decoded.key("added").unwrap().as_str(), Ok("new"));
    assert_eq!(
        decoded.hash_key_pool().unwrap().iter().collect::<Vec<_>>(),
        ["added", "keep"]
    );
}

#[test]
fn test_document_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Document>();
    assert_send_sync::<NodeRef>();
}

#[test]
fn test_in_tree_string_pool_decodes_but_does_not_encode() {
    let bytes = [
        b'Y', b'B', 0x01, 0x00, //
        0x00, 0x00, 0x00, 0x00, // no hash key pool
        0x00, 0x00, 0x00, 0x00, // no string pool
        0x10, 0x00, 0x00, 0x00, // root @ 0x10
        0xC0, 0x01, 0x00, 0x00, // root array: count = 1
        0xC2, 0x00, 0x00, 0x00, // string pool, padding
        0x1C, 0x00, 0x00, 0x00, // -> 0x1C
        0xC2, 0x01, 0x00, 0x00, // string pool: count = 1
        0x0C, 0x00, 0x00, 0x00, //
        0x0E, 0x00, 0x00, 0x00, //
        b'x', 0x00, 0x00, 0x00, //
    ];
    let doc = Document::from_bytes(&bytes).unwrap();
    let pool = doc.index(0).unwrap().as_string_pool().unwrap();
    assert_eq!(pool.iter().collect::<Vec<_>>(), ["x"]);
    assert_eq!(byml::to_json(&doc).unwrap(), r#"[["x"]]"#);

    let err = doc.to_bytes().unwrap_err();
    assert_eq!(err, Error::UnsupportedNode("string pool"));
    assert_eq!(err.category(), ErrorCategory::Encode);
}
