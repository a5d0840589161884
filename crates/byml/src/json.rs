//! JSON view of BYML documents.
//!
//! The mapping is lossy: JSON has one number type, so numeric kinds are
//! inferred again on the way back.
//!
//! # Example
//!
//! ```
//! use byml::json::{from_json, to_json};
//!
//! let doc = from_json(r#"{"Name": "Obj", "Scale": [1.5, 2]}"#).unwrap();
//! assert_eq!(to_json(&doc).unwrap(), r#"{"Name":"Obj","Scale":[1.5,2]}"#);
//! ```
//!
//! # Mapping
//!
//! | BYML                       | JSON                                  |
//! |----------------------------|---------------------------------------|
//! | null                       | null                                  |
//! | bool                       | true/false                            |
//! | int32/uint32/int64/uint64  | integer                               |
//! | float32/float64            | number                                |
//! | string                     | string                                |
//! | binary                     | string with `b64:` prefix             |
//! | array                      | array                                 |
//! | hash                       | object (keys in sorted order)         |
//! | path array                 | array of arrays of point objects      |
//! | string pool                | array of strings                      |
//!
//! From JSON, integers become the narrowest of int32, int64 and uint64 that
//! holds them, and other numbers become float32 when the value survives the
//! round trip through `f32`, otherwise float64. Path arrays and string pools
//! are never produced from JSON.

use base64::Engine;
use serde_json::Value as JsonValue;

use crate::document::Document;
use crate::error::{Error, Result};
use crate::node::{Array, Hash, Node};
use crate::path::{PathArray, PathPoint};

const BINARY_PREFIX: &str = "b64:";

/// Parse a JSON string into a document.
///
/// # Errors
///
/// Returns `Error::JsonParse` if the JSON is invalid and
/// `Error::InvalidRootKind` if the top-level value is not an array or object.
pub fn from_json(json: &str) -> Result<Document> {
    let value: JsonValue =
        serde_json::from_str(json).map_err(|e| Error::JsonParse(e.to_string()))?;
    Document::new(json_to_node(&value))
}

/// Convert a document's root tree to a JSON string.
///
/// The document-level path array is not part of the output.
///
/// # Errors
///
/// Returns `Error::NonFiniteFloat` if a float is NaN or infinite and
/// `Error::JsonSerialize` if serialization fails.
pub fn to_json(doc: &Document) -> Result<String> {
    let value = node_to_json(doc.root())?;
    serde_json::to_string(&value).map_err(|e| Error::JsonSerialize(e.to_string()))
}

// --- from_json helpers ---

fn json_to_node(value: &JsonValue) -> Node {
    match value {
        JsonValue::Null => Node::Null,

        JsonValue::Bool(b) => Node::Bool(*b),

        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                i32::try_from(i).map_or(Node::Int64(i), Node::Int32)
            } else if let Some(u) = n.as_u64() {
                Node::UInt64(u)
            } else {
                let f = n.as_f64().unwrap_or(0.0);
                let narrow = f as f32;
                if f64::from(narrow) == f {
                    Node::Float32(narrow)
                } else {
                    Node::Float64(f)
                }
            }
        }

        JsonValue::String(s) => {
            if let Some(payload) = s.strip_prefix(BINARY_PREFIX)
                && let Ok(bytes) = base64::engine::general_purpose::STANDARD.decode(payload)
            {
                return Node::Binary(bytes);
            }
            Node::String(s.clone())
        }

        JsonValue::Array(items) => Node::Array(items.iter().map(json_to_node).collect::<Array>()),

        JsonValue::Object(obj) => {
            let mut hash = Hash::new();
            for (key, value) in obj {
                hash.insert(key.as_str(), json_to_node(value));
            }
            Node::Hash(hash)
        }
    }
}

// --- to_json helpers ---

/// Convert a single node (and its subtree) to a JSON value.
///
/// # Errors
///
/// Returns `Error::NonFiniteFloat` if a float is NaN or infinite.
pub fn node_to_json(node: &Node) -> Result<JsonValue> {
    match node {
        Node::Null => Ok(JsonValue::Null),

        Node::Bool(b) => Ok(JsonValue::Bool(*b)),

        Node::Int32(n) => Ok(JsonValue::from(*n)),
        Node::UInt32(n) => Ok(JsonValue::from(*n)),
        Node::Int64(n) => Ok(JsonValue::from(*n)),
        Node::UInt64(n) => Ok(JsonValue::from(*n)),

        Node::Float32(f) => float_to_json(f64::from(*f)),
        Node::Float64(f) => float_to_json(*f),

        Node::String(s) => Ok(JsonValue::String(s.clone())),

        Node::Binary(bytes) => {
            let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
            Ok(JsonValue::String(format!("{BINARY_PREFIX}{encoded}")))
        }

        Node::Array(array) => array
            .iter()
            .map(|child| node_to_json(child))
            .collect::<Result<Vec<_>>>()
            .map(JsonValue::Array),

        Node::Hash(hash) => {
            let mut obj = serde_json::Map::new();
            for (key, child) in hash.sorted_entries() {
                obj.insert(key.to_owned(), node_to_json(child)?);
            }
            Ok(JsonValue::Object(obj))
        }

        Node::StringPool(pool) => Ok(JsonValue::Array(
            pool.iter().map(|s| JsonValue::String(s.to_owned())).collect(),
        )),

        Node::PathArray(path_array) => path_array_to_json(path_array),
    }
}

fn float_to_json(f: f64) -> Result<JsonValue> {
    let num = serde_json::Number::from_f64(f).ok_or(Error::NonFiniteFloat(f))?;
    Ok(JsonValue::Number(num))
}

fn path_array_to_json(path_array: &PathArray) -> Result<JsonValue> {
    let mut paths = Vec::with_capacity(path_array.len());
    for points in path_array.iter() {
        let points = points
            .iter()
            .map(point_to_json)
            .collect::<Result<Vec<_>>>()?;
        paths.push(JsonValue::Array(points));
    }
    Ok(JsonValue::Array(paths))
}

fn point_to_json(point: &PathPoint) -> Result<JsonValue> {
    let vec3 = |v: &[f32; 3]| -> Result<JsonValue> {
        v.iter()
            .map(|&c| float_to_json(f64::from(c)))
            .collect::<Result<Vec<_>>>()
            .map(JsonValue::Array)
    };
    let mut obj = serde_json::Map::new();
    obj.insert("position".to_owned(), vec3(&point.position)?);
    obj.insert("normal".to_owned(), vec3(&point.normal)?);
    obj.insert("unused".to_owned(), JsonValue::from(point.unused));
    Ok(JsonValue::Object(obj))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_integer_widths() {
        let doc = from_json("[42, -100, 2147483648, -9223372036854775808, 18446744073709551615]")
            .unwrap();
        assert_eq!(**doc.index(0).unwrap(), Node::Int32(42));
        assert_eq!(**doc.index(1).unwrap(), Node::Int32(-100));
        assert_eq!(**doc.index(2).unwrap(), Node::Int64(2_147_483_648));
        assert_eq!(**doc.index(3).unwrap(), Node::Int64(i64::MIN));
        assert_eq!(**doc.index(4).unwrap(), Node::UInt64(u64::MAX));
    }

    #[test]
    fn test_from_json_float_widths() {
        let doc = from_json("[1.5, 0.1]").unwrap();
        assert_eq!(**doc.index(0).unwrap(), Node::Float32(1.5));
        assert_eq!(**doc.index(1).unwrap(), Node::Float64(0.1));
    }

    #[test]
    fn test_from_json_binary() {
        // "b64:SGVsbG8=" decodes to "Hello"
        let doc = from_json(r#"["b64:SGVsbG8="]"#).unwrap();
        assert_eq!(doc.index(0).unwrap().as_bytes(), Ok(&b"Hello"[..]));
    }

    #[test]
    fn test_from_json_invalid_base64_is_string() {
        let doc = from_json(r#"["b64:!!!invalid!!!"]"#).unwrap();
        assert_eq!(doc.index(0).unwrap().as_str(), Ok("b64:!!!invalid!!!"));
    }

    #[test]
    fn test_from_json_object_sorted() {
        let doc = from_json(r#"{"zebra": 1, "apple": 2}"#).unwrap();
        let hash = doc.root().as_hash().unwrap();
        assert_eq!(hash.keys().collect::<Vec<_>>(), ["apple", "zebra"]);
    }

    #[test]
    fn test_from_json_scalar_root() {
        assert_eq!(from_json("42"), Err(Error::InvalidRootKind(0xD1)));
        assert_eq!(from_json("null"), Err(Error::InvalidRootKind(0xFF)));
    }

    #[test]
    fn test_from_json_parse_error() {
        assert!(matches!(from_json("not valid json"), Err(Error::JsonParse(_))));
    }

    #[test]
    fn test_to_json_scalars() {
        let arr: Array = vec![
            Node::Null,
            Node::Bool(true),
            Node::UInt32(7),
            Node::Float64(-2.25),
            Node::from("hi"),
            Node::from(b"Hello".to_vec()),
        ]
        .into_iter()
        .collect();
        let doc = Document::new(Node::Array(arr)).unwrap();
        assert_eq!(
            to_json(&doc).unwrap(),
            r#"[null,true,7,-2.25,"hi","b64:SGVsbG8="]"#
        );
    }

    #[test]
    fn test_to_json_non_finite_float_error() {
        for f in [f64::NAN, f64::INFINITY] {
            let arr: Array = [f].into_iter().collect();
            let doc = Document::new(Node::Array(arr)).unwrap();
            assert!(matches!(to_json(&doc), Err(Error::NonFiniteFloat(_))));
        }
    }

    #[test]
    fn test_to_json_path_array() {
        let point = PathPoint {
            position: [1.0, 2.0, 3.0],
            normal: [0.0, 1.0, 0.0],
            unused: 9,
        };
        let node = Node::PathArray(PathArray::new(vec![vec![point], vec![]]));
        let json = node_to_json(&node).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                [{"position": [1.0, 2.0, 3.0], "normal": [0.0, 1.0, 0.0], "unused": 9}],
                []
            ])
        );
    }

    #[test]
    fn test_roundtrip_nested() {
        let original = r#"{"name":"alice","scores":[10,20,30],"data":"b64:SGVsbG8gV29ybGQ="}"#;
        let doc = from_json(original).unwrap();
        let result = to_json(&doc).unwrap();

        let orig_val: JsonValue = serde_json::from_str(original).unwrap();
        let result_val: JsonValue = serde_json::from_str(&result).unwrap();
        assert_eq!(orig_val, result_val);
    }
}
