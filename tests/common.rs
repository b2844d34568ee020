//! Common test utilities shared between integration tests

#![allow(dead_code)]

use serde_json::Value;
use wasmframe::parser::encoding;

/// Asserts that every field present in `expected` has the same value in
/// `actual`. Objects may carry extra fields; arrays must match element by
/// element.
pub fn assert_json_subset(actual: &Value, expected: &Value, path: &str) {
    match (actual, expected) {
        (Value::Object(actual), Value::Object(expected)) => {
            for (key, value) in expected {
                let field = format!("{}.{}", path, key);
                match actual.get(key) {
                    Some(found) => assert_json_subset(found, value, &field),
                    None => panic!("missing field {}", field),
                }
            }
        }
        (Value::Array(actual), Value::Array(expected)) => {
            assert_eq!(
                actual.len(),
                expected.len(),
                "length mismatch at {}: actual = {:?}",
                path,
                actual
            );
            for (i, (a, e)) in actual.iter().zip(expected.iter()).enumerate() {
                assert_json_subset(a, e, &format!("{}[{}]", path, i));
            }
        }
        _ => assert_eq!(actual, expected, "value mismatch at {}", path),
    }
}

/// A module header followed by the given sections, each `(id, payload)`.
pub fn module_bytes(sections: &[(u8, Vec<u8>)]) -> Vec<u8> {
    let mut buf = Vec::new();
    encoding::write_header(&mut buf);
    for (id, payload) in sections {
        encoding::write_section(&mut buf, *id, payload);
    }
    buf
}

/// Payload of a custom section: its name followed by `contents`.
pub fn custom_payload(name: &str, contents: &[u8]) -> Vec<u8> {
    let mut buf = Vec::new();
    encoding::write_name(&mut buf, name);
    buf.extend_from_slice(contents);
    buf
}
