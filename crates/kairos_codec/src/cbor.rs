//! CBOR encoding of serde types.
//!
//! Journal payloads are CBOR. Determinism comes from the data model: every
//! map that reaches the encoder is a `BTreeMap` or a struct, so identical
//! values always produce identical bytes.

use crate::error::{CodecError, CodecResult};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Encodes `value` as CBOR.
///
/// # Errors
///
/// Returns [`CodecError::EncodingFailed`] if serialization fails.
pub fn encode_cbor<T: Serialize + ?Sized>(value: &T) -> CodecResult<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf)
        .map_err(|e| CodecError::encoding_failed(e.to_string()))?;
    Ok(buf)
}

/// Decodes a value from CBOR bytes.
///
/// # Errors
///
/// Returns [`CodecError::DecodingFailed`] if the bytes are not valid CBOR
/// for `T`.
pub fn decode_cbor<T: DeserializeOwned>(bytes: &[u8]) -> CodecResult<T> {
    ciborium::from_reader(bytes).map_err(|e| CodecError::decoding_failed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Snapshot;
    use serde_json::json;

    #[test]
    fn snapshot_survives_cbor() {
        let mut snapshot = Snapshot::new();
        snapshot.insert("title", "Standup");
        snapshot.insert("recurrence_pattern", json!({"freq": "weekly", "days": ["mo", "we"]}));
        snapshot.insert("owner_id", 3);
        snapshot.insert("location", serde_json::Value::Null);

        let bytes = encode_cbor(&snapshot).unwrap();
        let back: Snapshot = decode_cbor(&bytes).unwrap();
        assert_eq!(back, snapshot);
    }

    #[test]
    fn equal_snapshots_encode_identically() {
        let mut a = Snapshot::new();
        a.insert("b", 1);
        a.insert("a", 2);
        let mut b = Snapshot::new();
        b.insert("a", 2);
        b.insert("b", 1);
        assert_eq!(encode_cbor(&a).unwrap(), encode_cbor(&b).unwrap());
    }

    #[test]
    fn garbage_fails_to_decode() {
        let result: CodecResult<Snapshot> = decode_cbor(&[0xff, 0x00, 0x13]);
        assert!(matches!(result, Err(CodecError::DecodingFailed { .. })));
    }
}
