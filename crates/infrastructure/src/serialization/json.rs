//! JSON helpers for the persisted credential record.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::ser::{PrettyFormatter, Serializer};

/// Failure to encode or decode a JSON document.
#[derive(Debug, thiserror::Error)]
pub enum SerializationError {
    /// The value could not be written as JSON.
    #[error("cannot encode JSON: {0}")]
    Encode(serde_json::Error),

    /// The bytes are not a valid document of the expected shape.
    #[error("cannot decode JSON: {0}")]
    Decode(serde_json::Error),
}

/// Writes `value` as JSON with two-space indentation, fields in declaration
/// order and a trailing newline.
///
/// # Errors
///
/// Returns `Encode` if the value cannot be serialized.
pub fn to_json_stable_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, SerializationError> {
    let mut buffer = Vec::with_capacity(256);
    let mut serializer =
        Serializer::with_formatter(&mut buffer, PrettyFormatter::with_indent(b"  "));
    value
        .serialize(&mut serializer)
        .map_err(SerializationError::Encode)?;
    buffer.push(b'\n');
    Ok(buffer)
}

/// Parses a JSON document.
///
/// # Errors
///
/// Returns `Decode` for malformed JSON or a shape mismatch.
pub fn from_json_bytes<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, SerializationError> {
    serde_json::from_slice(bytes).map_err(SerializationError::Decode)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Record {
        version: u32,
        token: Option<String>,
    }

    #[test]
    fn test_stable_output_layout() {
        let bytes = to_json_stable_bytes(&Record {
            version: 1,
            token: None,
        })
        .unwrap();

        assert_eq!(bytes, b"{\n  \"version\": 1,\n  \"token\": null\n}\n");
    }

    #[test]
    fn test_bytes_parse_back() {
        let record = Record {
            version: 2,
            token: Some("abc".to_string()),
        };
        let bytes = to_json_stable_bytes(&record).unwrap();
        let parsed: Record = from_json_bytes(&bytes).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_invalid_json_is_decode_error() {
        let result: Result<Record, _> = from_json_bytes(b"{\"version\": }");
        assert!(matches!(result, Err(SerializationError::Decode(_))));
    }
}
