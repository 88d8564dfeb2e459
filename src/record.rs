//! Record type and JSON encoding.

use bytes::Bytes;

/// One structured event: field names mapped to dynamically typed values
/// (strings, numbers, booleans, or nested structures). Records are
/// borrowed for the duration of one send and never retained.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// A record whose fields could not be serialized. Aborts only the send
/// it occurred on; other in-flight and future sends are unaffected.
#[derive(Debug)]
pub struct EncodeError(pub String);

impl std::fmt::Display for EncodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "failed to encode record: {}", self.0)
    }
}

impl std::error::Error for EncodeError {}

/// Encode a record as a UTF-8 JSON document whose top-level structure
/// mirrors the record's field-to-value mapping. Key ordering is not
/// guaranteed and nothing downstream depends on it.
pub fn encode(record: &Record) -> Result<Bytes, EncodeError> {
    serde_json::to_vec(record)
        .map(Bytes::from)
        .map_err(|e| EncodeError(e.to_string()))
}
