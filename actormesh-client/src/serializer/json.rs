// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use bytes::Bytes;
use serde_json::Value;

// Layer 3: Internal module imports
use super::error::SerializationError;
use super::traits::Serializer;

/// Default serializer: JSON bodies via serde_json.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSerializer;

impl JsonSerializer {
    /// Create the serializer.
    pub fn new() -> Self {
        Self
    }
}

impl Serializer for JsonSerializer {
    fn encode_args(&self, args: &[Value]) -> Result<Bytes, SerializationError> {
        serde_json::to_vec(args)
            .map(Bytes::from)
            .map_err(|e| SerializationError::Encode(e.to_string()))
    }

    fn decode_args(&self, payload: &Bytes) -> Result<Vec<Value>, SerializationError> {
        serde_json::from_slice(payload).map_err(|e| SerializationError::Decode(e.to_string()))
    }

    fn encode_result(&self, value: &Value) -> Result<Bytes, SerializationError> {
        serde_json::to_vec(value)
            .map(Bytes::from)
            .map_err(|e| SerializationError::Encode(e.to_string()))
    }

    fn decode_result(&self, payload: &Bytes) -> Result<Value, SerializationError> {
        serde_json::from_slice(payload).map_err(|e| SerializationError::Decode(e.to_string()))
    }
}
