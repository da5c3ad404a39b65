// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use bytes::Bytes;
use serde_json::Value;

// Layer 3: Internal module imports
use super::error::SerializationError;

/// Encodes invocation arguments and results for the wire.
///
/// The runtime treats payloads as opaque bytes between these calls; the
/// interchange type on the host side is [`serde_json::Value`]. The
/// default implementation is [`JsonSerializer`](super::JsonSerializer);
/// hosts substitute their own via the client builder.
pub trait Serializer: Send + Sync + 'static {
    /// Encode an argument list.
    fn encode_args(&self, args: &[Value]) -> Result<Bytes, SerializationError>;

    /// Decode an argument list.
    fn decode_args(&self, payload: &Bytes) -> Result<Vec<Value>, SerializationError>;

    /// Encode a single result value.
    fn encode_result(&self, value: &Value) -> Result<Bytes, SerializationError>;

    /// Decode a single result value.
    fn decode_result(&self, payload: &Bytes) -> Result<Value, SerializationError>;
}
