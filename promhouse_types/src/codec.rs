//! Binary (protobuf) encoding of [`WriteRequest`] messages.

use prost::Message;
use thiserror::Error;

use crate::write::WriteRequest;

/// Errors returned when deserialising a [`WriteRequest`].
#[derive(Debug, Error)]
pub enum CodecError {
    /// The buffer contains no bytes at all.
    #[error("empty payload")]
    EmptyPayload,

    /// The buffer is not a valid `WriteRequest` message.
    #[error("malformed write request: {0}")]
    Decode(#[from] prost::DecodeError),
}

/// Parse a serialised [`WriteRequest`] from `buf`.
///
/// Fields with unknown tags are skipped, so messages produced by newer
/// clients still decode. Truncated fields, invalid wire types, overlong
/// varints and non-UTF-8 label strings are rejected.
///
/// An empty `buf` is rejected with [`CodecError::EmptyPayload`] rather than
/// decoding to an empty request.
pub fn decode(buf: &[u8]) -> Result<WriteRequest, CodecError> {
    if buf.is_empty() {
        return Err(CodecError::EmptyPayload);
    }
    Ok(WriteRequest::decode(buf)?)
}

/// Serialise `req` into its protobuf representation.
pub fn encode(req: &WriteRequest) -> Vec<u8> {
    req.encode_to_vec()
}
