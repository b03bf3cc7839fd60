use crate::constants::FRAME_LENGTH_FIELD_SIZE;
use crate::frame::{FrameDecodeError, FrameEncodeError};
use crate::message::{RequestEnvelope, ResponseEnvelope};
use serde_json::Value;

/// Provides encoding and decoding functionality for frames.
///
/// A frame on the wire is a 4-byte big-endian (network order) unsigned
/// length followed by exactly that many bytes of UTF-8 JSON. `FrameCodec`
/// turns a request envelope into such a frame and turns a length-matched
/// payload back into a response envelope. It performs no I/O and keeps no
/// state; reassembling payloads out of a byte stream is the
/// `FrameStreamDecoder`'s job.
pub struct FrameCodec;

impl FrameCodec {
    /// Encodes a request envelope into a complete wire frame.
    ///
    /// The envelope is serialized as compact JSON and prefixed with the
    /// big-endian byte length of that JSON. Fails only if serialization
    /// itself fails or the serialized form does not fit in the `u32`
    /// length prefix.
    pub fn encode(request: &RequestEnvelope) -> Result<Vec<u8>, FrameEncodeError> {
        let json = serde_json::to_vec(request)
            .map_err(|e| FrameEncodeError::Serialize(e.to_string()))?;

        if u32::try_from(json.len()).is_err() {
            return Err(FrameEncodeError::PayloadTooLarge(json.len()));
        }

        let mut buf = Vec::with_capacity(FRAME_LENGTH_FIELD_SIZE + json.len());
        buf.extend(&(json.len() as u32).to_be_bytes());
        buf.extend(&json);

        Ok(buf)
    }

    /// Decodes a single length-matched payload into a response envelope.
    ///
    /// Succeeds only if the payload is valid JSON whose top-level value is
    /// an object. Missing envelope fields decode to defaults, matching the
    /// defaulting accessors the server's peers rely on. A failure here is
    /// non-fatal to the stream: the caller drops the frame and keeps
    /// reading.
    pub fn decode(payload: &[u8]) -> Result<ResponseEnvelope, FrameDecodeError> {
        let value: Value = serde_json::from_slice(payload)
            .map_err(|e| FrameDecodeError::MalformedJson(e.to_string()))?;

        if !value.is_object() {
            return Err(FrameDecodeError::NotAnObject);
        }

        serde_json::from_value(value).map_err(|e| FrameDecodeError::MalformedJson(e.to_string()))
    }
}
