use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FrameEncodeError {
    /// The serialized envelope does not fit in the 4-byte length prefix.
    #[error("serialized payload of {0} bytes exceeds the u32 length prefix")]
    PayloadTooLarge(usize),

    #[error("request serialization failed: {0}")]
    Serialize(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FrameDecodeError {
    /// The declared payload length exceeds the decoder's configured maximum.
    ///
    /// Fatal for the stream: a length-prefixed stream cannot be
    /// resynchronized past a corrupt length field.
    #[error("declared payload length {declared} exceeds maximum {max}")]
    PayloadTooLarge { declared: usize, max: usize },

    /// The payload is not valid JSON. The frame is dropped; the stream
    /// itself stays in sync because the length prefix was honored.
    #[error("malformed JSON payload: {0}")]
    MalformedJson(String),

    /// The payload parsed, but the top-level value is not a JSON object.
    #[error("top-level JSON value is not an object")]
    NotAnObject,
}
