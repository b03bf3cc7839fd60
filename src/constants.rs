// Frame related constants
pub const FRAME_LENGTH_FIELD_SIZE: usize = 4;

/// Upper bound on the payload length a frame may declare.
///
/// The length field is peer-controlled input; capping it bounds how much
/// memory the decoder will ever allocate for a single frame. There is no way
/// to resynchronize a length-prefixed stream past a corrupt length field, so
/// a declared length above this limit is reported as a fatal framing error.
pub const DEFAULT_MAX_FRAME_PAYLOAD_SIZE: usize = 1024 * 1024;
