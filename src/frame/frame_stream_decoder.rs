use crate::constants::{DEFAULT_MAX_FRAME_PAYLOAD_SIZE, FRAME_LENGTH_FIELD_SIZE};
use crate::frame::FrameDecodeError;
use std::collections::VecDeque;

/// An incremental decoder for a stream of length-prefixed frames.
///
/// `FrameStreamDecoder` accepts byte chunks exactly as the transport
/// produced them — a chunk may hold a fraction of one frame, several whole
/// frames, or a mix of both — and yields complete payloads in arrival
/// order.
///
/// Internally it is a two-state machine that persists across calls:
/// - **awaiting length**: fewer than 4 length-prefix bytes seen so far;
/// - **awaiting body**: the declared length is known and the decoder is
///   accumulating that many payload bytes.
///
/// A zero-length frame is degenerate but legal here; it is the codec's job
/// to reject the empty payload as unparseable. A declared length above the
/// configured maximum is fatal (see [`FrameDecodeError::PayloadTooLarge`]):
/// the decoder emits the error and resets, and the caller is expected to
/// drop the connection.
pub struct FrameStreamDecoder {
    buffer: Vec<u8>,                // Holds partial frame data
    expected_len: Option<usize>,    // None until a length prefix is consumed
    max_payload_size: usize,
}

pub struct FrameDecoderIterator {
    queue: VecDeque<Result<Vec<u8>, FrameDecodeError>>,
}

impl Iterator for FrameDecoderIterator {
    type Item = Result<Vec<u8>, FrameDecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.queue.pop_front()
    }
}

impl FrameStreamDecoder {
    pub fn new() -> Self {
        Self::with_max_payload_size(DEFAULT_MAX_FRAME_PAYLOAD_SIZE)
    }

    pub fn with_max_payload_size(max_payload_size: usize) -> Self {
        Self {
            buffer: Vec::new(),
            expected_len: None,
            max_payload_size,
        }
    }

    // Reads new bytes and attempts to reassemble them into complete payloads
    pub fn read_bytes(&mut self, data: &[u8]) -> FrameDecoderIterator {
        self.buffer.extend_from_slice(data);
        let mut queue = VecDeque::new();

        loop {
            let expected = match self.expected_len {
                Some(n) => n,
                None => {
                    if self.buffer.len() < FRAME_LENGTH_FIELD_SIZE {
                        break;
                    }

                    let mut prefix = [0u8; FRAME_LENGTH_FIELD_SIZE];
                    prefix.copy_from_slice(&self.buffer[..FRAME_LENGTH_FIELD_SIZE]);
                    self.buffer.drain(..FRAME_LENGTH_FIELD_SIZE);

                    let n = u32::from_be_bytes(prefix) as usize;

                    if n > self.max_payload_size {
                        queue.push_back(Err(FrameDecodeError::PayloadTooLarge {
                            declared: n,
                            max: self.max_payload_size,
                        }));
                        self.reset();
                        break;
                    }

                    self.expected_len = Some(n);
                    n
                }
            };

            if self.buffer.len() < expected {
                break;
            }

            let payload: Vec<u8> = self.buffer.drain(..expected).collect();
            self.expected_len = None;
            queue.push_back(Ok(payload));
        }

        FrameDecoderIterator { queue }
    }

    /// Discards any buffered bytes and returns to the awaiting-length state.
    ///
    /// Called on disconnect so that a stale partial frame can never be
    /// completed by bytes read from a later connection.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.expected_len = None;
    }
}

impl Default for FrameStreamDecoder {
    fn default() -> Self {
        Self::new()
    }
}
