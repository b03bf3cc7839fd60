mod frame_codec;
mod frame_error;
mod frame_stream_decoder;

pub use frame_codec::FrameCodec;
pub use frame_error::{FrameDecodeError, FrameEncodeError};
pub use frame_stream_decoder::{FrameDecoderIterator, FrameStreamDecoder};
