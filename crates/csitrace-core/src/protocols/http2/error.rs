use thiserror::Error;

use super::parser::{FrameType, StreamId};

/// Errors returned by HTTP/2 frame decoding.
///
/// Every variant means the byte log cannot be trusted past this point.
#[derive(Debug, Error)]
pub enum Http2Error {
    #[error("{frame_type} frame on stream 0")]
    ZeroStreamId { frame_type: FrameType },
    #[error("{frame_type} frame on stream {stream_id}: need {needed} bytes, got {actual}")]
    TooShort {
        frame_type: FrameType,
        stream_id: StreamId,
        needed: usize,
        actual: usize,
    },
    #[error("{frame_type} frame on stream {stream_id}: pad length {pad_len} exceeds payload")]
    InvalidPadding {
        frame_type: FrameType,
        stream_id: StreamId,
        pad_len: usize,
    },
    #[error("frame header at byte {offset} cut short: {available} of 9 bytes")]
    TruncatedHeader { offset: usize, available: usize },
    #[error("frame at byte {offset} declares {declared} bytes, {available} remain")]
    Truncated {
        offset: usize,
        declared: usize,
        available: usize,
    },
    #[error("HPACK decode error on stream {stream_id}: {message}")]
    Hpack { stream_id: StreamId, message: String },
}
