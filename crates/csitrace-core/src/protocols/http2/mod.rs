//! HTTP/2 framing (RFC 7540 §4, §6) and HPACK header blocks (RFC 7541).
//!
//! Frames are sliced from a directional byte log by `parser`; stream state
//! (open header blocks, CONTINUATION assembly) lives in the analysis layer.

pub mod error;
pub mod hpack;
pub mod layout;
pub mod parser;
pub mod reader;

pub use error::Http2Error;
pub use hpack::{HeaderBlockDecoder, HeaderField, find_field, has_field};
pub use parser::{FramePayload, FrameType, StreamId, parse_frame_payload, split_frame, strip_preface};
