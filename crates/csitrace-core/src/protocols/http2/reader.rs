use super::error::Http2Error;
use super::layout;
use super::parser::{FrameType, StreamId};

/// Bounds-checked access to one frame payload.
///
/// Errors carry the frame type and stream so a malformed frame can be
/// reported without the caller re-threading that context.
pub struct PayloadReader<'a> {
    payload: &'a [u8],
    frame_type: FrameType,
    stream_id: StreamId,
}

impl<'a> PayloadReader<'a> {
    pub fn new(payload: &'a [u8], frame_type: FrameType, stream_id: StreamId) -> Self {
        Self {
            payload,
            frame_type,
            stream_id,
        }
    }

    pub fn require_len(&self, needed: usize) -> Result<(), Http2Error> {
        if self.payload.len() < needed {
            return Err(Http2Error::TooShort {
                frame_type: self.frame_type,
                stream_id: self.stream_id,
                needed,
                actual: self.payload.len(),
            });
        }
        Ok(())
    }

    pub fn read_u8(&self, offset: usize) -> Result<u8, Http2Error> {
        self.require_len(offset + 1)?;
        Ok(self.payload[offset])
    }

    pub fn read_slice(&self, range: std::ops::Range<usize>) -> Result<&'a [u8], Http2Error> {
        self.require_len(range.end)?;
        Ok(&self.payload[range])
    }

    pub fn read_stream_id(&self, offset: usize) -> Result<StreamId, Http2Error> {
        let bytes = self.read_slice(offset..offset + 4)?;
        let raw = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        Ok(StreamId(raw & layout::STREAM_ID_MASK))
    }

    /// Payload without the pad length octet and trailing padding.
    pub fn unpadded(&self, padded: bool) -> Result<&'a [u8], Http2Error> {
        if !padded {
            return Ok(self.payload);
        }
        let pad_len = usize::from(self.read_u8(0)?);
        let rest = &self.payload[layout::PAD_LENGTH_LEN..];
        if pad_len > rest.len() {
            return Err(Http2Error::InvalidPadding {
                frame_type: self.frame_type,
                stream_id: self.stream_id,
                pad_len,
            });
        }
        Ok(&rest[..rest.len() - pad_len])
    }
}

/// Decode the 24-bit big-endian frame length.
pub fn read_u24_be(bytes: &[u8; 3]) -> u32 {
    u32::from_be_bytes([0, bytes[0], bytes[1], bytes[2]])
}
