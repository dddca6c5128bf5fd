use std::fmt;

use super::error::Http2Error;
use super::layout;
use super::reader::{PayloadReader, read_u24_be};

/// HTTP/2 stream identifier (31-bit, reserved bit cleared).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(pub u32);

impl StreamId {
    pub const CONNECTION: StreamId = StreamId(0);
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for StreamId {
    fn from(value: u32) -> Self {
        Self(value & layout::STREAM_ID_MASK)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameType {
    Data,
    Headers,
    Priority,
    RstStream,
    Settings,
    PushPromise,
    Ping,
    GoAway,
    WindowUpdate,
    Continuation,
    Unknown(u8),
}

impl From<u8> for FrameType {
    fn from(value: u8) -> Self {
        match value {
            layout::TYPE_DATA => FrameType::Data,
            layout::TYPE_HEADERS => FrameType::Headers,
            layout::TYPE_PRIORITY => FrameType::Priority,
            layout::TYPE_RST_STREAM => FrameType::RstStream,
            layout::TYPE_SETTINGS => FrameType::Settings,
            layout::TYPE_PUSH_PROMISE => FrameType::PushPromise,
            layout::TYPE_PING => FrameType::Ping,
            layout::TYPE_GOAWAY => FrameType::GoAway,
            layout::TYPE_WINDOW_UPDATE => FrameType::WindowUpdate,
            layout::TYPE_CONTINUATION => FrameType::Continuation,
            other => FrameType::Unknown(other),
        }
    }
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameType::Data => f.write_str("DATA"),
            FrameType::Headers => f.write_str("HEADERS"),
            FrameType::Priority => f.write_str("PRIORITY"),
            FrameType::RstStream => f.write_str("RST_STREAM"),
            FrameType::Settings => f.write_str("SETTINGS"),
            FrameType::PushPromise => f.write_str("PUSH_PROMISE"),
            FrameType::Ping => f.write_str("PING"),
            FrameType::GoAway => f.write_str("GOAWAY"),
            FrameType::WindowUpdate => f.write_str("WINDOW_UPDATE"),
            FrameType::Continuation => f.write_str("CONTINUATION"),
            FrameType::Unknown(code) => write!(f, "UNKNOWN({code:#04x})"),
        }
    }
}

/// Parsed 9-byte frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub length: u32,
    pub frame_type: FrameType,
    pub flags: u8,
    pub stream_id: StreamId,
}

impl FrameHeader {
    pub fn has_flag(&self, flag: u8) -> bool {
        self.flags & flag != 0
    }

    pub fn end_headers(&self) -> bool {
        self.has_flag(layout::FLAG_END_HEADERS)
    }
}

/// One frame sliced out of a byte log, payload still undecoded.
#[derive(Debug, Clone, Copy)]
pub struct RawFrame<'a> {
    pub header: FrameHeader,
    pub payload: &'a [u8],
}

impl RawFrame<'_> {
    pub fn encoded_len(&self) -> usize {
        layout::FRAME_HEADER_LEN + self.payload.len()
    }
}

/// Frame payload reduced to what stream reconstruction needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePayload<'a> {
    Data(&'a [u8]),
    Headers(&'a [u8]),
    PushPromise {
        promised_stream_id: StreamId,
        fragment: &'a [u8],
    },
    Continuation(&'a [u8]),
    /// SETTINGS, PING, WINDOW_UPDATE, RST_STREAM, GOAWAY, PRIORITY and
    /// unknown extension frames.
    Ignored,
}

/// Strip the client connection preface when the byte log starts with it.
pub fn strip_preface(bytes: &[u8]) -> &[u8] {
    bytes
        .strip_prefix(layout::CONNECTION_PREFACE.as_slice())
        .unwrap_or(bytes)
}

/// Parse the 9-byte frame header, or `None` when fewer bytes are available.
pub fn parse_frame_header(bytes: &[u8]) -> Option<FrameHeader> {
    let header = bytes.get(..layout::FRAME_HEADER_LEN)?;
    let length = &header[layout::LENGTH_RANGE];
    let stream_id = &header[layout::STREAM_ID_RANGE];
    let length = read_u24_be(&[length[0], length[1], length[2]]);
    let stream_id = u32::from_be_bytes([stream_id[0], stream_id[1], stream_id[2], stream_id[3]]);
    Some(FrameHeader {
        length,
        frame_type: FrameType::from(header[layout::TYPE_OFFSET]),
        flags: header[layout::FLAGS_OFFSET],
        stream_id: StreamId::from(stream_id),
    })
}

/// Slice the next whole frame off `bytes`.
///
/// Returns `None` when `bytes` ends before the frame its header declares.
pub fn split_frame(bytes: &[u8]) -> Option<RawFrame<'_>> {
    let header = parse_frame_header(bytes)?;
    let end = layout::FRAME_HEADER_LEN.checked_add(header.length as usize)?;
    let payload = bytes.get(layout::FRAME_HEADER_LEN..end)?;
    Some(RawFrame { header, payload })
}

/// Decode the parts of a frame payload that carry stream content.
///
/// # Errors
/// Returns `Http2Error` when a stream-scoped frame arrives on stream 0 or
/// its padding/priority/promised-id fields do not fit the payload.
pub fn parse_frame_payload<'a>(frame: &RawFrame<'a>) -> Result<FramePayload<'a>, Http2Error> {
    let header = frame.header;
    let stream_scoped = matches!(
        header.frame_type,
        FrameType::Data | FrameType::Headers | FrameType::PushPromise | FrameType::Continuation
    );
    if stream_scoped && header.stream_id == StreamId::CONNECTION {
        return Err(Http2Error::ZeroStreamId {
            frame_type: header.frame_type,
        });
    }

    let reader = PayloadReader::new(frame.payload, header.frame_type, header.stream_id);
    let padded = header.has_flag(layout::FLAG_PADDED);
    match header.frame_type {
        FrameType::Data => Ok(FramePayload::Data(reader.unpadded(padded)?)),
        FrameType::Headers => {
            let body = reader.unpadded(padded)?;
            if !header.has_flag(layout::FLAG_PRIORITY) {
                return Ok(FramePayload::Headers(body));
            }
            PayloadReader::new(body, header.frame_type, header.stream_id)
                .require_len(layout::PRIORITY_BLOCK_LEN)?;
            Ok(FramePayload::Headers(&body[layout::PRIORITY_BLOCK_LEN..]))
        }
        FrameType::PushPromise => {
            let body = reader.unpadded(padded)?;
            let body_reader = PayloadReader::new(body, header.frame_type, header.stream_id);
            let promised_stream_id = body_reader.read_stream_id(0)?;
            Ok(FramePayload::PushPromise {
                promised_stream_id,
                fragment: &body[layout::PROMISED_STREAM_ID_LEN..],
            })
        }
        FrameType::Continuation => Ok(FramePayload::Continuation(frame.payload)),
        _ => Ok(FramePayload::Ignored),
    }
}
