use std::collections::BTreeMap;

use time::OffsetDateTime;
use tracing::trace;

use crate::protocols::http2::layout::FRAME_HEADER_LEN;
use crate::protocols::http2::parser::{
    FrameHeader, FramePayload, FrameType, RawFrame, StreamId, parse_frame_header,
};
use crate::protocols::http2::{
    HeaderBlockDecoder, HeaderField, Http2Error, parse_frame_payload, split_frame, strip_preface,
};

use super::flows::{DirectionalByteLog, FlowKey};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FrameBody {
    Data(Vec<u8>),
    /// Header block bytes still waiting for END_HEADERS.
    HeaderBlock(Vec<u8>),
    Headers(Vec<HeaderField>),
}

/// A retained DATA, HEADERS or PUSH_PROMISE frame.
#[derive(Debug, Clone)]
pub(crate) struct Frame {
    pub header: FrameHeader,
    pub body: FrameBody,
    /// Capture instant of the segment that completed this frame.
    pub timestamp: OffsetDateTime,
}

impl Frame {
    pub fn header_fields(&self) -> Option<&[HeaderField]> {
        match &self.body {
            FrameBody::Headers(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn data(&self) -> Option<&[u8]> {
        match (&self.body, self.header.frame_type) {
            (FrameBody::Data(body), FrameType::Data) => Some(body),
            _ => None,
        }
    }
}

/// Frames of one (direction, stream id), in byte-log order.
#[derive(Debug, Clone)]
pub(crate) struct Stream {
    pub frames: Vec<Frame>,
    pub last_seen: OffsetDateTime,
}

/// Streams of one direction plus decode counters.
#[derive(Debug, Default)]
pub(crate) struct Reconstruction {
    pub streams: BTreeMap<StreamId, Stream>,
    pub frames: u64,
    pub header_blocks: u64,
}

#[derive(Debug, Default)]
struct StreamAccumulator {
    frames: Vec<Frame>,
    /// Index of the frame whose header block is still open.
    open_headers: Option<usize>,
}

impl StreamAccumulator {
    fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    fn open_header_block(&mut self, header: FrameHeader, fragment: &[u8], timestamp: OffsetDateTime) {
        self.frames.push(Frame {
            header,
            body: FrameBody::HeaderBlock(fragment.to_vec()),
            timestamp,
        });
        self.open_headers = Some(self.frames.len() - 1);
    }

    /// Append a CONTINUATION fragment; `false` when no block is open.
    fn extend_header_block(&mut self, fragment: &[u8], timestamp: OffsetDateTime) -> bool {
        let Some(frame) = self.open_headers.and_then(|idx| self.frames.get_mut(idx)) else {
            return false;
        };
        let FrameBody::HeaderBlock(block) = &mut frame.body else {
            return false;
        };
        block.extend_from_slice(fragment);
        frame.timestamp = timestamp;
        true
    }

    fn finish_header_block(
        &mut self,
        stream_id: StreamId,
        decoder: &mut HeaderBlockDecoder,
    ) -> Result<(), Http2Error> {
        let Some(frame) = self.open_headers.take().and_then(|idx| self.frames.get_mut(idx)) else {
            return Ok(());
        };
        if let FrameBody::HeaderBlock(block) = &frame.body {
            frame.body = FrameBody::Headers(decoder.decode(stream_id, block)?);
        }
        Ok(())
    }

    fn finish(self) -> Option<Stream> {
        let last_seen = self.frames.last()?.timestamp;
        Some(Stream {
            frames: self.frames,
            last_seen,
        })
    }
}

/// Slice the frame starting at `offset`, failing when the log ends first.
fn next_frame(bytes: &[u8], offset: usize) -> Result<RawFrame<'_>, Http2Error> {
    let rest = &bytes[offset..];
    if let Some(raw) = split_frame(rest) {
        return Ok(raw);
    }
    match parse_frame_header(rest) {
        Some(header) => Err(Http2Error::Truncated {
            offset,
            declared: FRAME_HEADER_LEN + header.length as usize,
            available: rest.len(),
        }),
        None => Err(Http2Error::TruncatedHeader {
            offset,
            available: rest.len(),
        }),
    }
}

/// Decode every HTTP/2 frame of one directional byte log into streams.
///
/// One HPACK decoder serves the whole log, so header blocks are decoded in
/// byte order regardless of which stream they belong to.
///
/// # Errors
/// Returns `Http2Error` for frames that violate their declared layout, for
/// a frame the log ends inside of, and for header blocks the HPACK decoder
/// rejects.
pub(crate) fn reconstruct_streams(
    flow: FlowKey,
    log: &DirectionalByteLog,
) -> Result<Reconstruction, Http2Error> {
    let bytes = log.bytes();
    let mut offset = bytes.len() - strip_preface(bytes).len();
    let mut decoder = HeaderBlockDecoder::new();
    let mut accumulators: BTreeMap<StreamId, StreamAccumulator> = BTreeMap::new();
    let mut out = Reconstruction::default();

    while offset < bytes.len() {
        let raw = next_frame(bytes, offset)?;
        offset += raw.encoded_len();
        let Some(timestamp) = log.timestamp_at(offset) else {
            break;
        };
        out.frames += 1;

        let header = raw.header;
        let stream_id = header.stream_id;
        match parse_frame_payload(&raw)? {
            FramePayload::Data(body) => {
                accumulators.entry(stream_id).or_default().push(Frame {
                    header,
                    body: FrameBody::Data(body.to_vec()),
                    timestamp,
                });
            }
            FramePayload::PushPromise {
                promised_stream_id,
                fragment,
            } => {
                trace!(%flow, %stream_id, %promised_stream_id, "PUSH_PROMISE");
                let acc = accumulators.entry(stream_id).or_default();
                acc.open_header_block(header, fragment, timestamp);
                if header.end_headers() {
                    acc.finish_header_block(stream_id, &mut decoder)?;
                }
            }
            FramePayload::Headers(fragment) => {
                let acc = accumulators.entry(stream_id).or_default();
                acc.open_header_block(header, fragment, timestamp);
                if header.end_headers() {
                    acc.finish_header_block(stream_id, &mut decoder)?;
                }
            }
            FramePayload::Continuation(fragment) => {
                let Some(acc) = accumulators.get_mut(&stream_id) else {
                    trace!(%flow, %stream_id, "CONTINUATION without header block");
                    continue;
                };
                if !acc.extend_header_block(fragment, timestamp) {
                    trace!(%flow, %stream_id, "CONTINUATION without header block");
                    continue;
                }
                if header.end_headers() {
                    acc.finish_header_block(stream_id, &mut decoder)?;
                }
            }
            FramePayload::Ignored => {
                trace!(%flow, %stream_id, frame_type = %header.frame_type, "frame ignored");
            }
        }
    }

    out.header_blocks = decoder.blocks_decoded();
    out.streams = accumulators
        .into_iter()
        .filter_map(|(stream_id, acc)| acc.finish().map(|stream| (stream_id, stream)))
        .collect();
    Ok(out)
}
