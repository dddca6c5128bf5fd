use std::collections::{BTreeMap, BTreeSet};
use std::net::SocketAddrV4;

use tracing::debug;

use crate::protocols::csi::MessageSide;
use crate::protocols::http2::parser::{FrameType, StreamId};
use crate::protocols::http2::{HeaderField, find_field, has_field};

use super::flows::FlowKey;
use super::streams::{Frame, Stream};

const METHOD_POST: (&str, &str) = (":method", "POST");
const SCHEME_HTTP: (&str, &str) = (":scheme", "http");
const STATUS_OK: (&str, &str) = (":status", "200");
const CONTENT_TYPE_GRPC: (&str, &str) = ("content-type", "application/grpc");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Role {
    Request,
    Response,
}

/// A unary call: request and response streams sharing one stream id.
#[derive(Debug, Clone)]
pub(crate) struct PairedCall {
    pub stream_id: StreamId,
    pub client: SocketAddrV4,
    pub server: SocketAddrV4,
    /// `:authority` of the request, empty when absent.
    pub client_name: String,
    pub request: Stream,
    pub response: Stream,
}

impl PairedCall {
    pub fn request_headers(&self) -> &[HeaderField] {
        self.request
            .frames
            .first()
            .and_then(headers_frame)
            .unwrap_or_default()
    }

    /// Direction that carried `side` of the call.
    pub fn direction(&self, side: MessageSide) -> FlowKey {
        match side {
            MessageSide::Request => FlowKey {
                src: self.client,
                dst: self.server,
            },
            MessageSide::Response => FlowKey {
                src: self.server,
                dst: self.client,
            },
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PairingStats {
    pub paired: u64,
    /// Stream ids seen in only one direction.
    pub unpaired: u64,
    /// Stream ids whose two sides are not one request and one response.
    pub unclassified: u64,
}

fn headers_match(fields: &[HeaderField], required: &[(&str, &str)]) -> bool {
    required
        .iter()
        .all(|(name, value)| has_field(fields, name, value))
}

/// Decoded fields of a HEADERS frame; PUSH_PROMISE blocks do not count.
fn headers_frame(frame: &Frame) -> Option<&[HeaderField]> {
    match frame.header.frame_type {
        FrameType::Headers => frame.header_fields(),
        _ => None,
    }
}

fn is_data(frame: &Frame) -> bool {
    frame.data().is_some()
}

pub(crate) fn is_grpc_request(stream: &Stream) -> bool {
    let [first, rest @ ..] = stream.frames.as_slice() else {
        return false;
    };
    let Some(fields) = headers_frame(first) else {
        return false;
    };
    !rest.is_empty()
        && rest.iter().all(is_data)
        && headers_match(fields, &[METHOD_POST, SCHEME_HTTP, CONTENT_TYPE_GRPC])
}

pub(crate) fn is_grpc_response(stream: &Stream) -> bool {
    let [first, middle @ .., last] = stream.frames.as_slice() else {
        return false;
    };
    let Some(fields) = headers_frame(first) else {
        return false;
    };
    !middle.is_empty()
        && headers_frame(last).is_some()
        && middle.iter().all(is_data)
        && headers_match(fields, &[STATUS_OK, CONTENT_TYPE_GRPC])
}

pub(crate) fn classify(stream: &Stream) -> Option<Role> {
    if is_grpc_request(stream) {
        Some(Role::Request)
    } else if is_grpc_response(stream) {
        Some(Role::Response)
    } else {
        None
    }
}

/// Pair the streams of two opposite directions by stream id.
///
/// `forward` names the direction `forward_streams` was read from.
pub(crate) fn pair_streams(
    forward: FlowKey,
    mut forward_streams: BTreeMap<StreamId, Stream>,
    mut reverse_streams: BTreeMap<StreamId, Stream>,
    stats: &mut PairingStats,
) -> Vec<PairedCall> {
    let reverse = forward.reversed();
    let stream_ids: Vec<StreamId> = forward_streams
        .keys()
        .chain(reverse_streams.keys())
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut calls = Vec::new();
    for stream_id in stream_ids {
        let (Some(a), Some(b)) = (
            forward_streams.remove(&stream_id),
            reverse_streams.remove(&stream_id),
        ) else {
            debug!(flow = %forward, %stream_id, "stream seen in one direction only");
            stats.unpaired += 1;
            continue;
        };

        let (client, server, request, response) = match (classify(&a), classify(&b)) {
            (Some(Role::Request), Some(Role::Response)) => (forward.src, forward.dst, a, b),
            (Some(Role::Response), Some(Role::Request)) => (reverse.src, reverse.dst, b, a),
            (a_role, b_role) => {
                debug!(
                    flow = %forward,
                    %stream_id,
                    forward_role = ?a_role,
                    reverse_role = ?b_role,
                    "stream is not a gRPC request/response pair"
                );
                stats.unclassified += 1;
                continue;
            }
        };

        let client_name = request
            .frames
            .first()
            .and_then(headers_frame)
            .and_then(|fields| find_field(fields, ":authority"))
            .unwrap_or_default()
            .to_string();
        stats.paired += 1;
        calls.push(PairedCall {
            stream_id,
            client,
            server,
            client_name,
            request,
            response,
        });
    }
    calls
}
