use tracing::debug;

use crate::protocols::csi::{CsiMethod, MessageSide, parse_rpc_path};
use crate::protocols::grpc::parse_envelope;
use crate::protocols::http2::find_field;
use crate::{Agent, RpcRecord, Timing};

use super::AnalysisError;
use super::flows::FlowKey;
use super::pairing::PairedCall;
use super::streams::{Frame, Stream};

/// What became of one paired call.
#[derive(Debug)]
pub(crate) enum CallOutcome {
    Decoded(Box<RpcRecord>),
    /// `:path` missing or outside the CSI v1 package.
    NotCsi,
    /// CSI path naming an RPC the dispatch table does not know.
    UnknownMethod,
}

fn first_data(stream: &Stream) -> &[u8] {
    stream
        .frames
        .iter()
        .find_map(Frame::data)
        .unwrap_or_default()
}

fn message_bytes<'a>(
    call: &'a PairedCall,
    path: &str,
    side: MessageSide,
) -> Result<&'a [u8], AnalysisError> {
    let stream = match side {
        MessageSide::Request => &call.request,
        MessageSide::Response => &call.response,
    };
    parse_envelope(first_data(stream)).map_err(|source| {
        let direction = call.direction(side);
        AnalysisError::Grpc {
            src: direction.src,
            dst: direction.dst,
            path: path.to_string(),
            side,
            source,
        }
    })
}

/// Decode both sides of a paired call into a record.
///
/// # Errors
/// Returns `AnalysisError` when an envelope is compressed or malformed, or
/// when a payload does not decode into its CSI message type.
pub(crate) fn decode_call(flow: FlowKey, call: &PairedCall) -> Result<CallOutcome, AnalysisError> {
    let Some(path) = find_field(call.request_headers(), ":path") else {
        debug!(%flow, stream_id = %call.stream_id, "request without :path");
        return Ok(CallOutcome::NotCsi);
    };
    let Some(rpc_path) = parse_rpc_path(path) else {
        debug!(%flow, stream_id = %call.stream_id, path, "not a CSI v1 path");
        return Ok(CallOutcome::NotCsi);
    };
    let Some(method) = CsiMethod::from_path(&rpc_path) else {
        debug!(%flow, stream_id = %call.stream_id, path, "unknown CSI method");
        return Ok(CallOutcome::UnknownMethod);
    };

    let request_bytes = message_bytes(call, path, MessageSide::Request)?;
    let response_bytes = message_bytes(call, path, MessageSide::Response)?;
    let request = method.decode_request(request_bytes)?;
    let response = method.decode_response(response_bytes)?;

    let start = call.request.last_seen;
    let end = call.response.last_seen;
    Ok(CallOutcome::Decoded(Box::new(RpcRecord {
        action: rpc_path.method.to_string(),
        path: path.to_string(),
        agent: Agent {
            name: call.client_name.clone(),
            ip: *call.client.ip(),
            port: call.client.port(),
        },
        timing: Timing::new(start, end),
        request,
        response,
    })))
}

/// Order records by response completion; ties keep their input order.
pub(crate) fn sort_by_end(records: &mut [RpcRecord]) {
    records.sort_by_key(|record| record.timing.end);
}
