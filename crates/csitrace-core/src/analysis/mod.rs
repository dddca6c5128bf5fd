use std::collections::BTreeMap;
use std::net::SocketAddrV4;
use std::path::Path;

use thiserror::Error;
use tracing::{debug, info, trace};

use crate::protocols::csi::{CsiError, MessageSide};
use crate::protocols::grpc::GrpcError;
use crate::protocols::http2::Http2Error;
use crate::protocols::http2::parser::StreamId;
use crate::source::{PacketEvent, PacketSource, PcapFileSource, SourceError};
use crate::{AnalysisSummary, TraceReport};

mod flows;
mod pairing;
mod records;
mod streams;
mod tcp;

use flows::{FlowKey, FlowTable};
use pairing::{PairingStats, pair_streams};
use records::{CallOutcome, decode_call, sort_by_end};
use streams::{Stream, reconstruct_streams};
use tcp::parse_tcp_segment;

/// Conditions that abort the whole run.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Source error: {0}")]
    Source(#[from] SourceError),
    #[error("HTTP/2 error on {src} -> {dst}: {source}")]
    Http2 {
        src: SocketAddrV4,
        dst: SocketAddrV4,
        #[source]
        source: Http2Error,
    },
    #[error("gRPC error in {side} of {path} on {src} -> {dst}: {source}")]
    Grpc {
        src: SocketAddrV4,
        dst: SocketAddrV4,
        path: String,
        side: MessageSide,
        #[source]
        source: GrpcError,
    },
    #[error(transparent)]
    Csi(#[from] CsiError),
}

pub fn analyze_pcap_file(path: &Path) -> Result<TraceReport, AnalysisError> {
    let source = PcapFileSource::open(path)?;
    analyze_source(source)
}

/// Run the whole pipeline over a packet source.
///
/// Ingestion finishes before any byte log is decoded, and records are
/// returned only when every stage succeeded.
pub fn analyze_source<S: PacketSource>(mut source: S) -> Result<TraceReport, AnalysisError> {
    let mut summary = AnalysisSummary::default();
    let mut table = FlowTable::default();

    while let Some(PacketEvent { ts, linktype, data }) = source.next_packet()? {
        summary.packets += 1;
        match parse_tcp_segment(linktype, &data) {
            Ok(Some(segment)) => {
                summary.tcp_segments += 1;
                table.add_segment(&segment, ts);
            }
            Ok(None) => {}
            Err(err) => trace!(packet = summary.packets, %err, "packet skipped"),
        }
    }
    summary.byte_logs = table.len() as u64;

    let mut pairing = PairingStats::default();
    let mut records = Vec::new();
    for (forward, reverse) in table.endpoint_pairs() {
        summary.endpoint_pairs += 1;
        let forward_streams = decode_direction(&table, forward, &mut summary)?;
        let reverse_streams = decode_direction(&table, reverse, &mut summary)?;

        for call in pair_streams(forward, forward_streams, reverse_streams, &mut pairing) {
            match decode_call(forward, &call)? {
                CallOutcome::Decoded(record) => records.push(*record),
                CallOutcome::NotCsi => summary.dropped_not_csi += 1,
                CallOutcome::UnknownMethod => summary.dropped_unknown_method += 1,
            }
        }
    }
    summary.calls_paired = pairing.paired;
    summary.dropped_unpaired = pairing.unpaired;
    summary.dropped_unclassified = pairing.unclassified;

    sort_by_end(&mut records);
    summary.records = records.len() as u64;
    info!(
        packets = summary.packets,
        tcp_segments = summary.tcp_segments,
        byte_logs = summary.byte_logs,
        endpoint_pairs = summary.endpoint_pairs,
        frames = summary.frames,
        header_blocks = summary.header_blocks,
        calls_paired = summary.calls_paired,
        records = summary.records,
        dropped_unpaired = summary.dropped_unpaired,
        dropped_unclassified = summary.dropped_unclassified,
        dropped_not_csi = summary.dropped_not_csi,
        dropped_unknown_method = summary.dropped_unknown_method,
        "analysis complete"
    );
    Ok(TraceReport { records, summary })
}

fn decode_direction(
    table: &FlowTable,
    key: FlowKey,
    summary: &mut AnalysisSummary,
) -> Result<BTreeMap<StreamId, Stream>, AnalysisError> {
    let Some(log) = table.get(&key) else {
        return Ok(BTreeMap::new());
    };
    let out = reconstruct_streams(key, log).map_err(|source| AnalysisError::Http2 {
        src: key.src,
        dst: key.dst,
        source,
    })?;
    summary.frames += out.frames;
    summary.header_blocks += out.header_blocks;
    debug!(
        flow = %key,
        segments = log.segments(),
        frames = out.frames,
        header_blocks = out.header_blocks,
        streams = out.streams.len(),
        "byte log decoded"
    );
    Ok(out.streams)
}
