//! csitrace core library for offline CSI gRPC trace analysis.
//!
//! This crate turns a packet capture of CSI driver traffic into one record
//! per unary RPC: packet sources feed the analysis layer, which rebuilds
//! directional TCP byte logs, decodes HTTP/2 frames and HPACK header blocks,
//! pairs request and response streams, unwraps the gRPC envelope and decodes
//! the CSI protobuf messages. Parsing is byte-oriented and side-effect free;
//! all I/O is isolated in `source` modules.
//!
//! Invariants:
//! - Records are sorted by response completion time; ties keep a stable,
//!   capture-derived order.
//! - HPACK state is scoped to one direction of one connection.
//! - Pairing keys strictly on endpoint pair and stream id.
//! - A fatal decode error yields no records at all.
//!
//! # Examples
//! ```no_run
//! use std::path::Path;
//!
//! use csitrace_core::analyze_pcap_file;
//!
//! let report = analyze_pcap_file(Path::new("csi.pcap"))?;
//! report.write_ndjson(std::io::stdout().lock())?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::io::Write;
use std::net::Ipv4Addr;

use serde::{Serialize, Serializer};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

mod analysis;
pub mod protocols;
mod source;

pub use analysis::{AnalysisError, analyze_pcap_file, analyze_source};
pub use protocols::csi::{CsiMessage, CsiMethod};
pub use source::{CaptureFormat, PacketEvent, PacketSource, PcapFileSource, SourceError};

/// One decoded unary CSI call.
///
/// Serializes with a fixed field order:
/// `action, path, agent{name, ip, port}, timing{start, end, duration},
/// request, response`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpcRecord {
    /// RPC method name, e.g. `CreateVolume`.
    pub action: String,
    /// Full `:path` of the request.
    pub path: String,
    pub agent: Agent,
    pub timing: Timing,
    pub request: CsiMessage,
    pub response: CsiMessage,
}

/// The endpoint that issued the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Agent {
    /// `:authority` advertised by the client (may be empty).
    pub name: String,
    pub ip: Ipv4Addr,
    pub port: u16,
}

/// Capture instants of a call.
///
/// # Examples
/// ```
/// use csitrace_core::Timing;
/// use time::OffsetDateTime;
///
/// let start = OffsetDateTime::from_unix_timestamp(10).unwrap();
/// let end = OffsetDateTime::from_unix_timestamp(12).unwrap();
/// assert_eq!(Timing::new(start, end).duration, 2_000_000_000);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Timing {
    /// Last capture instant of the request stream.
    #[serde(serialize_with = "serialize_rfc3339")]
    pub start: OffsetDateTime,
    /// Last capture instant of the response stream (its trailers).
    #[serde(serialize_with = "serialize_rfc3339")]
    pub end: OffsetDateTime,
    /// `end - start` in nanoseconds.
    pub duration: i64,
}

impl Timing {
    pub fn new(start: OffsetDateTime, end: OffsetDateTime) -> Self {
        let nanos = (end - start).whole_nanoseconds();
        Self {
            start,
            end,
            duration: nanos.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64,
        }
    }
}

fn serialize_rfc3339<S: Serializer>(ts: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error> {
    let formatted = ts.format(&Rfc3339).map_err(serde::ser::Error::custom)?;
    serializer.serialize_str(&formatted)
}

/// Counters describing what the pipeline saw and dropped.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnalysisSummary {
    pub packets: u64,
    /// IPv4/TCP segments with a non-empty payload.
    pub tcp_segments: u64,
    /// Distinct directional (src, dst) byte logs.
    pub byte_logs: u64,
    /// Endpoint pairs seen in both directions.
    pub endpoint_pairs: u64,
    pub frames: u64,
    /// HPACK header blocks decoded across all byte logs.
    pub header_blocks: u64,
    pub calls_paired: u64,
    pub records: u64,
    pub dropped_unpaired: u64,
    pub dropped_unclassified: u64,
    pub dropped_not_csi: u64,
    pub dropped_unknown_method: u64,
}

/// Records of one capture, sorted by response completion time.
#[derive(Debug, Clone)]
pub struct TraceReport {
    pub records: Vec<RpcRecord>,
    pub summary: AnalysisSummary,
}

impl TraceReport {
    /// Write one JSON object per record, newline-terminated.
    ///
    /// # Errors
    /// Returns the first write or serialization failure.
    pub fn write_ndjson<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        for record in &self.records {
            serde_json::to_writer(&mut writer, record)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()
    }
}
