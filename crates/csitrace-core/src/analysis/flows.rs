use std::collections::BTreeMap;
use std::fmt;
use std::net::SocketAddrV4;

use time::OffsetDateTime;

use super::tcp::TcpSegment;

/// One direction of a TCP conversation.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct FlowKey {
    pub src: SocketAddrV4,
    pub dst: SocketAddrV4,
}

impl FlowKey {
    pub fn reversed(self) -> FlowKey {
        FlowKey {
            src: self.dst,
            dst: self.src,
        }
    }
}

impl fmt::Display for FlowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.src, self.dst)
    }
}

/// Payload bytes of one direction in capture order.
///
/// Segment boundaries are kept so a byte offset can be mapped back to the
/// capture instant of the segment that carried it.
#[derive(Debug, Default, Clone)]
pub(crate) struct DirectionalByteLog {
    bytes: Vec<u8>,
    /// Exclusive end offset of each segment, with its capture instant.
    boundaries: Vec<(usize, OffsetDateTime)>,
}

impl DirectionalByteLog {
    pub fn push(&mut self, payload: &[u8], ts: OffsetDateTime) {
        self.bytes.extend_from_slice(payload);
        self.boundaries.push((self.bytes.len(), ts));
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn segments(&self) -> usize {
        self.boundaries.len()
    }

    /// Capture instant of the segment holding the byte just before `end`.
    pub fn timestamp_at(&self, end: usize) -> Option<OffsetDateTime> {
        let idx = self.boundaries.partition_point(|(seg_end, _)| *seg_end < end);
        self.boundaries.get(idx).map(|(_, ts)| *ts)
    }
}

/// Directional byte logs keyed by exact (src, dst) endpoint pair.
#[derive(Debug, Default)]
pub(crate) struct FlowTable {
    logs: BTreeMap<FlowKey, DirectionalByteLog>,
}

impl FlowTable {
    pub fn add_segment(&mut self, segment: &TcpSegment<'_>, ts: OffsetDateTime) {
        let key = FlowKey {
            src: segment.src,
            dst: segment.dst,
        };
        self.logs.entry(key).or_default().push(segment.payload, ts);
    }

    pub fn len(&self) -> usize {
        self.logs.len()
    }

    pub fn get(&self, key: &FlowKey) -> Option<&DirectionalByteLog> {
        self.logs.get(key)
    }

    /// Unordered endpoint pairs seen in both directions, each reported once
    /// as `(lower, higher)` key order.
    pub fn endpoint_pairs(&self) -> Vec<(FlowKey, FlowKey)> {
        self.logs
            .keys()
            .filter(|key| key.src < key.dst)
            .map(|key| (*key, key.reversed()))
            .filter(|(_, reverse)| self.logs.contains_key(reverse))
            .collect()
    }
}
