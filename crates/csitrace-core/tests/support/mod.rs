#![allow(dead_code)]

use std::collections::VecDeque;
use std::fs;
use std::net::SocketAddrV4;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use csitrace_core::{PacketEvent, PacketSource, SourceError};
use etherparse::PacketBuilder;
use pcap_parser::Linktype;
use time::OffsetDateTime;

pub const CLIENT: &str = "10.0.0.1:40000";
pub const SERVER: &str = "10.0.0.2:9000";
/// Capture epoch used by every synthetic trace (2023-11-14T22:13:20Z).
pub const BASE_SECS: i64 = 1_700_000_000;

pub const PREFACE: &[u8] = b"PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n";
pub const TYPE_DATA: u8 = 0x0;
pub const TYPE_HEADERS: u8 = 0x1;
pub const TYPE_SETTINGS: u8 = 0x4;
pub const TYPE_CONTINUATION: u8 = 0x9;
pub const FLAG_END_STREAM: u8 = 0x1;
pub const FLAG_END_HEADERS: u8 = 0x4;

pub fn at_ms(ms: u64) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp_nanos(
        i128::from(BASE_SECS) * 1_000_000_000 + i128::from(ms) * 1_000_000,
    )
    .expect("timestamp")
}

/// Ethernet/IPv4/TCP frames with capture instants, in capture order.
#[derive(Debug, Default, Clone)]
pub struct Capture {
    packets: Vec<(u64, Vec<u8>)>,
}

impl Capture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one TCP segment captured `ms` milliseconds after the epoch.
    pub fn tcp(&mut self, ms: u64, src: &str, dst: &str, payload: &[u8]) -> &mut Self {
        let src: SocketAddrV4 = src.parse().expect("src endpoint");
        let dst: SocketAddrV4 = dst.parse().expect("dst endpoint");
        let builder = PacketBuilder::ethernet2([1, 2, 3, 4, 5, 6], [7, 8, 9, 10, 11, 12])
            .ipv4(src.ip().octets(), dst.ip().octets(), 64)
            .tcp(src.port(), dst.port(), 1, 64240);
        let mut frame = Vec::with_capacity(builder.size(payload.len()));
        builder.write(&mut frame, payload).expect("build tcp packet");
        self.packets.push((ms, frame));
        self
    }

    /// Append a non-TCP frame that ingestion must skip.
    pub fn udp(&mut self, ms: u64, payload: &[u8]) -> &mut Self {
        let builder = PacketBuilder::ethernet2([1, 2, 3, 4, 5, 6], [7, 8, 9, 10, 11, 12])
            .ipv4([10, 0, 0, 9], [10, 0, 0, 2], 64)
            .udp(5353, 5353);
        let mut frame = Vec::with_capacity(builder.size(payload.len()));
        builder.write(&mut frame, payload).expect("build udp packet");
        self.packets.push((ms, frame));
        self
    }

    pub fn source(&self) -> VecSource {
        VecSource(
            self.packets
                .iter()
                .map(|(ms, data)| PacketEvent {
                    ts: at_ms(*ms),
                    linktype: Linktype::ETHERNET,
                    data: data.clone(),
                })
                .collect(),
        )
    }

    /// Legacy little-endian libpcap, microsecond timestamps.
    pub fn write_pcap(&self, path: &Path) {
        let mut output = Vec::new();
        output.extend_from_slice(&0xa1b2_c3d4u32.to_le_bytes());
        output.extend_from_slice(&2u16.to_le_bytes());
        output.extend_from_slice(&4u16.to_le_bytes());
        output.extend_from_slice(&0i32.to_le_bytes());
        output.extend_from_slice(&0u32.to_le_bytes());
        output.extend_from_slice(&65535u32.to_le_bytes());
        output.extend_from_slice(&1u32.to_le_bytes());
        for (ms, data) in &self.packets {
            let ts_us = micros(*ms);
            output.extend_from_slice(&((ts_us / 1_000_000) as u32).to_le_bytes());
            output.extend_from_slice(&((ts_us % 1_000_000) as u32).to_le_bytes());
            output.extend_from_slice(&(data.len() as u32).to_le_bytes());
            output.extend_from_slice(&(data.len() as u32).to_le_bytes());
            output.extend_from_slice(data);
        }
        fs::write(path, output).expect("write pcap");
    }

    /// Big-endian pcapng with one Ethernet interface at microsecond resolution.
    pub fn write_pcapng(&self, path: &Path) {
        let mut output = Vec::new();
        output.extend_from_slice(&pcapng_block(0x0A0D0D0A, &section_header_body()));
        output.extend_from_slice(&pcapng_block(1, &interface_desc_body()));
        for (ms, data) in &self.packets {
            output.extend_from_slice(&pcapng_block(6, &enhanced_packet_body(micros(*ms), data)));
        }
        fs::write(path, output).expect("write pcapng");
    }
}

fn micros(ms: u64) -> u64 {
    (BASE_SECS as u64) * 1_000_000 + ms * 1_000
}

fn pcapng_block(block_type: u32, body: &[u8]) -> Vec<u8> {
    let total_len = (8 + body.len() + 4) as u32;
    let mut block = Vec::with_capacity(total_len as usize);
    block.extend_from_slice(&block_type.to_be_bytes());
    block.extend_from_slice(&total_len.to_be_bytes());
    block.extend_from_slice(body);
    block.extend_from_slice(&total_len.to_be_bytes());
    block
}

fn section_header_body() -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&0x1A2B3C4Du32.to_be_bytes());
    body.extend_from_slice(&1u16.to_be_bytes());
    body.extend_from_slice(&0u16.to_be_bytes());
    body.extend_from_slice(&(-1i64).to_be_bytes());
    body
}

fn interface_desc_body() -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&1u16.to_be_bytes());
    body.extend_from_slice(&0u16.to_be_bytes());
    body.extend_from_slice(&65535u32.to_be_bytes());
    body
}

fn enhanced_packet_body(ts_us: u64, data: &[u8]) -> Vec<u8> {
    let ts_high = ((ts_us >> 32) & 0xFFFF_FFFF) as u32;
    let ts_low = (ts_us & 0xFFFF_FFFF) as u32;
    let cap_len = data.len() as u32;
    let mut body = Vec::new();
    body.extend_from_slice(&0u32.to_be_bytes());
    body.extend_from_slice(&ts_high.to_be_bytes());
    body.extend_from_slice(&ts_low.to_be_bytes());
    body.extend_from_slice(&cap_len.to_be_bytes());
    body.extend_from_slice(&cap_len.to_be_bytes());
    body.extend_from_slice(data);
    let pad_len = (4 - (data.len() % 4)) % 4;
    body.extend(std::iter::repeat_n(0u8, pad_len));
    body
}

/// In-memory packet source.
pub struct VecSource(VecDeque<PacketEvent>);

impl PacketSource for VecSource {
    fn next_packet(&mut self) -> Result<Option<PacketEvent>, SourceError> {
        Ok(self.0.pop_front())
    }
}

pub fn temp_path(name: &str) -> PathBuf {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("csitrace_{unique}_{seq}_{name}"))
}

pub fn frame(frame_type: u8, flags: u8, stream_id: u32, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(9 + payload.len());
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes()[1..]);
    out.push(frame_type);
    out.push(flags);
    out.extend_from_slice(&stream_id.to_be_bytes());
    out.extend_from_slice(payload);
    out
}

/// HPACK literal header field without indexing, new name.
pub fn literal(name: &str, value: &str) -> Vec<u8> {
    assert!(name.len() < 127 && value.len() < 127);
    let mut out = vec![0x00, name.len() as u8];
    out.extend_from_slice(name.as_bytes());
    out.push(value.len() as u8);
    out.extend_from_slice(value.as_bytes());
    out
}

pub fn request_block(path: &str, authority: &str) -> Vec<u8> {
    // :method POST, :scheme http from the static table.
    let mut block = vec![0x83, 0x86];
    block.extend(literal(":path", path));
    block.extend(literal(":authority", authority));
    block.extend(literal("content-type", "application/grpc"));
    block
}

pub fn response_block() -> Vec<u8> {
    // :status 200 from the static table.
    let mut block = vec![0x88];
    block.extend(literal("content-type", "application/grpc"));
    block
}

pub fn trailer_block() -> Vec<u8> {
    let mut block = literal("grpc-status", "0");
    block.extend(literal("grpc-message", ""));
    block
}

pub fn envelope(flag: u8, message: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(5 + message.len());
    out.push(flag);
    out.extend_from_slice(&(message.len() as u32).to_be_bytes());
    out.extend_from_slice(message);
    out
}

/// HEADERS + DATA of a unary request.
pub fn request_frames(stream_id: u32, path: &str, authority: &str, message: &[u8]) -> Vec<u8> {
    let mut out = frame(
        TYPE_HEADERS,
        FLAG_END_HEADERS,
        stream_id,
        &request_block(path, authority),
    );
    out.extend(frame(
        TYPE_DATA,
        FLAG_END_STREAM,
        stream_id,
        &envelope(0, message),
    ));
    out
}

/// HEADERS + DATA of a unary response, trailers excluded.
pub fn response_frames(stream_id: u32, message: &[u8]) -> Vec<u8> {
    let mut out = frame(TYPE_HEADERS, FLAG_END_HEADERS, stream_id, &response_block());
    out.extend(frame(TYPE_DATA, 0, stream_id, &envelope(0, message)));
    out
}

pub fn trailer_frame(stream_id: u32) -> Vec<u8> {
    frame(
        TYPE_HEADERS,
        FLAG_END_HEADERS | FLAG_END_STREAM,
        stream_id,
        &trailer_block(),
    )
}

pub fn client_preface() -> Vec<u8> {
    let mut out = PREFACE.to_vec();
    out.extend(frame(TYPE_SETTINGS, 0, 0, &[]));
    out
}
