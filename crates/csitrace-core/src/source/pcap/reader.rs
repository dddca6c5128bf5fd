use std::io::{Read, Seek, SeekFrom};

use pcap_parser::Linktype;
use time::OffsetDateTime;

use super::error::PcapSourceError;
use super::layout;

/// Capture properties announced by one pcapng Interface Description Block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceInfo {
    pub linktype: Linktype,
    pub tsresol: u8,
    pub tsoffset: i64,
}

impl Default for InterfaceInfo {
    fn default() -> Self {
        Self {
            linktype: Linktype::ETHERNET,
            tsresol: layout::DEFAULT_TSRESOL,
            tsoffset: 0,
        }
    }
}

/// Peek at the 4-byte file magic, leaving the reader at offset 0.
///
/// # Errors
/// Returns `PcapSourceError::Io` when fewer than four bytes can be read or
/// the reader cannot seek back.
pub fn read_magic_and_rewind<R: Read + Seek>(reader: &mut R) -> Result<[u8; 4], PcapSourceError> {
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    reader.seek(SeekFrom::Start(0))?;
    Ok(magic)
}

/// Container format announced by a capture file's magic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureFormat {
    Pcap,
    PcapNg,
}

pub fn capture_format(magic: &[u8; 4]) -> Option<CaptureFormat> {
    if magic == &layout::PCAPNG_MAGIC {
        Some(CaptureFormat::PcapNg)
    } else if layout::PCAP_MAGICS.contains(magic) {
        Some(CaptureFormat::Pcap)
    } else {
        None
    }
}

/// Resolve the interface for a given interface id, defaulting to an
/// Ethernet interface with microsecond timestamps.
pub fn interface_for(interfaces: &[InterfaceInfo], if_id: u32) -> InterfaceInfo {
    interfaces
        .get(if_id as usize)
        .copied()
        .unwrap_or_default()
}

/// Convert a legacy PCAP record timestamp to nanoseconds since the epoch.
///
/// `ts_frac` is microseconds, or nanoseconds when the file header carries
/// the nanosecond magic.
pub fn legacy_ts_to_nanos(ts_sec: u32, ts_frac: u32, nanosecond: bool) -> i128 {
    let frac = if nanosecond {
        u64::from(ts_frac)
    } else {
        u64::from(ts_frac) * layout::NANOS_PER_MICRO
    };
    i128::from(ts_sec) * i128::from(layout::NANOS_PER_SECOND) + i128::from(frac)
}

/// Convert a PCAPNG high/low timestamp to nanoseconds since the epoch.
///
/// `tsresol` follows the `if_tsresol` encoding: the low seven bits are a
/// negative power of ten, or of two when the high bit is set. Returns
/// `None` for resolutions that cannot be represented.
pub fn pcapng_ts_to_nanos(ts_high: u32, ts_low: u32, tsresol: u8, tsoffset: i64) -> Option<i128> {
    let ticks = (u128::from(ts_high) << 32) | u128::from(ts_low);
    let exponent = u32::from(tsresol & !layout::TSRESOL_BASE2_FLAG);
    let units_per_second = if tsresol & layout::TSRESOL_BASE2_FLAG == 0 {
        10u128.checked_pow(exponent)?
    } else {
        1u128.checked_shl(exponent)?
    };
    let nanos = ticks * u128::from(layout::NANOS_PER_SECOND) / units_per_second;
    let offset = i128::from(tsoffset) * i128::from(layout::NANOS_PER_SECOND);
    i128::try_from(nanos).ok().map(|nanos| nanos + offset)
}

/// Build a UTC capture instant from nanoseconds since the epoch.
///
/// # Errors
/// Returns `PcapSourceError::Timestamp` when the instant is out of range.
pub fn timestamp_from_nanos(nanos: i128) -> Result<OffsetDateTime, PcapSourceError> {
    OffsetDateTime::from_unix_timestamp_nanos(nanos)
        .map_err(|_| PcapSourceError::Timestamp { nanos })
}
