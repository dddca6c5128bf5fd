use std::fs::File;
use std::path::Path;

use pcap_parser::traits::PcapReaderIterator;
use pcap_parser::{Block, LegacyPcapReader, Linktype, PcapBlockOwned, PcapError, PcapNGReader};

use crate::source::{PacketEvent, PacketSource, SourceError};

use super::error::PcapSourceError;
use super::layout;
use super::reader::{
    CaptureFormat, InterfaceInfo, capture_format, interface_for, legacy_ts_to_nanos,
    pcapng_ts_to_nanos, read_magic_and_rewind, timestamp_from_nanos,
};

/// Packet source over a legacy libpcap or pcapng file, picked by magic.
pub struct PcapFileSource {
    inner: CaptureReader,
}

enum CaptureReader {
    Legacy {
        reader: LegacyPcapReader<File>,
        linktype: Linktype,
        nanosecond: bool,
    },
    Ng {
        reader: PcapNGReader<File>,
        interfaces: Vec<InterfaceInfo>,
    },
}

impl PcapFileSource {
    /// Identify the container format of `path` from its magic, without
    /// reading any packets.
    ///
    /// # Errors
    /// Returns `SourceError::Io` when the file cannot be opened or is
    /// shorter than its magic.
    pub fn detect(path: &Path) -> Result<Option<CaptureFormat>, SourceError> {
        let mut file = File::open(path)?;
        Ok(capture_format(&read_magic_and_rewind(&mut file)?))
    }

    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let mut file = File::open(path)?;
        let magic = read_magic_and_rewind(&mut file)?;
        let Some(format) = capture_format(&magic) else {
            return Err(PcapSourceError::Pcap {
                context: "capture magic",
                message: format!("unrecognized magic {magic:02x?}"),
            }
            .into());
        };
        let inner = if format == CaptureFormat::PcapNg {
            let reader = PcapNGReader::new(layout::PCAP_READER_BUFFER_SIZE, file)
                .map_err(|e| pcap_error("pcapng reader init", e))?;
            CaptureReader::Ng {
                reader,
                interfaces: Vec::new(),
            }
        } else {
            let reader = LegacyPcapReader::new(layout::PCAP_READER_BUFFER_SIZE, file)
                .map_err(|e| pcap_error("pcap reader init", e))?;
            CaptureReader::Legacy {
                reader,
                linktype: Linktype::ETHERNET,
                nanosecond: false,
            }
        };
        Ok(Self { inner })
    }
}

impl PacketSource for PcapFileSource {
    fn next_packet(&mut self) -> Result<Option<PacketEvent>, SourceError> {
        let event = match &mut self.inner {
            CaptureReader::Legacy {
                reader,
                linktype,
                nanosecond,
            } => next_event(reader, "pcap", |block| match block {
                PcapBlockOwned::LegacyHeader(header) => {
                    *linktype = header.network;
                    *nanosecond = header.is_nanosecond_precision();
                    Ok(None)
                }
                PcapBlockOwned::Legacy(packet) => {
                    let nanos = legacy_ts_to_nanos(packet.ts_sec, packet.ts_usec, *nanosecond);
                    Ok(Some(PacketEvent {
                        ts: timestamp_from_nanos(nanos)?,
                        linktype: *linktype,
                        data: packet.data.to_vec(),
                    }))
                }
                _ => Ok(None),
            }),
            CaptureReader::Ng { reader, interfaces } => {
                next_event(reader, "pcapng", |block| match block {
                    PcapBlockOwned::NG(Block::SectionHeader(_)) => {
                        // Interface ids restart with every section.
                        interfaces.clear();
                        Ok(None)
                    }
                    PcapBlockOwned::NG(Block::InterfaceDescription(intf)) => {
                        interfaces.push(InterfaceInfo {
                            linktype: intf.linktype,
                            tsresol: intf.if_tsresol,
                            tsoffset: intf.if_tsoffset,
                        });
                        Ok(None)
                    }
                    PcapBlockOwned::NG(Block::EnhancedPacket(packet)) => {
                        let intf = interface_for(interfaces, packet.if_id);
                        let nanos = pcapng_ts_to_nanos(
                            packet.ts_high,
                            packet.ts_low,
                            intf.tsresol,
                            intf.tsoffset,
                        )
                        .ok_or(PcapSourceError::Pcap {
                            context: "pcapng timestamp",
                            message: format!("unsupported if_tsresol {:#04x}", intf.tsresol),
                        })?;
                        Ok(Some(PacketEvent {
                            ts: timestamp_from_nanos(nanos)?,
                            linktype: intf.linktype,
                            data: packet.data.to_vec(),
                        }))
                    }
                    _ => Ok(None),
                })
            }
        };
        event.map_err(SourceError::from)
    }
}

/// Pull blocks until `on_block` yields a packet or the file ends.
fn next_event<R, F>(
    reader: &mut R,
    format: &'static str,
    mut on_block: F,
) -> Result<Option<PacketEvent>, PcapSourceError>
where
    R: PcapReaderIterator,
    F: FnMut(PcapBlockOwned<'_>) -> Result<Option<PacketEvent>, PcapSourceError>,
{
    loop {
        match reader.next() {
            Ok((offset, block)) => {
                let event = on_block(block);
                reader.consume(offset);
                if let Some(event) = event? {
                    return Ok(Some(event));
                }
            }
            Err(PcapError::Eof) => return Ok(None),
            Err(PcapError::Incomplete(_)) => {
                reader
                    .refill()
                    .map_err(|e| pcap_error(format, format!("refill: {e}")))?;
            }
            Err(e) => return Err(pcap_error(format, format!("next block: {e}"))),
        }
    }
}

fn pcap_error(context: &'static str, err: impl ToString) -> PcapSourceError {
    PcapSourceError::Pcap {
        context,
        message: err.to_string(),
    }
}
