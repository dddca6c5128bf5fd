use std::net::SocketAddrV4;

use etherparse::{NetSlice, SlicedPacket, TransportSlice};
use pcap_parser::Linktype;

use super::error::TcpError;

/// IPv4/TCP segment carrying application bytes.
#[derive(Debug)]
pub struct TcpSegment<'a> {
    pub src: SocketAddrV4,
    pub dst: SocketAddrV4,
    pub payload: &'a [u8],
}

/// Parse an IPv4/TCP segment from a link-layer frame.
///
/// Returns `Ok(None)` when the frame is not IPv4, not TCP, or carries no
/// application payload (pure ACKs, handshakes).
pub fn parse_tcp_segment(
    linktype: Linktype,
    data: &[u8],
) -> Result<Option<TcpSegment<'_>>, TcpError> {
    let sliced = match linktype {
        Linktype::ETHERNET => {
            SlicedPacket::from_ethernet(data).map_err(|e| TcpError::Slice(e.to_string()))?
        }
        Linktype::RAW | Linktype::IPV4 => {
            SlicedPacket::from_ip(data).map_err(|e| TcpError::Slice(e.to_string()))?
        }
        Linktype::LINUX_SLL => {
            SlicedPacket::from_linux_sll(data).map_err(|e| TcpError::Slice(e.to_string()))?
        }
        _ => return Ok(None),
    };

    let (src_ip, dst_ip) = match sliced.net {
        Some(NetSlice::Ipv4(ref ipv4)) => (
            ipv4.header().source_addr(),
            ipv4.header().destination_addr(),
        ),
        _ => return Ok(None),
    };
    let tcp = match sliced.transport {
        Some(TransportSlice::Tcp(tcp)) => tcp,
        _ => return Ok(None),
    };

    let payload = tcp.payload();
    if payload.is_empty() {
        return Ok(None);
    }

    Ok(Some(TcpSegment {
        src: SocketAddrV4::new(src_ip, tcp.source_port()),
        dst: SocketAddrV4::new(dst_ip, tcp.destination_port()),
        payload,
    }))
}
