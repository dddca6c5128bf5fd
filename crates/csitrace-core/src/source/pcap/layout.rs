pub const PCAP_READER_BUFFER_SIZE: usize = 64 * 1024;
pub const PCAPNG_MAGIC: [u8; 4] = [0x0a, 0x0d, 0x0d, 0x0a];
/// Legacy libpcap magics as they appear on disk: micro- and nanosecond
/// variants in both byte orders.
pub const PCAP_MAGICS: [[u8; 4]; 4] = [
    [0xd4, 0xc3, 0xb2, 0xa1],
    [0xa1, 0xb2, 0xc3, 0xd4],
    [0x4d, 0x3c, 0xb2, 0xa1],
    [0xa1, 0xb2, 0x3c, 0x4d],
];

/// pcapng `if_tsresol` default: 10^-6 seconds.
pub const DEFAULT_TSRESOL: u8 = 6;
pub const TSRESOL_BASE2_FLAG: u8 = 0x80;

pub const NANOS_PER_SECOND: u64 = 1_000_000_000;
pub const NANOS_PER_MICRO: u64 = 1_000;
