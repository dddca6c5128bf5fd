pub const CONNECTION_PREFACE: &[u8; 24] = b"PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n";

pub const FRAME_HEADER_LEN: usize = 9;
pub const LENGTH_RANGE: std::ops::Range<usize> = 0..3;
pub const TYPE_OFFSET: usize = 3;
pub const FLAGS_OFFSET: usize = 4;
pub const STREAM_ID_RANGE: std::ops::Range<usize> = 5..9;
pub const STREAM_ID_MASK: u32 = 0x7fff_ffff;

pub const TYPE_DATA: u8 = 0x00;
pub const TYPE_HEADERS: u8 = 0x01;
pub const TYPE_PRIORITY: u8 = 0x02;
pub const TYPE_RST_STREAM: u8 = 0x03;
pub const TYPE_SETTINGS: u8 = 0x04;
pub const TYPE_PUSH_PROMISE: u8 = 0x05;
pub const TYPE_PING: u8 = 0x06;
pub const TYPE_GOAWAY: u8 = 0x07;
pub const TYPE_WINDOW_UPDATE: u8 = 0x08;
pub const TYPE_CONTINUATION: u8 = 0x09;

pub const FLAG_END_HEADERS: u8 = 0x04;
pub const FLAG_PADDED: u8 = 0x08;
pub const FLAG_PRIORITY: u8 = 0x20;

pub const PAD_LENGTH_LEN: usize = 1;
pub const PRIORITY_BLOCK_LEN: usize = 5;
pub const PROMISED_STREAM_ID_LEN: usize = 4;
