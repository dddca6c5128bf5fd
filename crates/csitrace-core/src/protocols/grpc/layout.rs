pub const PREFIX_LEN: usize = 5;
pub const COMPRESSED_FLAG_OFFSET: usize = 0;
pub const MESSAGE_LEN_RANGE: std::ops::Range<usize> = 1..5;

pub const FLAG_UNCOMPRESSED: u8 = 0;
