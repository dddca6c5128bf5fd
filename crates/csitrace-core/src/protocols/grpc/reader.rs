use super::error::GrpcError;
use super::layout;

/// Split a DATA body into its 5-byte prefix and the remaining bytes.
pub fn split_prefix(body: &[u8]) -> Result<(&[u8; layout::PREFIX_LEN], &[u8]), GrpcError> {
    match body.split_first_chunk::<{ layout::PREFIX_LEN }>() {
        Some((prefix, rest)) => Ok((prefix, rest)),
        None => Err(GrpcError::TruncatedPrefix {
            needed: layout::PREFIX_LEN,
            actual: body.len(),
        }),
    }
}

pub fn read_compressed_flag(prefix: &[u8; layout::PREFIX_LEN]) -> u8 {
    prefix[layout::COMPRESSED_FLAG_OFFSET]
}

pub fn read_message_len(prefix: &[u8; layout::PREFIX_LEN]) -> usize {
    let len = &prefix[layout::MESSAGE_LEN_RANGE];
    u32::from_be_bytes([len[0], len[1], len[2], len[3]]) as usize
}
