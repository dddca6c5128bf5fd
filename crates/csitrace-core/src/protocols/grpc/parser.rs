use super::error::GrpcError;
use super::layout;
use super::reader::{read_compressed_flag, read_message_len, split_prefix};

/// Return the serialized message carried by a DATA body.
///
/// Unary calls carry exactly one message, so the declared length must
/// account for every byte after the prefix.
///
/// # Errors
/// Returns `GrpcError` when the prefix is truncated, the compressed flag is
/// set, or the declared length disagrees with the body.
pub fn parse_envelope(body: &[u8]) -> Result<&[u8], GrpcError> {
    let (prefix, payload) = split_prefix(body)?;

    let flag = read_compressed_flag(prefix);
    if flag != layout::FLAG_UNCOMPRESSED {
        return Err(GrpcError::Compressed { flag });
    }

    let declared_len = read_message_len(prefix);
    if declared_len != payload.len() {
        return Err(GrpcError::LengthMismatch {
            declared: declared_len,
            actual: payload.len(),
        });
    }

    Ok(payload)
}
