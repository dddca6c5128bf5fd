use thiserror::Error;

/// Errors returned by gRPC message envelope decoding.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GrpcError {
    #[error("gRPC envelope truncated: {actual} of {needed} prefix bytes")]
    TruncatedPrefix { needed: usize, actual: usize },
    #[error("gRPC envelope compressed flag {flag:#04x}: compressed payloads are not supported")]
    Compressed { flag: u8 },
    #[error("gRPC envelope declares {declared} bytes, carries {actual}")]
    LengthMismatch { declared: usize, actual: usize },
}
