use thiserror::Error;

/// Errors returned by TCP segment slicing.
///
/// Note: this error type lives in an internal module; the example is
/// illustrative and not compiled as a public doctest.
///
/// # Examples
/// ```text
/// use csitrace_core::analysis::tcp::error::TcpError;
///
/// let err = TcpError::Slice("unexpected end".to_string());
/// assert!(err.to_string().contains("packet slice error"));
/// ```
#[derive(Debug, Error)]
pub enum TcpError {
    #[error("packet slice error: {0}")]
    Slice(String),
}
