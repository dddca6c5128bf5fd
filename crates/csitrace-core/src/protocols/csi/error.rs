use thiserror::Error;

use super::dispatch::{CsiMethod, MessageSide};

/// Errors returned when a CSI payload does not match its schema.
#[derive(Debug, Error)]
pub enum CsiError {
    #[error("cannot decode {side} of {method}: {source}")]
    Decode {
        method: CsiMethod,
        side: MessageSide,
        #[source]
        source: prost::DecodeError,
    },
}
