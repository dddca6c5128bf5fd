//! gRPC length-prefixed message envelope.
//!
//! Wire format: one compressed-flag byte, a 4-byte big-endian message length,
//! then the serialized message.

pub mod error;
pub mod layout;
pub mod parser;
pub mod reader;

pub use error::GrpcError;
pub use parser::parse_envelope;
